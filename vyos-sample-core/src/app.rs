//! App - The set of stacks deployed together

use crate::assembly::CloudAssembly;
use crate::provider::Provider;
use crate::stack::{Stack, StackError};
use crate::template::{SynthError, synthesize};

#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack. Stack names are unique within an app.
    pub fn add_stack(&mut self, stack: Stack) -> Result<(), StackError> {
        if self.stack(stack.name()).is_some() {
            return Err(StackError::DuplicateStack(stack.name().to_string()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Validate every stack, collecting all errors
    pub fn validate(&self, provider: &dyn Provider) -> Result<(), Vec<StackError>> {
        let errors: Vec<StackError> = self
            .stacks
            .iter()
            .filter_map(|s| s.validate(provider).err())
            .flatten()
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Synthesize every stack, in insertion order
    pub fn synth(&self, provider: &dyn Provider) -> Result<CloudAssembly, SynthError> {
        let stacks = self
            .stacks
            .iter()
            .map(|s| synthesize(s, provider))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CloudAssembly::new(stacks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::MockProvider;
    use crate::resource::{Resource, Value};
    use crate::stack::Environment;

    fn stack(name: &str) -> Stack {
        let mut stack = Stack::new(name, Environment::new("123456789012", "ap-northeast-1"));
        stack
            .add(Resource::new("vpc", "Vpc").with_attribute("cidr_block", Value::string("10.0.0.0/16")))
            .unwrap();
        stack
    }

    #[test]
    fn duplicate_stack_names_are_rejected() {
        let mut app = App::new();
        app.add_stack(stack("Dev-A")).unwrap();
        assert_eq!(
            app.add_stack(stack("Dev-A")),
            Err(StackError::DuplicateStack("Dev-A".to_string()))
        );
        assert_eq!(app.stacks().len(), 1);
    }

    #[test]
    fn synth_keeps_insertion_order() {
        let mut app = App::new();
        app.add_stack(stack("Prod-B")).unwrap();
        app.add_stack(stack("Dev-A")).unwrap();

        assert!(app.validate(&MockProvider).is_ok());
        let assembly = app.synth(&MockProvider).unwrap();
        let names: Vec<&str> = assembly.stacks().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Prod-B", "Dev-A"]);
    }

    #[test]
    fn validate_collects_errors_from_all_stacks() {
        let mut app = App::new();
        let mut a = stack("A");
        a.add(Resource::new("nope", "X")).unwrap();
        let mut b = stack("B");
        b.add(Resource::new("nope", "Y")).unwrap();
        app.add_stack(a).unwrap();
        app.add_stack(b).unwrap();

        assert_eq!(app.validate(&MockProvider).unwrap_err().len(), 2);
        assert!(app.synth(&MockProvider).is_err());
    }
}
