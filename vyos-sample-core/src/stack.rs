//! Stack - A deployable unit of resources and outputs bound to one account and region

use std::collections::HashMap;

use log::trace;

use crate::graph::DependencyGraph;
use crate::provider::Provider;
use crate::resource::{Resource, Value, collect_references};
use crate::schema::TypeError;

/// Stack error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StackError {
    #[error("Invalid logical ID '{0}': must be 1-255 ASCII letters or digits")]
    InvalidLogicalId(String),

    #[error("Duplicate logical ID '{0}'")]
    DuplicateLogicalId(String),

    #[error("Duplicate output '{0}'")]
    DuplicateOutput(String),

    #[error("Duplicate stack name '{0}'")]
    DuplicateStack(String),

    #[error("Unknown resource type '{resource_type}' for {logical_id}")]
    UnknownResourceType {
        logical_id: String,
        resource_type: String,
    },

    #[error("{resource_type}.{logical_id}: {error}")]
    Schema {
        logical_id: String,
        resource_type: String,
        error: TypeError,
    },

    #[error("{from}.{used_in} references undeclared resource '{target}'")]
    DanglingReference {
        from: String,
        used_in: String,
        target: String,
    },

    #[error("Output '{output}' references undeclared resource '{target}'")]
    DanglingOutput { output: String, target: String },

    #[error("Resources of stack '{0}' reference each other in a cycle")]
    Cycle(String),
}

/// Account and region a stack is deployed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

/// Stack output, surfaced to operators after deployment
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub description: String,
}

/// Handle to a resource declared in a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    logical_id: String,
}

impl ResourceHandle {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The resource's primary identifier (`Ref`)
    pub fn reference(&self) -> Value {
        Value::reference(&self.logical_id)
    }

    /// A named attribute of the resource (`Fn::GetAtt`)
    pub fn attr(&self, attribute: &str) -> Value {
        Value::attr(&self.logical_id, attribute)
    }
}

/// A stack of resources
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    env: Environment,
    description: Option<String>,
    resources: Vec<Resource>,
    outputs: Vec<Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>, env: Environment) -> Self {
        Self {
            name: name.into(),
            env,
            description: None,
            resources: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Declare a resource
    pub fn add(&mut self, resource: Resource) -> Result<ResourceHandle, StackError> {
        let logical_id = resource.logical_id().to_string();
        if !is_valid_logical_id(&logical_id) {
            return Err(StackError::InvalidLogicalId(logical_id));
        }
        if self.resource(&logical_id).is_some() {
            return Err(StackError::DuplicateLogicalId(logical_id));
        }

        trace!("{}: declared {}", self.name, resource.id);
        self.resources.push(resource);
        Ok(ResourceHandle { logical_id })
    }

    /// Declare an output
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        value: Value,
        description: impl Into<String>,
    ) -> Result<(), StackError> {
        let name = name.into();
        if !is_valid_logical_id(&name) {
            return Err(StackError::InvalidLogicalId(name));
        }
        if self.output(&name).is_some() {
            return Err(StackError::DuplicateOutput(name));
        }

        self.outputs.push(Output {
            name,
            value,
            description: description.into(),
        });
        Ok(())
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id() == logical_id)
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Resources of one type, in declaration order
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.id.resource_type == resource_type)
    }

    /// Resource count per type
    pub fn count_by_type(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for resource in &self.resources {
            *counts.entry(resource.id.resource_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_resources(&self.resources)
    }

    /// Validate every resource against the provider catalogue and check references
    pub fn validate(&self, provider: &dyn Provider) -> Result<(), Vec<StackError>> {
        let mut errors = Vec::new();

        for resource in &self.resources {
            let Some(resource_type) = provider.resource_type(&resource.id.resource_type) else {
                errors.push(StackError::UnknownResourceType {
                    logical_id: resource.id.name.clone(),
                    resource_type: resource.id.resource_type.clone(),
                });
                continue;
            };

            if let Err(type_errors) = resource_type.schema().validate(&resource.attributes) {
                errors.extend(type_errors.into_iter().map(|error| StackError::Schema {
                    logical_id: resource.id.name.clone(),
                    resource_type: resource.id.resource_type.clone(),
                    error,
                }));
            }
        }

        let graph = self.dependency_graph();
        for (from, dep) in graph.dangling() {
            errors.push(StackError::DanglingReference {
                from,
                used_in: dep.used_in,
                target: dep.target,
            });
        }
        if graph.has_cycle() {
            errors.push(StackError::Cycle(self.name.clone()));
        }

        for output in &self.outputs {
            let mut refs = Vec::new();
            collect_references(&output.value, &mut refs);
            for (target, _) in refs {
                if self.resource(&target).is_none() {
                    errors.push(StackError::DanglingOutput {
                        output: output.name.clone(),
                        target,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Logical IDs and output names are alphanumeric in the template format
pub fn is_valid_logical_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 255 && id.chars().all(|c| c.is_ascii_alphanumeric())
}
