//! Provider - Trait abstracting the resource catalogue of a provisioning engine
//!
//! A Provider describes which resource types a provisioning engine accepts
//! and how each one is spelled in a template. It never talks to the engine:
//! the synthesized templates are handed over as files.

use crate::schema::ResourceSchema;

/// Definition of a resource type that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name used in the model (e.g., "ec2_vpc")
    fn name(&self) -> &'static str;

    /// Template type name (e.g., "AWS::EC2::VPC")
    fn template_type(&self) -> &'static str;

    /// Whether the `tags` attribute is rendered as a Key/Value list
    fn has_tags(&self) -> bool;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Look up a single resource type by model name
    fn resource_type(&self, name: &str) -> Option<Box<dyn ResourceType>> {
        self.resource_types().into_iter().find(|t| t.name() == name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType, types};

    /// Catalogue with just enough types for core tests
    pub(crate) struct MockProvider;

    struct MockType {
        name: &'static str,
        template_type: &'static str,
        has_tags: bool,
        schema: fn() -> ResourceSchema,
    }

    impl ResourceType for MockType {
        fn name(&self) -> &'static str {
            self.name
        }

        fn template_type(&self) -> &'static str {
            self.template_type
        }

        fn has_tags(&self) -> bool {
            self.has_tags
        }

        fn schema(&self) -> ResourceSchema {
            (self.schema)()
        }
    }

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![
                Box::new(MockType {
                    name: "vpc",
                    template_type: "Mock::VPC",
                    has_tags: true,
                    schema: || {
                        ResourceSchema::new("vpc")
                            .attribute(AttributeSchema::new("cidr_block", types::cidr()).required())
                            .attribute(AttributeSchema::new("tags", types::tags()))
                    },
                }),
                Box::new(MockType {
                    name: "subnet",
                    template_type: "Mock::Subnet",
                    has_tags: false,
                    schema: || {
                        ResourceSchema::new("subnet")
                            .attribute(
                                AttributeSchema::new("vpc_id", AttributeType::String).required(),
                            )
                            .attribute(
                                AttributeSchema::new("cidr_block", types::cidr())
                                    .required()
                                    .with_provider_name("CidrBlock"),
                            )
                            .attribute(AttributeSchema::new("user_data", AttributeType::String))
                    },
                }),
            ]
        }
    }

    #[test]
    fn lookup_resource_type_by_name() {
        let provider = MockProvider;
        assert_eq!(
            provider.resource_type("vpc").map(|t| t.template_type()),
            Some("Mock::VPC")
        );
        assert!(provider.resource_type("unknown").is_none());
    }
}
