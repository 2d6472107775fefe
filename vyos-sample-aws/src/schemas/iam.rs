//! IAM schema definitions

use vyos_sample_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AwsSchemaConfig, policy_document, tags_type};

/// Returns the schema config for iam_role (AWS::IAM::Role)
pub fn iam_role_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::IAM::Role",
        resource_type_name: "iam_role",
        has_tags: true,
        schema: ResourceSchema::new("iam_role")
            .attribute(
                AttributeSchema::new("assume_role_policy_document", policy_document())
                    .required()
                    .with_provider_name("AssumeRolePolicyDocument"),
            )
            .attribute(
                AttributeSchema::new("managed_policy_arns", types::id_list())
                    .with_provider_name("ManagedPolicyArns"),
            )
            .attribute(
                AttributeSchema::new("role_name", AttributeType::String)
                    .with_provider_name("RoleName"),
            )
            .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags")),
    }
}

/// Returns the schema config for iam_instance_profile (AWS::IAM::InstanceProfile)
pub fn iam_instance_profile_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::IAM::InstanceProfile",
        resource_type_name: "iam_instance_profile",
        has_tags: false,
        schema: ResourceSchema::new("iam_instance_profile").attribute(
            AttributeSchema::new("roles", types::id_list())
                .required()
                .with_provider_name("Roles"),
        ),
    }
}
