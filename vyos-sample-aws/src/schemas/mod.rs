//! AWS CloudFormation resource schema definitions
//!
//! Each resource type is described once: its model name, CloudFormation type
//! name, whether it carries tags, and the attribute schema (with the
//! CloudFormation property name of every attribute).

pub mod ec2;
pub mod iam;
pub mod transit_gateway;

use vyos_sample_core::instance_type::InstanceType;
use vyos_sample_core::provider::ResourceType;
use vyos_sample_core::resource::Value;
use vyos_sample_core::schema::{AttributeType, ResourceSchema};

use crate::utils;

/// AWS schema configuration
///
/// Combines the ResourceSchema with the CloudFormation metadata the
/// synthesizer needs.
pub struct AwsSchemaConfig {
    /// AWS CloudFormation type name (e.g., "AWS::EC2::VPC")
    pub aws_type_name: &'static str,
    /// Resource type name in the model (e.g., "ec2_vpc")
    pub resource_type_name: &'static str,
    /// Whether this resource type uses tags
    pub has_tags: bool,
    /// The resource schema with attribute definitions
    pub schema: ResourceSchema,
}

impl ResourceType for AwsSchemaConfig {
    fn name(&self) -> &'static str {
        self.resource_type_name
    }

    fn template_type(&self) -> &'static str {
        self.aws_type_name
    }

    fn has_tags(&self) -> bool {
        self.has_tags
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }
}

/// Returns every schema config known to the catalogue
pub fn configs() -> Vec<AwsSchemaConfig> {
    vec![
        ec2::ec2_vpc_config(),
        ec2::ec2_subnet_config(),
        ec2::ec2_route_table_config(),
        ec2::ec2_subnet_route_table_association_config(),
        ec2::ec2_route_config(),
        ec2::ec2_internet_gateway_config(),
        ec2::ec2_vpc_gateway_attachment_config(),
        ec2::ec2_security_group_config(),
        ec2::ec2_security_group_ingress_config(),
        ec2::ec2_security_group_egress_config(),
        ec2::ec2_vpc_endpoint_config(),
        ec2::ec2_instance_config(),
        ec2::ec2_eip_config(),
        ec2::ec2_eip_association_config(),
        ec2::ec2_key_pair_config(),
        transit_gateway::ec2_transit_gateway_config(),
        transit_gateway::ec2_transit_gateway_route_table_config(),
        transit_gateway::ec2_transit_gateway_vpc_attachment_config(),
        transit_gateway::ec2_transit_gateway_route_table_association_config(),
        transit_gateway::ec2_transit_gateway_route_table_propagation_config(),
        transit_gateway::ec2_transit_gateway_route_config(),
        iam::iam_role_config(),
        iam::iam_instance_profile_config(),
    ]
}

/// Tags type for AWS resources (map of tag key to value)
pub fn tags_type() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

/// Availability zone (e.g., "ap-northeast-1c")
pub fn availability_zone() -> AttributeType {
    AttributeType::Custom {
        name: "AvailabilityZone".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if utils::is_valid_availability_zone(s) => Ok(()),
            Value::String(s) => Err(format!("Invalid availability zone '{}'", s)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// AMI id (e.g., "ami-05a998030d78b5358")
pub fn ami_id() -> AttributeType {
    AttributeType::Custom {
        name: "AmiId".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if utils::is_valid_ami_id(s) => Ok(()),
            Value::String(s) => Err(format!("Invalid AMI id '{}'", s)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// EC2 instance type (e.g., "t3.micro")
pub fn instance_type() -> AttributeType {
    AttributeType::Custom {
        name: "InstanceType".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => s
                .parse::<InstanceType>()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Private ASN usable as the Amazon side of a Transit Gateway
pub fn private_asn() -> AttributeType {
    AttributeType::Custom {
        name: "PrivateAsn".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if is_private_asn(*n) => Ok(()),
            Value::Int(n) => Err(format!(
                "ASN {} is not in a private range (64512-65534 or 4200000000-4294967294)",
                n
            )),
            _ => Err("Expected integer".to_string()),
        },
    }
}

pub fn is_private_asn(asn: i64) -> bool {
    (64512..=65534).contains(&asn) || (4_200_000_000..=4_294_967_294).contains(&asn)
}

/// Transit Gateway default association/propagation switch
pub fn enable_disable() -> AttributeType {
    AttributeType::Enum(vec!["enable".to_string(), "disable".to_string()])
}

/// Inline security group rule, written in template casing
/// (e.g. `{"IpProtocol": "-1", "CidrIp": "0.0.0.0/0"}`)
pub fn security_group_rule() -> AttributeType {
    AttributeType::Custom {
        name: "SecurityGroupRule".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::Map(rule) => {
                if !rule.contains_key("IpProtocol") {
                    return Err("Security group rule requires IpProtocol".to_string());
                }
                match rule.get("CidrIp") {
                    Some(Value::String(cidr)) => vyos_sample_core::schema::validate_cidr(cidr),
                    Some(_) => Err("CidrIp must be a string".to_string()),
                    None => Err("Security group rule requires CidrIp".to_string()),
                }
            }
            _ => Err("Expected map".to_string()),
        },
    }
}

/// IAM policy document, written in template casing
pub fn policy_document() -> AttributeType {
    AttributeType::Custom {
        name: "PolicyDocument".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::Map(doc) => match doc.get("Statement") {
                Some(Value::List(statements)) if !statements.is_empty() => Ok(()),
                _ => Err("Policy document requires a non-empty Statement list".to_string()),
            },
            _ => Err("Expected map".to_string()),
        },
    }
}
