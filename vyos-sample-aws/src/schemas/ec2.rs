//! EC2 networking and compute schema definitions
//!
//! Based on the CloudFormation AWS::EC2::* resource reference.

use vyos_sample_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{
    AwsSchemaConfig, ami_id, availability_zone, instance_type, security_group_rule, tags_type,
};

fn attr(name: &str, attr_type: AttributeType, provider_name: &str) -> AttributeSchema {
    AttributeSchema::new(name, attr_type).with_provider_name(provider_name)
}

fn tags() -> AttributeSchema {
    attr("tags", tags_type(), "Tags")
}

/// Returns the schema config for ec2_vpc (AWS::EC2::VPC)
pub fn ec2_vpc_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::VPC",
        resource_type_name: "ec2_vpc",
        has_tags: true,
        schema: ResourceSchema::new("ec2_vpc")
            .with_description("A virtual private cloud")
            .attribute(
                attr("cidr_block", types::cidr(), "CidrBlock")
                    .required()
                    .with_description("The IPv4 network range for the VPC, in CIDR notation"),
            )
            .attribute(attr("enable_dns_hostnames", AttributeType::Bool, "EnableDnsHostnames"))
            .attribute(attr("enable_dns_support", AttributeType::Bool, "EnableDnsSupport"))
            .attribute(attr(
                "instance_tenancy",
                AttributeType::Enum(vec!["default".to_string(), "dedicated".to_string()]),
                "InstanceTenancy",
            ))
            .attribute(tags()),
    }
}

/// Returns the schema config for ec2_subnet (AWS::EC2::Subnet)
pub fn ec2_subnet_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::Subnet",
        resource_type_name: "ec2_subnet",
        has_tags: true,
        schema: ResourceSchema::new("ec2_subnet")
            .with_description("A subnet of a VPC")
            .attribute(attr("vpc_id", AttributeType::String, "VpcId").required())
            .attribute(attr("cidr_block", types::cidr(), "CidrBlock").required())
            .attribute(attr("availability_zone", availability_zone(), "AvailabilityZone"))
            .attribute(
                attr("map_public_ip_on_launch", AttributeType::Bool, "MapPublicIpOnLaunch")
                    .with_description("Whether instances launched in this subnet receive a public IPv4 address"),
            )
            .attribute(tags()),
    }
}

/// Returns the schema config for ec2_route_table (AWS::EC2::RouteTable)
pub fn ec2_route_table_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::RouteTable",
        resource_type_name: "ec2_route_table",
        has_tags: true,
        schema: ResourceSchema::new("ec2_route_table")
            .attribute(attr("vpc_id", AttributeType::String, "VpcId").required())
            .attribute(tags()),
    }
}

/// Returns the schema config for ec2_subnet_route_table_association
pub fn ec2_subnet_route_table_association_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::SubnetRouteTableAssociation",
        resource_type_name: "ec2_subnet_route_table_association",
        has_tags: false,
        schema: ResourceSchema::new("ec2_subnet_route_table_association")
            .attribute(attr("route_table_id", AttributeType::String, "RouteTableId").required())
            .attribute(attr("subnet_id", AttributeType::String, "SubnetId").required()),
    }
}

/// Returns the schema config for ec2_route (AWS::EC2::Route)
pub fn ec2_route_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::Route",
        resource_type_name: "ec2_route",
        has_tags: false,
        schema: ResourceSchema::new("ec2_route")
            .with_description("A route in a VPC route table")
            .attribute(attr("route_table_id", AttributeType::String, "RouteTableId").required())
            .attribute(
                attr("destination_cidr_block", types::cidr(), "DestinationCidrBlock").required(),
            )
            .attribute(attr("gateway_id", AttributeType::String, "GatewayId"))
            .attribute(attr("transit_gateway_id", AttributeType::String, "TransitGatewayId")),
    }
}

/// Returns the schema config for ec2_internet_gateway (AWS::EC2::InternetGateway)
pub fn ec2_internet_gateway_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::InternetGateway",
        resource_type_name: "ec2_internet_gateway",
        has_tags: true,
        schema: ResourceSchema::new("ec2_internet_gateway").attribute(tags()),
    }
}

/// Returns the schema config for ec2_vpc_gateway_attachment (AWS::EC2::VPCGatewayAttachment)
pub fn ec2_vpc_gateway_attachment_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::VPCGatewayAttachment",
        resource_type_name: "ec2_vpc_gateway_attachment",
        has_tags: false,
        schema: ResourceSchema::new("ec2_vpc_gateway_attachment")
            .attribute(attr("vpc_id", AttributeType::String, "VpcId").required())
            .attribute(attr("internet_gateway_id", AttributeType::String, "InternetGatewayId")),
    }
}

/// Returns the schema config for ec2_security_group (AWS::EC2::SecurityGroup)
pub fn ec2_security_group_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::SecurityGroup",
        resource_type_name: "ec2_security_group",
        has_tags: true,
        schema: ResourceSchema::new("ec2_security_group")
            .attribute(
                attr("group_description", AttributeType::String, "GroupDescription").required(),
            )
            .attribute(attr("vpc_id", AttributeType::String, "VpcId"))
            .attribute(
                attr(
                    "security_group_egress",
                    AttributeType::List(Box::new(security_group_rule())),
                    "SecurityGroupEgress",
                )
                .with_description("Outbound rules declared inline with the group"),
            )
            .attribute(tags()),
    }
}

fn security_group_rule_schema(resource_type: &str, peer: &str, peer_provider: &str) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .attribute(attr("group_id", AttributeType::String, "GroupId").required())
        .attribute(attr("ip_protocol", types::ip_protocol(), "IpProtocol").required())
        .attribute(attr("from_port", types::port_number(), "FromPort"))
        .attribute(attr("to_port", types::port_number(), "ToPort"))
        .attribute(attr("description", AttributeType::String, "Description"))
        .attribute(attr(peer, AttributeType::String, peer_provider))
}

/// Returns the schema config for ec2_security_group_ingress (AWS::EC2::SecurityGroupIngress)
pub fn ec2_security_group_ingress_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::SecurityGroupIngress",
        resource_type_name: "ec2_security_group_ingress",
        has_tags: false,
        schema: security_group_rule_schema(
            "ec2_security_group_ingress",
            "source_security_group_id",
            "SourceSecurityGroupId",
        )
        .attribute(attr("cidr_ip", types::cidr(), "CidrIp")),
    }
}

/// Returns the schema config for ec2_security_group_egress (AWS::EC2::SecurityGroupEgress)
pub fn ec2_security_group_egress_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::SecurityGroupEgress",
        resource_type_name: "ec2_security_group_egress",
        has_tags: false,
        schema: security_group_rule_schema(
            "ec2_security_group_egress",
            "destination_security_group_id",
            "DestinationSecurityGroupId",
        )
        .attribute(attr("cidr_ip", types::cidr(), "CidrIp")),
    }
}

/// Returns the schema config for ec2_vpc_endpoint (AWS::EC2::VPCEndpoint)
pub fn ec2_vpc_endpoint_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::VPCEndpoint",
        resource_type_name: "ec2_vpc_endpoint",
        has_tags: false,
        schema: ResourceSchema::new("ec2_vpc_endpoint")
            .attribute(attr("service_name", AttributeType::String, "ServiceName").required())
            .attribute(attr("vpc_id", AttributeType::String, "VpcId").required())
            .attribute(attr(
                "vpc_endpoint_type",
                AttributeType::Enum(vec!["Interface".to_string(), "Gateway".to_string()]),
                "VpcEndpointType",
            ))
            .attribute(attr("private_dns_enabled", AttributeType::Bool, "PrivateDnsEnabled"))
            .attribute(attr("subnet_ids", types::id_list(), "SubnetIds"))
            .attribute(attr("security_group_ids", types::id_list(), "SecurityGroupIds")),
    }
}

/// Returns the schema config for ec2_instance (AWS::EC2::Instance)
pub fn ec2_instance_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::Instance",
        resource_type_name: "ec2_instance",
        has_tags: true,
        schema: ResourceSchema::new("ec2_instance")
            .with_description("An EC2 instance")
            .attribute(attr("image_id", ami_id(), "ImageId").required())
            .attribute(attr("instance_type", instance_type(), "InstanceType").required())
            .attribute(attr("subnet_id", AttributeType::String, "SubnetId").required())
            .attribute(attr("availability_zone", availability_zone(), "AvailabilityZone"))
            .attribute(attr("security_group_ids", types::id_list(), "SecurityGroupIds"))
            .attribute(attr("iam_instance_profile", AttributeType::String, "IamInstanceProfile"))
            .attribute(attr("key_name", AttributeType::String, "KeyName"))
            .attribute(
                attr("source_dest_check", AttributeType::Bool, "SourceDestCheck")
                    .with_description("Must be false for an instance that routes traffic"),
            )
            .attribute(attr("user_data", AttributeType::String, "UserData"))
            .attribute(tags()),
    }
}

/// Returns the schema config for ec2_eip (AWS::EC2::EIP)
pub fn ec2_eip_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::EIP",
        resource_type_name: "ec2_eip",
        has_tags: true,
        schema: ResourceSchema::new("ec2_eip")
            .attribute(attr(
                "domain",
                AttributeType::Enum(vec!["vpc".to_string(), "standard".to_string()]),
                "Domain",
            ))
            .attribute(tags()),
    }
}

/// Returns the schema config for ec2_eip_association (AWS::EC2::EIPAssociation)
pub fn ec2_eip_association_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::EIPAssociation",
        resource_type_name: "ec2_eip_association",
        has_tags: false,
        schema: ResourceSchema::new("ec2_eip_association")
            .attribute(attr("allocation_id", AttributeType::String, "AllocationId").required())
            .attribute(attr("instance_id", AttributeType::String, "InstanceId").required()),
    }
}

/// Returns the schema config for ec2_key_pair (AWS::EC2::KeyPair)
pub fn ec2_key_pair_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::KeyPair",
        resource_type_name: "ec2_key_pair",
        has_tags: false,
        schema: ResourceSchema::new("ec2_key_pair")
            .with_description(
                "An EC2 key pair; the private key is stored in Systems Manager under /ec2/keypair/<KeyPairId>",
            )
            .attribute(attr("key_name", AttributeType::String, "KeyName").required())
            .attribute(attr(
                "key_type",
                AttributeType::Enum(vec!["rsa".to_string(), "ed25519".to_string()]),
                "KeyType",
            ))
            .attribute(attr(
                "key_format",
                AttributeType::Enum(vec!["pem".to_string(), "ppk".to_string()]),
                "KeyFormat",
            )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vyos_sample_core::resource::Value;
    use vyos_sample_core::schema::TypeError;

    #[test]
    fn subnet_requires_vpc_and_cidr() {
        let schema = ec2_subnet_config().schema;
        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                TypeError::MissingRequired {
                    name: "cidr_block".to_string()
                },
                TypeError::MissingRequired {
                    name: "vpc_id".to_string()
                },
            ]
        );
    }

    #[test]
    fn ingress_rule_accepts_reference_peer() {
        let schema = ec2_security_group_ingress_config().schema;
        let mut attrs = HashMap::new();
        attrs.insert("group_id".to_string(), Value::attr("EndpointSg", "GroupId"));
        attrs.insert("ip_protocol".to_string(), Value::string("tcp"));
        attrs.insert("from_port".to_string(), Value::Int(443));
        attrs.insert("to_port".to_string(), Value::Int(443));
        attrs.insert(
            "source_security_group_id".to_string(),
            Value::attr("TestSg", "GroupId"),
        );
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("ip_protocol".to_string(), Value::string("sctp"));
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn instance_rejects_malformed_instance_type() {
        let schema = ec2_instance_config().schema;
        let mut attrs = HashMap::new();
        attrs.insert("image_id".to_string(), Value::string("ami-0bc8f29a8fc3184aa"));
        attrs.insert("instance_type".to_string(), Value::string("t3micro"));
        attrs.insert("subnet_id".to_string(), Value::reference("Subnet"));

        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ValidationFailed { .. }));
    }
}
