//! Transit Gateway schema definitions

use vyos_sample_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{AwsSchemaConfig, enable_disable, private_asn, tags_type};

/// Returns the schema config for ec2_transit_gateway (AWS::EC2::TransitGateway)
pub fn ec2_transit_gateway_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::TransitGateway",
        resource_type_name: "ec2_transit_gateway",
        has_tags: true,
        schema: ResourceSchema::new("ec2_transit_gateway")
            .with_description("A regional hub interconnecting VPCs and VPN connections")
            .attribute(
                AttributeSchema::new("description", AttributeType::String)
                    .with_provider_name("Description"),
            )
            .attribute(
                AttributeSchema::new("amazon_side_asn", private_asn())
                    .with_description("Private ASN for the Amazon side of a BGP session")
                    .with_provider_name("AmazonSideAsn"),
            )
            .attribute(
                AttributeSchema::new("default_route_table_association", enable_disable())
                    .with_provider_name("DefaultRouteTableAssociation"),
            )
            .attribute(
                AttributeSchema::new("default_route_table_propagation", enable_disable())
                    .with_provider_name("DefaultRouteTablePropagation"),
            )
            .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags")),
    }
}

/// Returns the schema config for ec2_transit_gateway_route_table
pub fn ec2_transit_gateway_route_table_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::TransitGatewayRouteTable",
        resource_type_name: "ec2_transit_gateway_route_table",
        has_tags: true,
        schema: ResourceSchema::new("ec2_transit_gateway_route_table")
            .attribute(
                AttributeSchema::new("transit_gateway_id", AttributeType::String)
                    .required()
                    .with_provider_name("TransitGatewayId"),
            )
            .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags")),
    }
}

/// Returns the schema config for ec2_transit_gateway_vpc_attachment
pub fn ec2_transit_gateway_vpc_attachment_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::TransitGatewayVpcAttachment",
        resource_type_name: "ec2_transit_gateway_vpc_attachment",
        has_tags: true,
        schema: ResourceSchema::new("ec2_transit_gateway_vpc_attachment")
            .attribute(
                AttributeSchema::new("transit_gateway_id", AttributeType::String)
                    .required()
                    .with_provider_name("TransitGatewayId"),
            )
            .attribute(
                AttributeSchema::new("vpc_id", AttributeType::String)
                    .required()
                    .with_provider_name("VpcId"),
            )
            .attribute(
                AttributeSchema::new("subnet_ids", types::id_list())
                    .required()
                    .with_description("One subnet per availability zone the attachment spans")
                    .with_provider_name("SubnetIds"),
            )
            .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags")),
    }
}

fn attachment_binding_schema(resource_type: &str) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .attribute(
            AttributeSchema::new("transit_gateway_attachment_id", AttributeType::String)
                .required()
                .with_provider_name("TransitGatewayAttachmentId"),
        )
        .attribute(
            AttributeSchema::new("transit_gateway_route_table_id", AttributeType::String)
                .required()
                .with_provider_name("TransitGatewayRouteTableId"),
        )
}

/// Returns the schema config for ec2_transit_gateway_route_table_association
pub fn ec2_transit_gateway_route_table_association_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::TransitGatewayRouteTableAssociation",
        resource_type_name: "ec2_transit_gateway_route_table_association",
        has_tags: false,
        schema: attachment_binding_schema("ec2_transit_gateway_route_table_association"),
    }
}

/// Returns the schema config for ec2_transit_gateway_route_table_propagation
pub fn ec2_transit_gateway_route_table_propagation_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::TransitGatewayRouteTablePropagation",
        resource_type_name: "ec2_transit_gateway_route_table_propagation",
        has_tags: false,
        schema: attachment_binding_schema("ec2_transit_gateway_route_table_propagation"),
    }
}

/// Returns the schema config for ec2_transit_gateway_route (AWS::EC2::TransitGatewayRoute)
pub fn ec2_transit_gateway_route_config() -> AwsSchemaConfig {
    AwsSchemaConfig {
        aws_type_name: "AWS::EC2::TransitGatewayRoute",
        resource_type_name: "ec2_transit_gateway_route",
        has_tags: false,
        schema: attachment_binding_schema("ec2_transit_gateway_route").attribute(
            AttributeSchema::new("destination_cidr_block", types::cidr())
                .required()
                .with_provider_name("DestinationCidrBlock"),
        ),
    }
}
