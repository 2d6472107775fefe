//! Tokyo side: two VPCs joined by a Transit Gateway that also terminates the VPN

use ipnet::Ipv4Net;
use log::debug;
use vyos_sample_aws::constructs::{
    Instance, InstanceProps, InstanceRole, InterfaceEndpointProps, InterfaceService, Peer, Port,
    SecurityGroup, SubnetGroup, SubnetSelection, Vpc, VpcProps,
};
use vyos_sample_aws::utils::{availability_zone, is_valid_tgw_attachment_id};
use vyos_sample_core::resource::{Resource, Value};
use vyos_sample_core::stack::{Environment, ResourceHandle, Stack};

use super::{BuildError, SSM_MANAGED_POLICY, tgw_for_vpn_stack_name};
use crate::config::{Stage, ValidatedConfig};

const EC2_GROUP: &str = "EC2";
const ATTACHMENT_GROUP: &str = "TGW-Attachment";
const ZONE: char = 'c';

/// State of the Transit Gateway route toward the on-premises network.
///
/// The VPN attachment is created outside this app, so the route can only be
/// declared once its id is known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OnPremRoute {
    #[default]
    Pending,
    Attached { attachment_id: String },
}

impl OnPremRoute {
    pub fn attached(attachment_id: impl Into<String>) -> Result<Self, BuildError> {
        let attachment_id = attachment_id.into();
        if !is_valid_tgw_attachment_id(&attachment_id) {
            return Err(BuildError::InvalidVpnAttachment(attachment_id));
        }
        Ok(OnPremRoute::Attached { attachment_id })
    }
}

fn tokyo_vpc_props(cidr: Ipv4Net, zone: &str) -> VpcProps {
    VpcProps::new(cidr, zone)
        .with_subnet_group(SubnetGroup::isolated(EC2_GROUP))
        .with_subnet_group(SubnetGroup::isolated(ATTACHMENT_GROUP))
}

fn add_ssm_endpoints(
    stack: &mut Stack,
    vpc: &Vpc,
    security_group: &SecurityGroup,
    suffix: &str,
) -> Result<(), BuildError> {
    for (name, service) in [
        ("SSMVPCEndpoint", InterfaceService::Ssm),
        ("SSMMessagesVPCEndpoint", InterfaceService::SsmMessages),
    ] {
        vpc.add_interface_endpoint(
            stack,
            &format!("{}{}", name, suffix),
            InterfaceEndpointProps {
                service,
                subnets: SubnetSelection::group(EC2_GROUP),
                security_groups: vec![security_group],
                private_dns_enabled: true,
            },
        )?;
    }
    Ok(())
}

fn attach_vpc(
    stack: &mut Stack,
    id: &str,
    transit_gateway: &ResourceHandle,
    vpc: &Vpc,
    name: String,
) -> Result<ResourceHandle, BuildError> {
    let subnet_ids = vpc
        .select_subnets(&SubnetSelection::group(ATTACHMENT_GROUP))?
        .into_iter()
        .map(|s| s.subnet_id())
        .collect();
    Ok(stack.add(
        Resource::new("ec2_transit_gateway_vpc_attachment", id)
            .with_attribute("transit_gateway_id", transit_gateway.reference())
            .with_attribute("vpc_id", vpc.vpc_id())
            .with_attribute("subnet_ids", Value::List(subnet_ids))
            .with_name_tag(name),
    )?)
}

fn bind_to_route_table(
    stack: &mut Stack,
    resource_type: &str,
    id: &str,
    attachment: &ResourceHandle,
    route_table: &ResourceHandle,
) -> Result<ResourceHandle, BuildError> {
    Ok(stack.add(
        Resource::new(resource_type, id)
            .with_attribute("transit_gateway_attachment_id", attachment.reference())
            .with_attribute("transit_gateway_route_table_id", route_table.reference()),
    )?)
}

fn add_static_route(
    stack: &mut Stack,
    id: &str,
    route_table: &ResourceHandle,
    destination: Ipv4Net,
    attachment: Value,
) -> Result<ResourceHandle, BuildError> {
    Ok(stack.add(
        Resource::new("ec2_transit_gateway_route", id)
            .with_attribute("transit_gateway_route_table_id", route_table.reference())
            .with_attribute("destination_cidr_block", Value::string(destination.to_string()))
            .with_attribute("transit_gateway_attachment_id", attachment),
    )?)
}

/// Test instances answer pings from both VPCs and the on-premises network.
/// Their HTTPS egress to the endpoints is covered by "all outbound".
fn allow_test_traffic(
    stack: &mut Stack,
    test_group: &mut SecurityGroup,
    endpoint_group: &SecurityGroup,
    config: &ValidatedConfig,
) -> Result<(), BuildError> {
    for (cidr, description) in [
        (config.tokyo_vpc1_cidr, "Allow ICMP from VPC1"),
        (config.tokyo_vpc2_cidr, "Allow ICMP from VPC2"),
        (config.osaka_vpc_cidr, "Allow ICMP from Osaka via VPN"),
    ] {
        test_group.add_ingress_rule(stack, Peer::ipv4(cidr), Port::AllIcmp, description)?;
    }
    test_group.add_egress_rule(
        stack,
        Peer::security_group(endpoint_group),
        Port::Tcp(443),
        "Allow HTTPS to VPC endpoints",
    )?;
    Ok(())
}

/// Build the `<Prefix>-TgwForVpnStack` stack
pub fn tgw_for_vpn_stack(
    stage: Stage,
    config: &ValidatedConfig,
    on_prem_route: &OnPremRoute,
) -> Result<Stack, BuildError> {
    let project = &config.project_name;
    let mut stack = Stack::new(
        tgw_for_vpn_stack_name(stage),
        Environment::new(&config.account, &config.tokyo_region),
    )
    .with_description(format!(
        "Transit Gateway and test VPCs for the VyOS site-to-site VPN ({})",
        stage
    ));

    let role = InstanceRole::new(
        &mut stack,
        "EC2SSMRole",
        &format!("{}-EC2SSMRole", project),
        &[SSM_MANAGED_POLICY],
    )?;

    let zone = availability_zone(&config.tokyo_region, ZONE);
    let vpc1 = Vpc::new(&mut stack, "VPC1", tokyo_vpc_props(config.tokyo_vpc1_cidr, &zone))?;
    let vpc2 = Vpc::new(&mut stack, "VPC2", tokyo_vpc_props(config.tokyo_vpc2_cidr, &zone))?;

    let mut endpoint_sg1 = SecurityGroup::new(
        &mut stack,
        "VPCEndpointSG1",
        &vpc1,
        "Security group for VPC endpoints in VPC1",
        false,
    )?;
    let mut test_sg1 = SecurityGroup::new(
        &mut stack,
        "TestSecurityGroup1",
        &vpc1,
        "Security group for test instances in VPC1",
        true,
    )?;
    endpoint_sg1.add_ingress_rule(
        &mut stack,
        Peer::security_group(&test_sg1),
        Port::Tcp(443),
        "Allow HTTPS from test instances",
    )?;
    add_ssm_endpoints(&mut stack, &vpc1, &endpoint_sg1, "")?;

    let mut endpoint_sg2 = SecurityGroup::new(
        &mut stack,
        "VPCEndpointSG2",
        &vpc2,
        "Security group for VPC endpoints in VPC2",
        false,
    )?;
    let mut test_sg2 = SecurityGroup::new(
        &mut stack,
        "TestSecurityGroup2",
        &vpc2,
        "Security group for test instances in VPC2",
        true,
    )?;
    endpoint_sg2.add_ingress_rule(
        &mut stack,
        Peer::security_group(&test_sg2),
        Port::Tcp(443),
        "Allow HTTPS from test instances in VPC2",
    )?;
    add_ssm_endpoints(&mut stack, &vpc2, &endpoint_sg2, "2")?;

    let tgw = stack.add(
        Resource::new("ec2_transit_gateway", "TransitGateway")
            .with_attribute(
                "description",
                Value::string("Tokyo region TGW for Site-to-Site VPN testing"),
            )
            .with_attribute("amazon_side_asn", Value::Int(i64::from(config.asn)))
            .with_attribute("default_route_table_association", Value::string("disable"))
            .with_attribute("default_route_table_propagation", Value::string("disable"))
            .with_name_tag(format!("{}-tokyo-tgw", project)),
    )?;
    let route_table = stack.add(
        Resource::new("ec2_transit_gateway_route_table", "UnifiedRouteTable")
            .with_attribute("transit_gateway_id", tgw.reference())
            .with_name_tag(format!("{}-unified-route-table", project)),
    )?;

    let attachment1 = attach_vpc(
        &mut stack,
        "TGWAttachment1",
        &tgw,
        &vpc1,
        format!("{}-vpc1-tgw-attachment", project),
    )?;
    let attachment2 = attach_vpc(
        &mut stack,
        "TGWAttachment2",
        &tgw,
        &vpc2,
        format!("{}-vpc2-tgw-attachment", project),
    )?;

    for (prefix, attachment) in [("VPC1", &attachment1), ("VPC2", &attachment2)] {
        bind_to_route_table(
            &mut stack,
            "ec2_transit_gateway_route_table_association",
            &format!("{}RouteTableAssociation", prefix),
            attachment,
            &route_table,
        )?;
        bind_to_route_table(
            &mut stack,
            "ec2_transit_gateway_route_table_propagation",
            &format!("{}RouteTablePropagation", prefix),
            attachment,
            &route_table,
        )?;
    }

    add_static_route(
        &mut stack,
        "VPC1Route",
        &route_table,
        config.tokyo_vpc1_cidr,
        attachment1.reference(),
    )?;
    add_static_route(
        &mut stack,
        "VPC2Route",
        &route_table,
        config.tokyo_vpc2_cidr,
        attachment2.reference(),
    )?;

    let on_prem_status = match on_prem_route {
        OnPremRoute::Pending => {
            debug!(
                "{}: route to {} left pending until the VPN attachment exists",
                stack.name(),
                config.osaka_vpc_cidr
            );
            Value::join(
                "",
                vec![
                    Value::string(format!(
                        "Pending: add a route for {} to the VPN attachment in ",
                        config.osaka_vpc_cidr
                    )),
                    route_table.reference(),
                ],
            )
        }
        OnPremRoute::Attached { attachment_id } => {
            add_static_route(
                &mut stack,
                "VPNRoute",
                &route_table,
                config.osaka_vpc_cidr,
                Value::string(attachment_id),
            )?;
            Value::string(format!(
                "Attached: {} via {}",
                config.osaka_vpc_cidr, attachment_id
            ))
        }
    };

    let selection = SubnetSelection::group(EC2_GROUP);
    for (vpc, attachment, peer_id, peer_cidr) in [
        (&vpc1, &attachment1, "ToVPC2", config.tokyo_vpc2_cidr),
        (&vpc2, &attachment2, "ToVPC1", config.tokyo_vpc1_cidr),
    ] {
        for (id, destination) in [(peer_id, peer_cidr), ("ToOnPrem", config.osaka_vpc_cidr)] {
            vpc.add_transit_gateway_routes(
                &mut stack,
                id,
                &selection,
                destination,
                tgw.reference(),
                attachment.logical_id(),
            )?;
        }
    }

    allow_test_traffic(&mut stack, &mut test_sg1, &endpoint_sg1, config)?;
    allow_test_traffic(&mut stack, &mut test_sg2, &endpoint_sg2, config)?;

    let test_instance1 = Instance::new(
        &mut stack,
        "TestInstance1",
        InstanceProps::new(
            vpc1.subnet(&selection)?,
            config.test_instance_type,
            &config.test_instance_ami_id,
            &test_sg1,
        )
        .with_role(&role),
    )?;
    let test_instance2 = Instance::new(
        &mut stack,
        "TestInstance2",
        InstanceProps::new(
            vpc2.subnet(&selection)?,
            config.test_instance_type,
            &config.test_instance_ami_id,
            &test_sg2,
        )
        .with_role(&role),
    )?;

    stack.add_output("TGWId", tgw.reference(), "Transit Gateway ID")?;
    stack.add_output("VPC1Id", vpc1.vpc_id(), "VPC1 ID")?;
    stack.add_output("VPC2Id", vpc2.vpc_id(), "VPC2 ID")?;
    stack.add_output(
        "TestInstance1Id",
        test_instance1.instance_id(),
        "Test Instance 1 ID",
    )?;
    stack.add_output(
        "TestInstance2Id",
        test_instance2.instance_id(),
        "Test Instance 2 ID",
    )?;
    stack.add_output(
        "OnPremRouteStatus",
        on_prem_status,
        "Transit Gateway route toward the on-premises network",
    )?;

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vyos_sample_aws::AwsProvider;

    fn build(stage: Stage, on_prem_route: &OnPremRoute) -> Stack {
        let config = stage.config().validated().unwrap();
        tgw_for_vpn_stack(stage, &config, on_prem_route).unwrap()
    }

    #[test]
    fn transit_gateway_uses_configured_asn() {
        let stack = build(Stage::Dev, &OnPremRoute::Pending);
        let tgw = stack.resource("TransitGateway").unwrap();
        assert_eq!(tgw.attribute("amazon_side_asn"), Some(&Value::Int(64513)));
        assert_eq!(
            tgw.attribute("default_route_table_propagation"),
            Some(&Value::string("disable"))
        );
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn each_vpc_route_targets_its_own_attachment() {
        let stack = build(Stage::Prod, &OnPremRoute::Pending);
        let route = stack.resource("VPC2Route").unwrap();
        assert_eq!(
            route.attribute("destination_cidr_block"),
            Some(&Value::string("10.1.0.0/16"))
        );
        assert_eq!(
            route.attribute("transit_gateway_attachment_id"),
            Some(&Value::reference("TGWAttachment2"))
        );

        let attachment = stack.resource("TGWAttachment1").unwrap();
        assert_eq!(
            attachment.attribute("subnet_ids"),
            Some(&Value::List(vec![Value::reference(
                "VPC1TGWAttachmentSubnet1Subnet"
            )]))
        );
    }

    #[test]
    fn pending_on_prem_route_is_reported_not_declared() {
        let stack = build(Stage::Dev, &OnPremRoute::Pending);
        assert!(stack.resource("VPNRoute").is_none());
        assert_eq!(stack.resources_of_type("ec2_transit_gateway_route").count(), 2);
        assert!(stack.output("OnPremRouteStatus").is_some());
    }

    #[test]
    fn attached_on_prem_route_is_declared() {
        let route = OnPremRoute::attached("tgw-attach-0123456789abcdef0").unwrap();
        let stack = build(Stage::Dev, &route);
        let vpn = stack.resource("VPNRoute").unwrap();
        assert_eq!(
            vpn.attribute("destination_cidr_block"),
            Some(&Value::string("172.20.0.0/16"))
        );
        assert_eq!(
            vpn.attribute("transit_gateway_attachment_id"),
            Some(&Value::string("tgw-attach-0123456789abcdef0"))
        );
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn attachment_id_format_is_checked() {
        assert!(matches!(
            OnPremRoute::attached("vpn-0123"),
            Err(BuildError::InvalidVpnAttachment(_))
        ));
    }

    #[test]
    fn ec2_subnets_route_to_peer_and_on_prem_through_the_gateway() {
        let stack = build(Stage::Dev, &OnPremRoute::Pending);
        let route = stack.resource("VPC1EC2Subnet1RouteTableToVPC2").unwrap();
        assert_eq!(
            route.attribute("destination_cidr_block"),
            Some(&Value::string("172.17.0.0/16"))
        );
        assert_eq!(route.depends_on, vec!["TGWAttachment1".to_string()]);
        assert!(stack.resource("VPC2EC2Subnet1RouteTableToOnPrem").is_some());
        assert_eq!(stack.resources_of_type("ec2_route").count(), 4);
    }

    #[test]
    fn test_groups_only_get_ingress_rules() {
        let stack = build(Stage::Dev, &OnPremRoute::Pending);
        assert_eq!(
            stack.resources_of_type("ec2_security_group_ingress").count(),
            8
        );
        assert_eq!(stack.resources_of_type("ec2_security_group_egress").count(), 0);
        let rule = stack.resource("TestSecurityGroup1Ingress3").unwrap();
        assert_eq!(rule.attribute("cidr_ip"), Some(&Value::string("172.20.0.0/16")));
    }

    #[test]
    fn test_instances_share_the_ssm_role() {
        let stack = build(Stage::Dev, &OnPremRoute::Pending);
        for id in ["TestInstance1", "TestInstance2"] {
            let instance = stack.resource(id).unwrap();
            assert_eq!(
                instance.attribute("iam_instance_profile"),
                Some(&Value::reference("EC2SSMRoleInstanceProfile"))
            );
            assert_eq!(instance.attribute("instance_type"), Some(&Value::string("t3.micro")));
        }
        let role = stack.resource("EC2SSMRole").unwrap();
        assert_eq!(
            role.attribute("role_name"),
            Some(&Value::string("vyos-sample-dev-EC2SSMRole"))
        );
        assert_eq!(stack.outputs().len(), 6);
    }
}
