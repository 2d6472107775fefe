//! Osaka side: a simulated on-premises network behind a VyOS customer gateway

use vyos_sample_aws::constructs::{
    Instance, InstanceProps, InstanceRole, InterfaceEndpointProps, InterfaceService, KeyFormat,
    KeyPair, KeyType, Peer, Port, SecurityGroup, SubnetGroup, SubnetKind, SubnetSelection, Vpc,
    VpcProps,
};
use vyos_sample_aws::utils::availability_zone;
use vyos_sample_core::resource::{Resource, Value};
use vyos_sample_core::stack::{Environment, Stack};

use super::{BuildError, SSM_MANAGED_POLICY, vyos_for_cgw_stack_name};
use crate::config::{Stage, ValidatedConfig};

const ZONE: char = 'a';

/// Build the `<Prefix>-VyosForCgwStack` stack
pub fn vyos_for_cgw_stack(stage: Stage, config: &ValidatedConfig) -> Result<Stack, BuildError> {
    let project = &config.project_name;
    let mut stack = Stack::new(
        vyos_for_cgw_stack_name(stage),
        Environment::new(&config.account, &config.osaka_region),
    )
    .with_description(format!(
        "VyOS customer gateway and on-premises test network ({})",
        stage
    ));

    let key_pair = KeyPair::new(
        &mut stack,
        "VyOSKeyPair",
        &format!("{}-vyos-key-pair", project),
        KeyType::Rsa,
        KeyFormat::Pem,
    )?;
    let role = InstanceRole::new(
        &mut stack,
        "OnPremSSMRole",
        &format!("{}-OnPremSSMRole", project),
        &[SSM_MANAGED_POLICY],
    )?;

    let props = VpcProps::new(
        config.osaka_vpc_cidr,
        availability_zone(&config.osaka_region, ZONE),
    )
    .with_subnet_group(SubnetGroup::public("Public"))
    .with_subnet_group(SubnetGroup::isolated("Private"));
    let vpc = Vpc::new(&mut stack, "OnPremVPC", props)?;
    let public = SubnetSelection::Kind(SubnetKind::Public);
    let private = SubnetSelection::Kind(SubnetKind::Isolated);

    let mut vyos_sg = SecurityGroup::new(
        &mut stack,
        "VyOSSecurityGroup",
        &vpc,
        "Security group for VyOS router",
        true,
    )?;
    vyos_sg.add_ingress_rule(
        &mut stack,
        Peer::ipv4(config.osaka_vpc_cidr),
        Port::AllIcmp,
        "Allow ICMP from Osaka VPC",
    )?;

    // forwards VPN traffic, so the source/destination check must be off
    let router = Instance::new(
        &mut stack,
        "VyOSRouter",
        InstanceProps::new(
            vpc.subnet(&public)?,
            config.vyos_instance_type,
            &config.vyos_ami_id,
            &vyos_sg,
        )
        .with_key_pair(&key_pair)
        .without_source_dest_check(),
    )?;

    let eip = stack.add(
        Resource::new("ec2_eip", "VyOSEIP")
            .with_attribute("domain", Value::string("vpc"))
            .with_name_tag(format!("{}-vyos-router-eip", project)),
    )?;
    stack.add(
        Resource::new("ec2_eip_association", "VyOSEIPAssociation")
            .with_attribute("allocation_id", eip.attr("AllocationId"))
            .with_attribute("instance_id", router.instance_id()),
    )?;

    let mut endpoint_sg = SecurityGroup::new(
        &mut stack,
        "VPCEndpointSG",
        &vpc,
        "Security group for VPC endpoints",
        false,
    )?;
    endpoint_sg.add_ingress_rule(
        &mut stack,
        Peer::ipv4(config.osaka_vpc_cidr),
        Port::Tcp(443),
        "Allow HTTPS from VPC",
    )?;
    for (id, service) in [
        ("SSMVPCEndpoint", InterfaceService::Ssm),
        ("SSMMessagesVPCEndpoint", InterfaceService::SsmMessages),
    ] {
        vpc.add_interface_endpoint(
            &mut stack,
            id,
            InterfaceEndpointProps {
                service,
                subnets: private.clone(),
                security_groups: vec![&endpoint_sg],
                private_dns_enabled: true,
            },
        )?;
    }

    let mut on_prem_sg = SecurityGroup::new(
        &mut stack,
        "OnPremSecurityGroup",
        &vpc,
        "Security group for on-premises test server",
        true,
    )?;
    for (cidr, description) in [
        (config.tokyo_vpc1_cidr, "Allow ICMP from Tokyo VPC1 via VPN"),
        (config.tokyo_vpc2_cidr, "Allow ICMP from Tokyo VPC2 via VPN"),
        (config.osaka_vpc_cidr, "Allow ICMP from on-premises network"),
    ] {
        on_prem_sg.add_ingress_rule(&mut stack, Peer::ipv4(cidr), Port::AllIcmp, description)?;
    }
    on_prem_sg.add_egress_rule(
        &mut stack,
        Peer::security_group(&endpoint_sg),
        Port::Tcp(443),
        "Allow HTTPS to VPC endpoints",
    )?;

    let server = Instance::new(
        &mut stack,
        "OnPremServer",
        InstanceProps::new(
            vpc.subnet(&private)?,
            config.on_prem_test_instance_type,
            &config.on_prem_test_ami_id,
            &on_prem_sg,
        )
        .with_role(&role),
    )?;

    stack.add_output("VyOSRouterEIP", eip.reference(), "VyOS Router Elastic IP")?;
    stack.add_output(
        "VyOSRouterId",
        router.instance_id(),
        "VyOS Router Instance ID",
    )?;
    stack.add_output(
        "OnPremServerId",
        server.instance_id(),
        "On-premises Test Server Instance ID",
    )?;
    stack.add_output("OnPremVPCId", vpc.vpc_id(), "On-premises VPC ID")?;
    stack.add_output(
        "OnPremServerPrivateIP",
        server.private_ip(),
        "On-premises Server Private IP",
    )?;
    stack.add_output(
        "VyOSKeyPairId",
        key_pair.key_name(),
        "Key Pair Name for VyOS Router",
    )?;
    stack.add_output(
        "VyOSPrivateKeyParameter",
        key_pair.private_key_parameter(),
        "Systems Manager parameter name for VyOS private key",
    )?;

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vyos_sample_aws::AwsProvider;

    fn build(stage: Stage) -> Stack {
        let config = stage.config().validated().unwrap();
        vyos_for_cgw_stack(stage, &config).unwrap()
    }

    #[test]
    fn router_sits_in_the_public_subnet_without_source_dest_check() {
        let stack = build(Stage::Dev);
        let router = stack.resource("VyOSRouter").unwrap();
        assert_eq!(
            router.attribute("subnet_id"),
            Some(&Value::reference("OnPremVPCPublicSubnet1Subnet"))
        );
        assert_eq!(router.attribute("source_dest_check"), Some(&Value::Bool(false)));
        assert_eq!(router.attribute("instance_type"), Some(&Value::string("t3.medium")));
        assert_eq!(router.attribute("key_name"), Some(&Value::reference("VyOSKeyPair")));
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn elastic_ip_is_associated_with_the_router() {
        let stack = build(Stage::Prod);
        let association = stack.resource("VyOSEIPAssociation").unwrap();
        assert_eq!(
            association.attribute("allocation_id"),
            Some(&Value::attr("VyOSEIP", "AllocationId"))
        );
        assert_eq!(
            association.attribute("instance_id"),
            Some(&Value::reference("VyOSRouter"))
        );
    }

    #[test]
    fn server_and_endpoints_use_the_private_subnet() {
        let stack = build(Stage::Prod);
        let server = stack.resource("OnPremServer").unwrap();
        assert_eq!(
            server.attribute("subnet_id"),
            Some(&Value::reference("OnPremVPCPrivateSubnet1Subnet"))
        );
        assert_eq!(
            server.attribute("iam_instance_profile"),
            Some(&Value::reference("OnPremSSMRoleInstanceProfile"))
        );
        for id in ["SSMVPCEndpoint", "SSMMessagesVPCEndpoint"] {
            let endpoint = stack.resource(id).unwrap();
            assert_eq!(
                endpoint.attribute("subnet_ids"),
                Some(&Value::List(vec![Value::reference(
                    "OnPremVPCPrivateSubnet1Subnet"
                )]))
            );
        }
        let ssm = stack.resource("SSMVPCEndpoint").unwrap();
        assert_eq!(
            ssm.attribute("service_name"),
            Some(&Value::string("com.amazonaws.ap-northeast-3.ssm"))
        );
    }

    #[test]
    fn on_prem_group_allows_icmp_from_both_regions() {
        let stack = build(Stage::Prod);
        let cidrs: Vec<&str> = (1..=3)
            .map(|n| {
                stack
                    .resource(&format!("OnPremSecurityGroupIngress{}", n))
                    .and_then(|r| r.attribute("cidr_ip"))
                    .and_then(|v| v.as_str())
                    .unwrap()
            })
            .collect();
        assert_eq!(cidrs, vec!["10.0.0.0/16", "10.1.0.0/16", "192.168.0.0/16"]);
        assert_eq!(stack.resources_of_type("ec2_security_group_egress").count(), 0);
    }

    #[test]
    fn outputs_match_the_deployment_surface() {
        let stack = build(Stage::Dev);
        let names: Vec<&str> = stack.outputs().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "VyOSRouterEIP",
                "VyOSRouterId",
                "OnPremServerId",
                "OnPremVPCId",
                "OnPremServerPrivateIP",
                "VyOSKeyPairId",
                "VyOSPrivateKeyParameter",
            ]
        );
        assert_eq!(
            stack.output("OnPremServerPrivateIP").unwrap().value,
            Value::attr("OnPremServer", "PrivateIp")
        );
        let key = stack.resource("VyOSKeyPair").unwrap();
        assert_eq!(
            key.attribute("key_name"),
            Some(&Value::string("vyos-sample-dev-vyos-key-pair"))
        );
    }
}
