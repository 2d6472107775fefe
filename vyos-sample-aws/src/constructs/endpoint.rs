//! Interface VPC endpoints

use vyos_sample_core::resource::{Resource, Value};
use vyos_sample_core::stack::{ResourceHandle, Stack};

use super::ConstructError;
use super::security_group::SecurityGroup;
use super::vpc::{SubnetSelection, Vpc};
use crate::utils::endpoint_service_name;

/// AWS service reachable through an interface endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceService {
    Ssm,
    SsmMessages,
}

impl InterfaceService {
    pub fn short_name(&self) -> &'static str {
        match self {
            InterfaceService::Ssm => "ssm",
            InterfaceService::SsmMessages => "ssmmessages",
        }
    }
}

pub struct InterfaceEndpointProps<'a> {
    pub service: InterfaceService,
    pub subnets: SubnetSelection,
    pub security_groups: Vec<&'a SecurityGroup>,
    pub private_dns_enabled: bool,
}

impl Vpc {
    /// Declare an interface endpoint in the selected subnets.
    /// The service name is built from the stack's region.
    pub fn add_interface_endpoint(
        &self,
        stack: &mut Stack,
        id: &str,
        props: InterfaceEndpointProps<'_>,
    ) -> Result<ResourceHandle, ConstructError> {
        let subnet_ids = self
            .select_subnets(&props.subnets)?
            .into_iter()
            .map(|s| s.subnet_id())
            .collect();
        let security_group_ids = props
            .security_groups
            .iter()
            .map(|sg| sg.group_id())
            .collect();
        let service_name = endpoint_service_name(&stack.env().region, props.service.short_name());

        Ok(stack.add(
            Resource::new("ec2_vpc_endpoint", id)
                .with_attribute("service_name", Value::string(service_name))
                .with_attribute("vpc_id", self.vpc_id())
                .with_attribute("vpc_endpoint_type", Value::string("Interface"))
                .with_attribute("private_dns_enabled", Value::Bool(props.private_dns_enabled))
                .with_attribute("subnet_ids", Value::List(subnet_ids))
                .with_attribute("security_group_ids", Value::List(security_group_ids)),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AwsProvider;
    use crate::constructs::vpc::{SubnetGroup, VpcProps};
    use vyos_sample_core::stack::Environment;

    #[test]
    fn endpoint_uses_region_and_selected_subnets() {
        let mut stack = Stack::new("Test", Environment::new("123456789012", "ap-northeast-1"));
        let props = VpcProps::new("172.16.0.0/16".parse().unwrap(), "ap-northeast-1c")
            .with_subnet_group(SubnetGroup::isolated("EC2"))
            .with_subnet_group(SubnetGroup::isolated("TGW-Attachment"));
        let vpc = Vpc::new(&mut stack, "VPC1", props).unwrap();
        let sg = SecurityGroup::new(&mut stack, "EndpointSG", &vpc, "endpoints", false).unwrap();

        let endpoint = vpc
            .add_interface_endpoint(
                &mut stack,
                "SSMVPCEndpoint",
                InterfaceEndpointProps {
                    service: InterfaceService::Ssm,
                    subnets: SubnetSelection::group("EC2"),
                    security_groups: vec![&sg],
                    private_dns_enabled: true,
                },
            )
            .unwrap();

        let r = stack.resource(endpoint.logical_id()).unwrap();
        assert_eq!(
            r.attribute("service_name"),
            Some(&Value::string("com.amazonaws.ap-northeast-1.ssm"))
        );
        assert_eq!(
            r.attribute("subnet_ids"),
            Some(&Value::List(vec![Value::reference("VPC1EC2Subnet1Subnet")]))
        );
        assert_eq!(r.attribute("private_dns_enabled"), Some(&Value::Bool(true)));
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn endpoint_needs_matching_subnets() {
        let mut stack = Stack::new("Test", Environment::new("123456789012", "ap-northeast-1"));
        let props = VpcProps::new("172.16.0.0/16".parse().unwrap(), "ap-northeast-1c")
            .with_subnet_group(SubnetGroup::isolated("EC2"));
        let vpc = Vpc::new(&mut stack, "VPC1", props).unwrap();

        let result = vpc.add_interface_endpoint(
            &mut stack,
            "Endpoint",
            InterfaceEndpointProps {
                service: InterfaceService::SsmMessages,
                subnets: SubnetSelection::group("Private"),
                security_groups: vec![],
                private_dns_enabled: true,
            },
        );
        assert!(matches!(result, Err(ConstructError::NoSubnets { .. })));
    }
}
