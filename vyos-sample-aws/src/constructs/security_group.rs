//! Security groups and their rules
//!
//! Outbound rules live inline on the group: either "all traffic to
//! 0.0.0.0/0" or, when all outbound traffic is disallowed, a placeholder rule
//! that matches nothing. Rules added afterwards are separate
//! `SecurityGroupIngress`/`SecurityGroupEgress` resources.

use ipnet::Ipv4Net;
use log::debug;
use vyos_sample_core::resource::{Resource, Value};
use vyos_sample_core::stack::{ResourceHandle, Stack};

use super::vpc::Vpc;
use super::{ConstructError, construct_path};

const GROUP_ID: &str = "GroupId";

/// Source or destination of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    Ipv4(Ipv4Net),
    /// Another security group, by logical ID
    SecurityGroup(String),
}

impl Peer {
    pub fn ipv4(cidr: Ipv4Net) -> Self {
        Peer::Ipv4(cidr)
    }

    pub fn security_group(group: &SecurityGroup) -> Self {
        Peer::SecurityGroup(group.logical_id().to_string())
    }
}

/// Protocol and port range of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Tcp(u16),
    AllIcmp,
}

impl Port {
    pub fn protocol(&self) -> &'static str {
        match self {
            Port::Tcp(_) => "tcp",
            Port::AllIcmp => "icmp",
        }
    }

    /// (from_port, to_port); ICMP uses -1 for "every type and code"
    pub fn range(&self) -> Option<(i64, i64)> {
        match self {
            Port::Tcp(port) => Some((i64::from(*port), i64::from(*port))),
            Port::AllIcmp => Some((-1, -1)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroup {
    group: ResourceHandle,
    allow_all_outbound: bool,
    ingress_rules: usize,
    egress_rules: usize,
}

impl SecurityGroup {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &Vpc,
        description: &str,
        allow_all_outbound: bool,
    ) -> Result<Self, ConstructError> {
        let egress = if allow_all_outbound {
            Value::map([
                ("CidrIp", Value::string("0.0.0.0/0")),
                ("Description", Value::string("Allow all outbound traffic by default")),
                ("IpProtocol", Value::string("-1")),
            ])
        } else {
            // 255.255.255.255/32 with ICMP type 252 code 86 matches no real traffic
            Value::map([
                ("CidrIp", Value::string("255.255.255.255/32")),
                ("Description", Value::string("Disallow all traffic")),
                ("FromPort", Value::Int(252)),
                ("IpProtocol", Value::string("icmp")),
                ("ToPort", Value::Int(86)),
            ])
        };

        let path = construct_path(stack, id);
        let group = stack.add(
            Resource::new("ec2_security_group", id)
                .with_attribute("group_description", Value::string(description))
                .with_attribute("vpc_id", vpc.vpc_id())
                .with_attribute("security_group_egress", Value::List(vec![egress]))
                .with_name_tag(path),
        )?;

        Ok(Self {
            group,
            allow_all_outbound,
            ingress_rules: 0,
            egress_rules: 0,
        })
    }

    pub fn logical_id(&self) -> &str {
        self.group.logical_id()
    }

    pub fn group_id(&self) -> Value {
        self.group.attr(GROUP_ID)
    }

    pub fn allows_all_outbound(&self) -> bool {
        self.allow_all_outbound
    }

    pub fn add_ingress_rule(
        &mut self,
        stack: &mut Stack,
        peer: Peer,
        port: Port,
        description: &str,
    ) -> Result<ResourceHandle, ConstructError> {
        self.ingress_rules += 1;
        let id = format!("{}Ingress{}", self.logical_id(), self.ingress_rules);
        let rule = self.rule("ec2_security_group_ingress", &id, port, description);
        let rule = match peer {
            Peer::Ipv4(cidr) => rule.with_attribute("cidr_ip", Value::string(cidr.to_string())),
            Peer::SecurityGroup(group) => {
                rule.with_attribute("source_security_group_id", Value::attr(group, GROUP_ID))
            }
        };
        Ok(stack.add(rule)?)
    }

    /// Returns `None` when the group already allows all outbound traffic
    pub fn add_egress_rule(
        &mut self,
        stack: &mut Stack,
        peer: Peer,
        port: Port,
        description: &str,
    ) -> Result<Option<ResourceHandle>, ConstructError> {
        if self.allow_all_outbound {
            debug!(
                "{}: egress rule '{}' skipped, all outbound traffic is already allowed",
                self.logical_id(),
                description
            );
            return Ok(None);
        }

        self.egress_rules += 1;
        let id = format!("{}Egress{}", self.logical_id(), self.egress_rules);
        let rule = self.rule("ec2_security_group_egress", &id, port, description);
        let rule = match peer {
            Peer::Ipv4(cidr) => rule.with_attribute("cidr_ip", Value::string(cidr.to_string())),
            Peer::SecurityGroup(group) => rule
                .with_attribute("destination_security_group_id", Value::attr(group, GROUP_ID)),
        };
        Ok(Some(stack.add(rule)?))
    }

    fn rule(&self, resource_type: &str, id: &str, port: Port, description: &str) -> Resource {
        let mut rule = Resource::new(resource_type, id)
            .with_attribute("group_id", self.group_id())
            .with_attribute("ip_protocol", Value::string(port.protocol()))
            .with_attribute("description", Value::string(description));
        if let Some((from, to)) = port.range() {
            rule = rule
                .with_attribute("from_port", Value::Int(from))
                .with_attribute("to_port", Value::Int(to));
        }
        rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AwsProvider;
    use crate::constructs::vpc::{SubnetGroup, VpcProps};
    use vyos_sample_core::stack::Environment;

    fn setup() -> (Stack, Vpc) {
        let mut stack = Stack::new("Test", Environment::new("123456789012", "ap-northeast-1"));
        let props = VpcProps::new("10.0.0.0/16".parse().unwrap(), "ap-northeast-1c")
            .with_subnet_group(SubnetGroup::isolated("EC2"));
        let vpc = Vpc::new(&mut stack, "VPC1", props).unwrap();
        (stack, vpc)
    }

    fn egress_of(stack: &Stack, id: &str) -> Value {
        match stack.resource(id).and_then(|r| r.attribute("security_group_egress")) {
            Some(Value::List(rules)) => rules[0].clone(),
            other => panic!("no inline egress: {:?}", other),
        }
    }

    #[test]
    fn inline_egress_reflects_allow_all_outbound() {
        let (mut stack, vpc) = setup();
        SecurityGroup::new(&mut stack, "Open", &vpc, "open", true).unwrap();
        SecurityGroup::new(&mut stack, "Closed", &vpc, "closed", false).unwrap();

        match egress_of(&stack, "Open") {
            Value::Map(rule) => {
                assert_eq!(rule["CidrIp"], Value::string("0.0.0.0/0"));
                assert_eq!(rule["IpProtocol"], Value::string("-1"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match egress_of(&stack, "Closed") {
            Value::Map(rule) => {
                assert_eq!(rule["CidrIp"], Value::string("255.255.255.255/32"));
                assert_eq!(rule["FromPort"], Value::Int(252));
                assert_eq!(rule["ToPort"], Value::Int(86));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn ingress_rules_are_separate_resources() {
        let (mut stack, vpc) = setup();
        let mut endpoint = SecurityGroup::new(&mut stack, "EndpointSG", &vpc, "endpoints", false).unwrap();
        let mut test = SecurityGroup::new(&mut stack, "TestSG", &vpc, "tests", true).unwrap();

        endpoint
            .add_ingress_rule(&mut stack, Peer::security_group(&test), Port::Tcp(443), "https")
            .unwrap();
        let icmp = test
            .add_ingress_rule(
                &mut stack,
                Peer::ipv4("172.20.0.0/16".parse().unwrap()),
                Port::AllIcmp,
                "ping",
            )
            .unwrap();

        let https = stack.resource("EndpointSGIngress1").unwrap();
        assert_eq!(https.attribute("group_id"), Some(&Value::attr("EndpointSG", "GroupId")));
        assert_eq!(
            https.attribute("source_security_group_id"),
            Some(&Value::attr("TestSG", "GroupId"))
        );
        assert_eq!(https.attribute("from_port"), Some(&Value::Int(443)));

        let icmp = stack.resource(icmp.logical_id()).unwrap();
        assert_eq!(icmp.attribute("cidr_ip"), Some(&Value::string("172.20.0.0/16")));
        assert_eq!(icmp.attribute("from_port"), Some(&Value::Int(-1)));
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn egress_rule_is_skipped_when_all_outbound_is_allowed() {
        let (mut stack, vpc) = setup();
        let endpoint = SecurityGroup::new(&mut stack, "EndpointSG", &vpc, "endpoints", false).unwrap();
        let mut open = SecurityGroup::new(&mut stack, "Open", &vpc, "open", true).unwrap();
        let mut closed = SecurityGroup::new(&mut stack, "Closed", &vpc, "closed", false).unwrap();

        let skipped = open
            .add_egress_rule(&mut stack, Peer::security_group(&endpoint), Port::Tcp(443), "https")
            .unwrap();
        assert!(skipped.is_none());

        let added = closed
            .add_egress_rule(&mut stack, Peer::security_group(&endpoint), Port::Tcp(443), "https")
            .unwrap()
            .unwrap();
        assert_eq!(added.logical_id(), "ClosedEgress1");
        assert_eq!(stack.resources_of_type("ec2_security_group_egress").count(), 1);
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn port_ranges() {
        assert_eq!(Port::Tcp(443).range(), Some((443, 443)));
        assert_eq!(Port::AllIcmp.range(), Some((-1, -1)));
    }
}
