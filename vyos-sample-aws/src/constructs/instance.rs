//! EC2 instances, their IAM roles and key pairs

use log::debug;
use vyos_sample_core::instance_type::InstanceType;
use vyos_sample_core::resource::{Resource, Value};
use vyos_sample_core::stack::{ResourceHandle, Stack};

use super::security_group::SecurityGroup;
use super::vpc::Subnet;
use super::{ConstructError, construct_path};

/// Parameter Store prefix under which EC2 keeps the private key of a created key pair
pub const KEY_PAIR_PARAMETER_PREFIX: &str = "/ec2/keypair/";

/// IAM role assumable by EC2, together with its instance profile
#[derive(Debug, Clone)]
pub struct InstanceRole {
    role: ResourceHandle,
    profile: ResourceHandle,
}

impl InstanceRole {
    /// `managed_policies` are AWS managed policy names (e.g. "AmazonSSMManagedInstanceCore")
    pub fn new(
        stack: &mut Stack,
        id: &str,
        role_name: &str,
        managed_policies: &[&str],
    ) -> Result<Self, ConstructError> {
        let assume_role = Value::map([
            (
                "Statement",
                Value::List(vec![Value::map([
                    ("Action", Value::string("sts:AssumeRole")),
                    ("Effect", Value::string("Allow")),
                    (
                        "Principal",
                        Value::map([("Service", Value::string("ec2.amazonaws.com"))]),
                    ),
                ])]),
            ),
            ("Version", Value::string("2012-10-17")),
        ]);
        let policy_arns = managed_policies
            .iter()
            .map(|name| Value::string(format!("arn:aws:iam::aws:policy/{}", name)))
            .collect();

        let role = stack.add(
            Resource::new("iam_role", id)
                .with_attribute("assume_role_policy_document", assume_role)
                .with_attribute("managed_policy_arns", Value::List(policy_arns))
                .with_attribute("role_name", Value::string(role_name)),
        )?;
        let profile = stack.add(
            Resource::new("iam_instance_profile", format!("{}InstanceProfile", id))
                .with_attribute("roles", Value::List(vec![role.reference()])),
        )?;

        Ok(Self { role, profile })
    }

    pub fn role_logical_id(&self) -> &str {
        self.role.logical_id()
    }

    pub fn instance_profile(&self) -> Value {
        self.profile.reference()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
}

impl KeyType {
    fn as_str(&self) -> &'static str {
        match self {
            KeyType::Rsa => "rsa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Pem,
}

impl KeyFormat {
    fn as_str(&self) -> &'static str {
        match self {
            KeyFormat::Pem => "pem",
        }
    }
}

/// EC2 key pair created by the engine; its private key goes to Parameter Store
#[derive(Debug, Clone)]
pub struct KeyPair {
    key_pair: ResourceHandle,
}

impl KeyPair {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        key_name: &str,
        key_type: KeyType,
        format: KeyFormat,
    ) -> Result<Self, ConstructError> {
        let key_pair = stack.add(
            Resource::new("ec2_key_pair", id)
                .with_attribute("key_name", Value::string(key_name))
                .with_attribute("key_type", Value::string(key_type.as_str()))
                .with_attribute("key_format", Value::string(format.as_str())),
        )?;
        Ok(Self { key_pair })
    }

    /// The key name (`Ref` of a key pair)
    pub fn key_name(&self) -> Value {
        self.key_pair.reference()
    }

    pub fn key_pair_id(&self) -> Value {
        self.key_pair.attr("KeyPairId")
    }

    /// Parameter Store name holding the private key
    pub fn private_key_parameter(&self) -> Value {
        Value::join(
            "",
            vec![Value::string(KEY_PAIR_PARAMETER_PREFIX), self.key_pair_id()],
        )
    }
}

/// Instance user data script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    lines: Vec<String>,
}

impl UserData {
    pub fn for_linux() -> Self {
        Self {
            lines: vec!["#!/bin/bash".to_string()],
        }
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct InstanceProps<'a> {
    pub subnet: &'a Subnet,
    pub instance_type: InstanceType,
    pub image_id: &'a str,
    pub security_group: &'a SecurityGroup,
    pub user_data: UserData,
    pub role: Option<&'a InstanceRole>,
    pub key_pair: Option<&'a KeyPair>,
    pub source_dest_check: bool,
}

impl<'a> InstanceProps<'a> {
    pub fn new(
        subnet: &'a Subnet,
        instance_type: InstanceType,
        image_id: &'a str,
        security_group: &'a SecurityGroup,
    ) -> Self {
        Self {
            subnet,
            instance_type,
            image_id,
            security_group,
            user_data: UserData::for_linux(),
            role: None,
            key_pair: None,
            source_dest_check: true,
        }
    }

    pub fn with_role(mut self, role: &'a InstanceRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_key_pair(mut self, key_pair: &'a KeyPair) -> Self {
        self.key_pair = Some(key_pair);
        self
    }

    /// Routers forward traffic that is neither from nor to themselves
    pub fn without_source_dest_check(mut self) -> Self {
        self.source_dest_check = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    instance: ResourceHandle,
}

impl Instance {
    pub fn new(stack: &mut Stack, id: &str, props: InstanceProps<'_>) -> Result<Self, ConstructError> {
        let path = construct_path(stack, id);
        let mut resource = Resource::new("ec2_instance", id)
            .with_attribute("image_id", Value::string(props.image_id))
            .with_attribute(
                "instance_type",
                Value::string(props.instance_type.to_string()),
            )
            .with_attribute("subnet_id", props.subnet.subnet_id())
            .with_attribute(
                "availability_zone",
                Value::string(&props.subnet.availability_zone),
            )
            .with_attribute(
                "security_group_ids",
                Value::List(vec![props.security_group.group_id()]),
            )
            .with_attribute(
                "user_data",
                Value::base64(Value::string(props.user_data.render())),
            )
            .with_name_tag(path);

        if let Some(role) = props.role {
            // the profile must not be used before the role's policies are attached
            resource = resource
                .with_attribute("iam_instance_profile", role.instance_profile())
                .with_dependency(role.role_logical_id());
        }
        if let Some(key_pair) = props.key_pair {
            resource = resource.with_attribute("key_name", key_pair.key_name());
        }
        if !props.source_dest_check {
            resource = resource.with_attribute("source_dest_check", Value::Bool(false));
        }

        debug!(
            "{}: {} in {} ({})",
            id, props.instance_type, props.subnet.group, props.subnet.cidr
        );
        let instance = stack.add(resource)?;
        Ok(Self { instance })
    }

    pub fn logical_id(&self) -> &str {
        self.instance.logical_id()
    }

    pub fn instance_id(&self) -> Value {
        self.instance.reference()
    }

    pub fn private_ip(&self) -> Value {
        self.instance.attr("PrivateIp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AwsProvider;
    use crate::constructs::vpc::{SubnetGroup, SubnetSelection, Vpc, VpcProps};
    use vyos_sample_core::stack::Environment;

    fn setup() -> (Stack, Vpc, SecurityGroup) {
        let mut stack = Stack::new("Test", Environment::new("123456789012", "ap-northeast-3"));
        let props = VpcProps::new("192.168.0.0/16".parse().unwrap(), "ap-northeast-3a")
            .with_subnet_group(SubnetGroup::public("Public"));
        let vpc = Vpc::new(&mut stack, "Vpc", props).unwrap();
        let sg = SecurityGroup::new(&mut stack, "Sg", &vpc, "router", true).unwrap();
        (stack, vpc, sg)
    }

    #[test]
    fn router_instance_with_key_pair() {
        let (mut stack, vpc, sg) = setup();
        let key = KeyPair::new(&mut stack, "Key", "sample-key", KeyType::Rsa, KeyFormat::Pem).unwrap();
        let subnet = vpc.subnet(&SubnetSelection::group("Public")).unwrap();
        let props = InstanceProps::new(
            subnet,
            "t3.medium".parse().unwrap(),
            "ami-05a998030d78b5358",
            &sg,
        )
        .with_key_pair(&key)
        .without_source_dest_check();
        let router = Instance::new(&mut stack, "Router", props).unwrap();

        let r = stack.resource(router.logical_id()).unwrap();
        assert_eq!(r.attribute("instance_type"), Some(&Value::string("t3.medium")));
        assert_eq!(r.attribute("source_dest_check"), Some(&Value::Bool(false)));
        assert_eq!(r.attribute("key_name"), Some(&Value::reference("Key")));
        assert_eq!(
            r.attribute("user_data"),
            Some(&Value::base64(Value::string("#!/bin/bash")))
        );
        assert_eq!(
            key.private_key_parameter(),
            Value::join(
                "",
                vec![Value::string("/ec2/keypair/"), Value::attr("Key", "KeyPairId")]
            )
        );
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn instance_with_role_depends_on_it() {
        let (mut stack, vpc, sg) = setup();
        let role = InstanceRole::new(
            &mut stack,
            "SSMRole",
            "sample-SSMRole",
            &["AmazonSSMManagedInstanceCore"],
        )
        .unwrap();
        let subnet = vpc.subnet(&SubnetSelection::group("Public")).unwrap();
        let props = InstanceProps::new(subnet, "t3.micro".parse().unwrap(), "ami-0facc8a2f7b924479", &sg)
            .with_role(&role);
        let server = Instance::new(&mut stack, "Server", props).unwrap();

        let r = stack.resource("Server").unwrap();
        assert_eq!(
            r.attribute("iam_instance_profile"),
            Some(&Value::reference("SSMRoleInstanceProfile"))
        );
        assert_eq!(r.depends_on, vec!["SSMRole".to_string()]);
        assert!(r.attribute("source_dest_check").is_none());
        assert_eq!(server.private_ip(), Value::attr("Server", "PrivateIp"));

        let role = stack.resource("SSMRole").unwrap();
        assert_eq!(
            role.attribute("managed_policy_arns"),
            Some(&Value::List(vec![Value::string(
                "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore"
            )]))
        );
        assert!(stack.validate(&AwsProvider).is_ok());
    }
}
