//! VPC layout: one VPC, one availability zone, one `/N` subnet per group
//!
//! Subnets are carved sequentially from the start of the VPC block in
//! declaration order. Every subnet gets its own route table. Public subnets
//! map public IPs on launch and route `0.0.0.0/0` to an internet gateway,
//! which is only created when at least one group is public.

use std::fmt;

use ipnet::Ipv4Net;
use log::debug;
use vyos_sample_core::network::carve_subnets;
use vyos_sample_core::resource::{Resource, Value};
use vyos_sample_core::stack::{ResourceHandle, Stack};

use super::{ConstructError, construct_path};
use crate::utils::{is_valid_availability_zone, logical_id_fragment};

pub const DEFAULT_SUBNET_PREFIX: u8 = 24;
const ANY_IPV4: &str = "0.0.0.0/0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetKind {
    /// Routed to an internet gateway
    Public,
    /// No route outside the VPC
    Isolated,
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetKind::Public => write!(f, "Public"),
            SubnetKind::Isolated => write!(f, "Isolated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetGroup {
    pub name: String,
    pub kind: SubnetKind,
}

impl SubnetGroup {
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SubnetKind::Public,
        }
    }

    pub fn isolated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SubnetKind::Isolated,
        }
    }
}

/// Which subnets of a VPC to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubnetSelection {
    Group(String),
    Kind(SubnetKind),
}

impl SubnetSelection {
    pub fn group(name: impl Into<String>) -> Self {
        SubnetSelection::Group(name.into())
    }
}

impl fmt::Display for SubnetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetSelection::Group(name) => write!(f, "group '{}'", name),
            SubnetSelection::Kind(kind) => write!(f, "kind {}", kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VpcProps {
    pub cidr: Ipv4Net,
    pub availability_zone: String,
    pub subnet_groups: Vec<SubnetGroup>,
    pub subnet_prefix: u8,
    pub enable_dns: bool,
}

impl VpcProps {
    pub fn new(cidr: Ipv4Net, availability_zone: impl Into<String>) -> Self {
        Self {
            cidr,
            availability_zone: availability_zone.into(),
            subnet_groups: Vec::new(),
            subnet_prefix: DEFAULT_SUBNET_PREFIX,
            enable_dns: true,
        }
    }

    pub fn with_subnet_group(mut self, group: SubnetGroup) -> Self {
        self.subnet_groups.push(group);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Subnet {
    pub group: String,
    pub kind: SubnetKind,
    pub cidr: Ipv4Net,
    pub availability_zone: String,
    subnet: ResourceHandle,
    route_table: ResourceHandle,
}

impl Subnet {
    pub fn logical_id(&self) -> &str {
        self.subnet.logical_id()
    }

    pub fn subnet_id(&self) -> Value {
        self.subnet.reference()
    }

    pub fn route_table_logical_id(&self) -> &str {
        self.route_table.logical_id()
    }

    pub fn route_table_id(&self) -> Value {
        self.route_table.reference()
    }

    fn matches(&self, selection: &SubnetSelection) -> bool {
        match selection {
            SubnetSelection::Group(name) => &self.group == name,
            SubnetSelection::Kind(kind) => self.kind == *kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vpc {
    id: String,
    vpc: ResourceHandle,
    cidr: Ipv4Net,
    subnets: Vec<Subnet>,
    internet_gateway: Option<ResourceHandle>,
}

impl Vpc {
    /// Declare the VPC, its subnets, route tables and (if needed) internet gateway
    pub fn new(stack: &mut Stack, id: &str, props: VpcProps) -> Result<Self, ConstructError> {
        if !is_valid_availability_zone(&props.availability_zone) {
            return Err(ConstructError::InvalidAvailabilityZone(
                props.availability_zone,
            ));
        }
        for (i, group) in props.subnet_groups.iter().enumerate() {
            if props.subnet_groups[..i].iter().any(|g| g.name == group.name) {
                return Err(ConstructError::DuplicateSubnetGroup {
                    vpc: id.to_string(),
                    group: group.name.clone(),
                });
            }
        }

        let cidrs = carve_subnets(props.cidr, props.subnet_prefix, props.subnet_groups.len())?;
        let vpc_path = construct_path(stack, id);

        let vpc = stack.add(
            Resource::new("ec2_vpc", id)
                .with_attribute("cidr_block", Value::string(props.cidr.to_string()))
                .with_attribute("enable_dns_hostnames", Value::Bool(props.enable_dns))
                .with_attribute("enable_dns_support", Value::Bool(props.enable_dns))
                .with_attribute("instance_tenancy", Value::string("default"))
                .with_name_tag(&vpc_path),
        )?;

        let needs_igw = props
            .subnet_groups
            .iter()
            .any(|g| g.kind == SubnetKind::Public);
        let (internet_gateway, gateway_attachment) = if needs_igw {
            let igw_id = format!("{}IGW", id);
            let igw = stack.add(
                Resource::new("ec2_internet_gateway", &igw_id).with_name_tag(&vpc_path),
            )?;
            let attachment = stack.add(
                Resource::new("ec2_vpc_gateway_attachment", format!("{}VPCGW", id))
                    .with_attribute("vpc_id", vpc.reference())
                    .with_attribute("internet_gateway_id", igw.reference()),
            )?;
            (Some(igw), Some(attachment))
        } else {
            (None, None)
        };

        let mut subnets = Vec::with_capacity(cidrs.len());
        for (group, cidr) in props.subnet_groups.iter().zip(cidrs) {
            let prefix = format!("{}{}Subnet1", id, logical_id_fragment(&group.name));
            let path = construct_path(stack, &prefix);

            let subnet = stack.add(
                Resource::new("ec2_subnet", format!("{}Subnet", prefix))
                    .with_attribute("vpc_id", vpc.reference())
                    .with_attribute("cidr_block", Value::string(cidr.to_string()))
                    .with_attribute(
                        "availability_zone",
                        Value::string(&props.availability_zone),
                    )
                    .with_attribute(
                        "map_public_ip_on_launch",
                        Value::Bool(group.kind == SubnetKind::Public),
                    )
                    .with_name_tag(&path)
                    .with_tag("SubnetGroup", &group.name)
                    .with_tag("SubnetType", group.kind.to_string()),
            )?;
            let route_table = stack.add(
                Resource::new("ec2_route_table", format!("{}RouteTable", prefix))
                    .with_attribute("vpc_id", vpc.reference())
                    .with_name_tag(&path),
            )?;
            stack.add(
                Resource::new(
                    "ec2_subnet_route_table_association",
                    format!("{}RouteTableAssociation", prefix),
                )
                .with_attribute("route_table_id", route_table.reference())
                .with_attribute("subnet_id", subnet.reference()),
            )?;

            if let (SubnetKind::Public, Some(igw), Some(attachment)) =
                (group.kind, &internet_gateway, &gateway_attachment)
            {
                stack.add(
                    Resource::new("ec2_route", format!("{}DefaultRoute", prefix))
                        .with_attribute("route_table_id", route_table.reference())
                        .with_attribute("destination_cidr_block", Value::string(ANY_IPV4))
                        .with_attribute("gateway_id", igw.reference())
                        .with_dependency(attachment.logical_id()),
                )?;
            }

            debug!("{}: subnet {} ({}) = {}", id, group.name, group.kind, cidr);
            subnets.push(Subnet {
                group: group.name.clone(),
                kind: group.kind,
                cidr,
                availability_zone: props.availability_zone.clone(),
                subnet,
                route_table,
            });
        }

        Ok(Self {
            id: id.to_string(),
            vpc,
            cidr: props.cidr,
            subnets,
            internet_gateway,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.id
    }

    pub fn vpc_id(&self) -> Value {
        self.vpc.reference()
    }

    pub fn cidr(&self) -> Ipv4Net {
        self.cidr
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    pub fn has_internet_gateway(&self) -> bool {
        self.internet_gateway.is_some()
    }

    /// Subnets matching a selection; an empty selection is an error
    pub fn select_subnets(&self, selection: &SubnetSelection) -> Result<Vec<&Subnet>, ConstructError> {
        let selected: Vec<&Subnet> = self.subnets.iter().filter(|s| s.matches(selection)).collect();
        if selected.is_empty() {
            return Err(ConstructError::NoSubnets {
                vpc: self.id.clone(),
                selection: selection.to_string(),
            });
        }
        Ok(selected)
    }

    /// The first subnet matching a selection (this layout has one per group)
    pub fn subnet(&self, selection: &SubnetSelection) -> Result<&Subnet, ConstructError> {
        self.select_subnets(selection).map(|s| s[0])
    }

    /// Route `destination` from the route tables of the selected subnets to a Transit Gateway.
    /// `attachment` is the logical ID of the attachment the routes must wait for.
    pub fn add_transit_gateway_routes(
        &self,
        stack: &mut Stack,
        id: &str,
        selection: &SubnetSelection,
        destination: Ipv4Net,
        transit_gateway_id: Value,
        attachment: &str,
    ) -> Result<Vec<ResourceHandle>, ConstructError> {
        let mut routes = Vec::new();
        for subnet in self.select_subnets(selection)? {
            let logical_id = format!("{}{}", subnet.route_table_logical_id(), id);
            routes.push(stack.add(
                Resource::new("ec2_route", logical_id)
                    .with_attribute("route_table_id", subnet.route_table_id())
                    .with_attribute("destination_cidr_block", Value::string(destination.to_string()))
                    .with_attribute("transit_gateway_id", transit_gateway_id.clone())
                    .with_dependency(attachment),
            )?);
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AwsProvider;
    use vyos_sample_core::stack::Environment;

    fn stack() -> Stack {
        Stack::new("Test-Stack", Environment::new("123456789012", "ap-northeast-1"))
    }

    fn isolated_props() -> VpcProps {
        VpcProps::new("172.16.0.0/16".parse().unwrap(), "ap-northeast-1c")
            .with_subnet_group(SubnetGroup::isolated("EC2"))
            .with_subnet_group(SubnetGroup::isolated("TGW-Attachment"))
    }

    #[test]
    fn isolated_vpc_carves_sequential_subnets() {
        let mut stack = stack();
        let vpc = Vpc::new(&mut stack, "VPC1", isolated_props()).unwrap();

        let cidrs: Vec<String> = vpc.subnets().iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(cidrs, vec!["172.16.0.0/24", "172.16.1.0/24"]);
        assert!(!vpc.has_internet_gateway());
        assert_eq!(stack.resources_of_type("ec2_internet_gateway").count(), 0);
        assert_eq!(stack.resources_of_type("ec2_route_table").count(), 2);
        assert_eq!(
            stack
                .resources_of_type("ec2_subnet_route_table_association")
                .count(),
            2
        );
        assert_eq!(
            vpc.subnet(&SubnetSelection::group("TGW-Attachment"))
                .unwrap()
                .logical_id(),
            "VPC1TGWAttachmentSubnet1Subnet"
        );
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn public_group_gets_internet_gateway_and_default_route() {
        let mut stack = stack();
        let props = VpcProps::new("192.168.0.0/16".parse().unwrap(), "ap-northeast-3a")
            .with_subnet_group(SubnetGroup::public("Public"))
            .with_subnet_group(SubnetGroup::isolated("Private"));
        let vpc = Vpc::new(&mut stack, "OnPremVPC", props).unwrap();

        assert!(vpc.has_internet_gateway());
        let route = stack.resource("OnPremVPCPublicSubnet1DefaultRoute").unwrap();
        assert_eq!(route.attribute("gateway_id"), Some(&Value::reference("OnPremVPCIGW")));
        assert_eq!(route.depends_on, vec!["OnPremVPCVPCGW".to_string()]);

        let public = vpc.subnet(&SubnetSelection::Kind(SubnetKind::Public)).unwrap();
        assert_eq!(public.cidr.to_string(), "192.168.0.0/24");
        let private = stack.resource("OnPremVPCPrivateSubnet1Subnet").unwrap();
        assert_eq!(
            private.attribute("map_public_ip_on_launch"),
            Some(&Value::Bool(false))
        );
        assert_eq!(stack.resources_of_type("ec2_route").count(), 1);
        assert!(stack.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn layout_errors_are_reported() {
        let mut s = stack();
        let props = VpcProps::new("10.0.0.0/24".parse().unwrap(), "ap-northeast-1c")
            .with_subnet_group(SubnetGroup::isolated("A"))
            .with_subnet_group(SubnetGroup::isolated("B"));
        assert!(matches!(
            Vpc::new(&mut s, "Small", props),
            Err(ConstructError::Cidr(_))
        ));

        let props = VpcProps::new("10.0.0.0/16".parse().unwrap(), "ap-northeast-1");
        assert!(matches!(
            Vpc::new(&mut s, "NoZone", props),
            Err(ConstructError::InvalidAvailabilityZone(_))
        ));

        let props = VpcProps::new("10.0.0.0/16".parse().unwrap(), "ap-northeast-1c")
            .with_subnet_group(SubnetGroup::isolated("A"))
            .with_subnet_group(SubnetGroup::public("A"));
        assert!(matches!(
            Vpc::new(&mut s, "Twice", props),
            Err(ConstructError::DuplicateSubnetGroup { .. })
        ));

        let vpc = Vpc::new(&mut s, "VPC1", isolated_props()).unwrap();
        assert!(matches!(
            vpc.subnet(&SubnetSelection::Kind(SubnetKind::Public)),
            Err(ConstructError::NoSubnets { .. })
        ));
    }

    #[test]
    fn transit_gateway_routes_wait_for_attachment() {
        let mut stack = stack();
        let vpc = Vpc::new(&mut stack, "VPC1", isolated_props()).unwrap();
        let routes = vpc
            .add_transit_gateway_routes(
                &mut stack,
                "ToVPC2",
                &SubnetSelection::group("EC2"),
                "172.17.0.0/16".parse().unwrap(),
                Value::reference("TransitGateway"),
                "TGWAttachment1",
            )
            .unwrap();

        assert_eq!(routes.len(), 1);
        let route = stack.resource(routes[0].logical_id()).unwrap();
        assert_eq!(route.logical_id(), "VPC1EC2Subnet1RouteTableToVPC2");
        assert_eq!(route.depends_on, vec!["TGWAttachment1".to_string()]);
    }
}
