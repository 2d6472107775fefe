//! Construct helpers
//!
//! Higher-level building blocks that declare several related resources at
//! once (a VPC with its subnets and route tables, a security group and its
//! rules, an instance with its role) on a [`Stack`].

pub mod endpoint;
pub mod instance;
pub mod security_group;
pub mod vpc;

pub use endpoint::{InterfaceEndpointProps, InterfaceService};
pub use instance::{Instance, InstanceProps, InstanceRole, KeyFormat, KeyPair, KeyType, UserData};
pub use security_group::{Peer, Port, SecurityGroup};
pub use vpc::{Subnet, SubnetGroup, SubnetKind, SubnetSelection, Vpc, VpcProps};

use vyos_sample_core::network::CidrError;
use vyos_sample_core::stack::{Stack, StackError};

/// Construct error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Cidr(#[from] CidrError),

    #[error("Invalid availability zone '{0}'")]
    InvalidAvailabilityZone(String),

    #[error("VPC '{vpc}' has no subnets matching {selection}")]
    NoSubnets { vpc: String, selection: String },

    #[error("VPC '{vpc}' declares subnet group '{group}' twice")]
    DuplicateSubnetGroup { vpc: String, group: String },
}

/// Value of the `Name` tag of a construct: its path inside the stack
pub fn construct_path(stack: &Stack, id: &str) -> String {
    format!("{}/{}", stack.name(), id)
}
