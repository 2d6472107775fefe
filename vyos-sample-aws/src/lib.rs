//! VyOS Sample AWS Provider
//!
//! AWS resource catalogue for CloudFormation synthesis.
//!
//! ## Module Structure
//!
//! - `schemas` - Resource schemas with CloudFormation type and property names
//! - `constructs` - VPC, security group, instance and endpoint helpers
//! - `utils` - Helpers for AWS identifier formats

pub mod constructs;
pub mod schemas;
pub mod utils;

pub use constructs::ConstructError;

use vyos_sample_core::provider::{Provider, ResourceType};

/// Catalogue of the AWS resource types the stacks can declare
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsProvider;

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        schemas::configs()
            .into_iter()
            .map(|c| Box::new(c) as Box<dyn ResourceType>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_lookup() {
        let provider = AwsProvider;
        let vpc = provider.resource_type("ec2_vpc").unwrap();
        assert_eq!(vpc.template_type(), "AWS::EC2::VPC");
        assert!(vpc.has_tags());

        let route = provider.resource_type("ec2_transit_gateway_route").unwrap();
        assert_eq!(route.template_type(), "AWS::EC2::TransitGatewayRoute");
        assert!(!route.has_tags());

        assert!(provider.resource_type("vpc").is_none());
    }
}
