//! Stack definitions
//!
//! Each environment deploys two stacks: the Transit Gateway side in the
//! Tokyo region and the VyOS customer gateway side in the Osaka region.

pub mod tgw_for_vpn;
pub mod vyos_for_cgw;

pub use tgw_for_vpn::{OnPremRoute, tgw_for_vpn_stack};
pub use vyos_for_cgw::vyos_for_cgw_stack;

use ipnet::Ipv4Net;
use log::{debug, info};
use vyos_sample_aws::ConstructError;
use vyos_sample_core::app::App;
use vyos_sample_core::network::{find_overlaps, parse_network};
use vyos_sample_core::stack::{Stack, StackError};

use crate::config::{Config, ConfigError, Stage};

pub const SSM_MANAGED_POLICY: &str = "AmazonSSMManagedInstanceCore";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid {stage} configuration ({} problem(s))", .errors.len())]
    Config {
        stage: Stage,
        errors: Vec<ConfigError>,
    },

    #[error(transparent)]
    Construct(#[from] ConstructError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("Subnet {first} overlaps {second}")]
    OverlappingSubnets { first: String, second: String },

    #[error("Invalid VPN attachment id '{0}': expected tgw-attach-<hex>")]
    InvalidVpnAttachment(String),
}

pub fn tgw_for_vpn_stack_name(stage: Stage) -> String {
    format!("{}-TgwForVpnStack", stage.stack_prefix())
}

pub fn vyos_for_cgw_stack_name(stage: Stage) -> String {
    format!("{}-VyosForCgwStack", stage.stack_prefix())
}

/// One environment to build: its stage, configuration and on-premises route state
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub stage: Stage,
    pub config: Config,
    pub on_prem_route: OnPremRoute,
}

impl Deployment {
    /// The stage's built-in configuration with the on-premises route pending
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            config: stage.config(),
            on_prem_route: OnPremRoute::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_on_prem_route(mut self, on_prem_route: OnPremRoute) -> Self {
        self.on_prem_route = on_prem_route;
        self
    }

    /// Validate the configuration and build both stacks
    pub fn build(&self) -> Result<Vec<Stack>, BuildError> {
        let config = self.config.validated().map_err(|errors| BuildError::Config {
            stage: self.stage,
            errors,
        })?;

        let tokyo = tgw_for_vpn_stack(self.stage, &config, &self.on_prem_route)?;
        let osaka = vyos_for_cgw_stack(self.stage, &config)?;

        let mut subnets = declared_subnets(&tokyo);
        subnets.extend(declared_subnets(&osaka));
        if let Some((first, second)) = find_overlaps(&subnets).into_iter().next() {
            return Err(BuildError::OverlappingSubnets { first, second });
        }
        debug!("{}: {} subnets, none overlapping", self.stage, subnets.len());

        Ok(vec![tokyo, osaka])
    }
}

/// Every environment with its built-in configuration
pub fn default_deployments() -> Vec<Deployment> {
    Stage::ALL.into_iter().map(Deployment::new).collect()
}

/// Subnet CIDR blocks declared in a stack, named `<stack>/<logical id>`
pub fn declared_subnets(stack: &Stack) -> Vec<(String, Ipv4Net)> {
    stack
        .resources_of_type("ec2_subnet")
        .filter_map(|r| {
            let cidr = r.attribute("cidr_block")?.as_str()?;
            let net = parse_network(cidr).ok()?;
            Some((format!("{}/{}", stack.name(), r.logical_id()), net))
        })
        .collect()
}

/// Build the app holding both stacks of every deployment, in order
pub fn build_app(deployments: &[Deployment]) -> Result<App, BuildError> {
    let mut app = App::new();
    for deployment in deployments {
        for stack in deployment.build()? {
            info!(
                "{}: {} resources, {} outputs",
                stack.name(),
                stack.resources().len(),
                stack.outputs().len()
            );
            app.add_stack(stack)?;
        }
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vyos_sample_aws::AwsProvider;

    #[test]
    fn default_app_has_four_stacks() {
        let app = build_app(&default_deployments()).unwrap();
        let names: Vec<&str> = app.stacks().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "Dev-TgwForVpnStack",
                "Dev-VyosForCgwStack",
                "Prod-TgwForVpnStack",
                "Prod-VyosForCgwStack",
            ]
        );
        assert!(app.validate(&AwsProvider).is_ok());
    }

    #[test]
    fn stacks_are_bound_to_their_regions() {
        let app = build_app(&[Deployment::new(Stage::Prod)]).unwrap();
        let tokyo = app.stack("Prod-TgwForVpnStack").unwrap();
        let osaka = app.stack("Prod-VyosForCgwStack").unwrap();
        assert_eq!(tokyo.env().region, "ap-northeast-1");
        assert_eq!(osaka.env().region, "ap-northeast-3");
        assert_eq!(tokyo.env().account, "123456789012");
    }

    #[test]
    fn invalid_config_refuses_to_build() {
        let mut config = Stage::Dev.config();
        config.ec2.vyos_instance_type = "t3medium".to_string();
        let deployment = Deployment::new(Stage::Dev).with_config(config);

        match deployment.build() {
            Err(BuildError::Config { stage, errors }) => {
                assert_eq!(stage, Stage::Dev);
                assert_eq!(errors.len(), 1);
            }
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn same_stage_twice_is_a_duplicate_stack() {
        let deployments = [Deployment::new(Stage::Dev), Deployment::new(Stage::Dev)];
        assert!(matches!(
            build_app(&deployments),
            Err(BuildError::Stack(StackError::DuplicateStack(_)))
        ));
    }

    #[test]
    fn declared_subnets_are_named_by_stack() {
        let stacks = Deployment::new(Stage::Dev).build().unwrap();
        let subnets = declared_subnets(&stacks[1]);
        assert_eq!(
            subnets,
            vec![
                (
                    "Dev-VyosForCgwStack/OnPremVPCPublicSubnet1Subnet".to_string(),
                    "172.20.0.0/24".parse().unwrap()
                ),
                (
                    "Dev-VyosForCgwStack/OnPremVPCPrivateSubnet1Subnet".to_string(),
                    "172.20.1.0/24".parse().unwrap()
                ),
            ]
        );
    }
}
