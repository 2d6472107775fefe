//! Environment configuration
//!
//! One record per environment. Every field is required. The built-in `dev`
//! and `prod` records are the defaults; a record can also be loaded from a
//! JSON file using the same camelCase field names.

mod dev;
mod prod;

pub use dev::dev_config;
pub use prod::prod_config;

use std::fmt;
use std::path::Path;

use ipnet::Ipv4Net;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use vyos_sample_aws::schemas::is_private_asn;
use vyos_sample_aws::utils::{is_valid_ami_id, is_valid_region};
use vyos_sample_core::instance_type::{InstanceType, InstanceTypeError};
use vyos_sample_core::network::{CidrError, find_overlaps, parse_network};

/// Every VPC is split into at least two /24 subnets
pub const MAX_VPC_PREFIX: u8 = 23;

static PROJECT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid project name regex"));

static ACCOUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{12}$").expect("Invalid account regex"));

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid project name '{0}': use letters, digits and '-'")]
    InvalidProjectName(String),

    #[error("Invalid account id '{0}': expected 12 digits")]
    InvalidAccount(String),

    #[error("Invalid region '{value}' for {field}")]
    InvalidRegion { field: &'static str, value: String },

    #[error("Tokyo and Osaka regions must differ (both are '{0}')")]
    SameRegion(String),

    #[error("Invalid AMI id '{value}' for {field}")]
    InvalidAmiId { field: &'static str, value: String },

    #[error("{field}: {source}")]
    InvalidInstanceType {
        field: &'static str,
        #[source]
        source: InstanceTypeError,
    },

    #[error("{field}: {source}")]
    InvalidCidr {
        field: &'static str,
        #[source]
        source: CidrError,
    },

    #[error("{field}: {cidr} is too small, the prefix must be /{max} or shorter")]
    CidrTooSmall {
        field: &'static str,
        cidr: String,
        max: u8,
    },

    #[error("{first} and {second} overlap")]
    OverlappingCidrs { first: String, second: String },

    #[error("Transit Gateway ASN {0} is not in a private range (64512-65534 or 4200000000-4294967294)")]
    InvalidAsn(u32),

    #[error("Failed to read {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Deployment stage: one set of stacks per stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Dev,
    Prod,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Dev, Stage::Prod];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Prod => "prod",
        }
    }

    /// Prefix of the stack names (e.g. "Dev-TgwForVpnStack")
    pub fn stack_prefix(&self) -> &'static str {
        match self {
            Stage::Dev => "Dev",
            Stage::Prod => "Prod",
        }
    }

    /// Built-in configuration record
    pub fn config(&self) -> Config {
        match self {
            Stage::Dev => dev_config(),
            Stage::Prod => prod_config(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub project: ProjectConfig,
    pub aws: AwsConfig,
    pub ec2: Ec2Config,
    pub network: NetworkConfig,
    pub transit_gateway: TransitGatewayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AwsConfig {
    pub account: String,
    pub regions: Regions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Regions {
    pub tokyo: String,
    pub osaka: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Ec2Config {
    pub vyos_ami_id: String,
    pub vyos_instance_type: String,
    pub test_instance_ami_id: String,
    pub test_instance_type: String,
    pub on_prem_test_ami_id: String,
    pub on_prem_test_instance_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkConfig {
    pub tokyo: TokyoNetwork,
    pub osaka: OsakaNetwork,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokyoNetwork {
    pub vpc1: VpcConfig,
    pub vpc2: VpcConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OsakaNetwork {
    pub vpc: VpcConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VpcConfig {
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitGatewayConfig {
    pub asn: u32,
}

/// A configuration whose every field has been checked and parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub project_name: String,
    pub account: String,
    pub tokyo_region: String,
    pub osaka_region: String,
    pub vyos_ami_id: String,
    pub vyos_instance_type: InstanceType,
    pub test_instance_ami_id: String,
    pub test_instance_type: InstanceType,
    pub on_prem_test_ami_id: String,
    pub on_prem_test_instance_type: InstanceType,
    pub tokyo_vpc1_cidr: Ipv4Net,
    pub tokyo_vpc2_cidr: Ipv4Net,
    pub osaka_vpc_cidr: Ipv4Net,
    pub asn: u32,
}

impl Config {
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a configuration record from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content, &path.display().to_string())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every rule, reporting all problems at once
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        self.validated().map(|_| ())
    }

    /// Check every rule and return the parsed values
    pub fn validated(&self) -> Result<ValidatedConfig, Vec<ConfigError>> {
        let mut errors = Vec::new();

        if !PROJECT_NAME_REGEX.is_match(&self.project.name) {
            errors.push(ConfigError::InvalidProjectName(self.project.name.clone()));
        }
        if !ACCOUNT_REGEX.is_match(&self.aws.account) {
            errors.push(ConfigError::InvalidAccount(self.aws.account.clone()));
        }

        let regions = [
            ("aws.regions.tokyo", &self.aws.regions.tokyo),
            ("aws.regions.osaka", &self.aws.regions.osaka),
        ];
        for (field, value) in regions {
            if !is_valid_region(value) {
                errors.push(ConfigError::InvalidRegion {
                    field,
                    value: value.clone(),
                });
            }
        }
        if self.aws.regions.tokyo == self.aws.regions.osaka {
            errors.push(ConfigError::SameRegion(self.aws.regions.tokyo.clone()));
        }

        let amis = [
            ("ec2.vyosAmiId", &self.ec2.vyos_ami_id),
            ("ec2.testInstanceAmiId", &self.ec2.test_instance_ami_id),
            ("ec2.onPremTestAmiId", &self.ec2.on_prem_test_ami_id),
        ];
        for (field, value) in amis {
            if !is_valid_ami_id(value) {
                errors.push(ConfigError::InvalidAmiId {
                    field,
                    value: value.clone(),
                });
            }
        }

        let mut instance_type = |field: &'static str, value: &str| {
            value
                .parse::<InstanceType>()
                .map_err(|source| errors.push(ConfigError::InvalidInstanceType { field, source }))
                .ok()
        };
        let vyos_instance_type = instance_type("ec2.vyosInstanceType", &self.ec2.vyos_instance_type);
        let test_instance_type = instance_type("ec2.testInstanceType", &self.ec2.test_instance_type);
        let on_prem_test_instance_type = instance_type(
            "ec2.onPremTestInstanceType",
            &self.ec2.on_prem_test_instance_type,
        );

        let cidr_fields = [
            ("network.tokyo.vpc1.cidr", &self.network.tokyo.vpc1.cidr),
            ("network.tokyo.vpc2.cidr", &self.network.tokyo.vpc2.cidr),
            ("network.osaka.vpc.cidr", &self.network.osaka.vpc.cidr),
        ];
        let mut cidrs = Vec::new();
        for (field, value) in cidr_fields {
            match parse_network(value) {
                Ok(net) if net.prefix_len() > MAX_VPC_PREFIX => {
                    errors.push(ConfigError::CidrTooSmall {
                        field,
                        cidr: value.clone(),
                        max: MAX_VPC_PREFIX,
                    });
                }
                Ok(net) => cidrs.push((field.to_string(), net)),
                Err(source) => errors.push(ConfigError::InvalidCidr { field, source }),
            }
        }
        for (first, second) in find_overlaps(&cidrs) {
            errors.push(ConfigError::OverlappingCidrs { first, second });
        }

        if !is_private_asn(i64::from(self.transit_gateway.asn)) {
            errors.push(ConfigError::InvalidAsn(self.transit_gateway.asn));
        }

        let cidr = |field: &str| cidrs.iter().find(|(f, _)| f == field).map(|(_, net)| *net);
        match (
            errors.is_empty(),
            vyos_instance_type,
            test_instance_type,
            on_prem_test_instance_type,
            cidr("network.tokyo.vpc1.cidr"),
            cidr("network.tokyo.vpc2.cidr"),
            cidr("network.osaka.vpc.cidr"),
        ) {
            (
                true,
                Some(vyos_instance_type),
                Some(test_instance_type),
                Some(on_prem_test_instance_type),
                Some(tokyo_vpc1_cidr),
                Some(tokyo_vpc2_cidr),
                Some(osaka_vpc_cidr),
            ) => Ok(ValidatedConfig {
                project_name: self.project.name.clone(),
                account: self.aws.account.clone(),
                tokyo_region: self.aws.regions.tokyo.clone(),
                osaka_region: self.aws.regions.osaka.clone(),
                vyos_ami_id: self.ec2.vyos_ami_id.clone(),
                vyos_instance_type,
                test_instance_ami_id: self.ec2.test_instance_ami_id.clone(),
                test_instance_type,
                on_prem_test_ami_id: self.ec2.on_prem_test_ami_id.clone(),
                on_prem_test_instance_type,
                tokyo_vpc1_cidr,
                tokyo_vpc2_cidr,
                osaka_vpc_cidr,
                asn: self.transit_gateway.asn,
            }),
            _ => Err(errors),
        }
    }
}
