//! VyOS Sample Stacks
//!
//! Environment configuration and the two stack definitions of the VyOS
//! site-to-site VPN sandbox.
//!
//! ## Module Structure
//!
//! - `config` - Per-environment configuration records and their validation
//! - `stacks` - `TgwForVpnStack` (Tokyo) and `VyosForCgwStack` (Osaka)

pub mod config;
pub mod stacks;

pub use config::{Config, ConfigError, Stage, ValidatedConfig};
pub use stacks::{BuildError, Deployment, OnPremRoute, build_app, default_deployments};
