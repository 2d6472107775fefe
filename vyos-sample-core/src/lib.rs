//! VyOS Sample Core
//!
//! Typed resource model for declaring infrastructure as values: stacks of
//! resources are validated against a provider's schema catalogue and
//! synthesized into templates for an external provisioning engine.

pub mod app;
pub mod assembly;
pub mod graph;
pub mod instance_type;
pub mod network;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod stack;
pub mod template;
