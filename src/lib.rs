//! Open vSwitch network plugin core for Kubernetes nodes
//!
//! This crate sequences the pieces of an OVS-based pod network:
//! - Starts subnet allocation and, in multi-tenant mode, VNID allocation
//! - Resyncs local pods when the node's subnet changes
//! - Validates pod bandwidth annotations and resolves namespace VNIDs
//! - Hands device and flow configuration to the `openshift-sdn-ovs` agent

pub mod agent;
pub mod bandwidth;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod local;
pub mod plugin;
pub mod types;
pub mod vnid;

// Re-export commonly used items
pub use agent::{AgentCommand, AgentOutput, AgentRunner, ProcessAgent};
pub use config::PluginConfig;
pub use controller::{PodRegistry, SubnetController, VnidController};
pub use error::{Error, Result};
pub use plugin::{Collaborators, OvsPlugin};
pub use types::{Pod, PodNetworkState, TenantMode};
pub use vnid::{VnidMap, VnidMapWriter, VnidResolver};
