use anyhow::{Context, Result};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::TenantMode;

/// Smallest MTU accepted for pod interfaces (IPv4 minimum datagram size)
pub const MIN_MTU: u32 = 576;
/// Largest MTU accepted for pod interfaces
pub const MAX_MTU: u32 = 65535;

/// Configuration for the OVS network plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    /// Isolate namespaces by VNID
    #[serde(default)]
    pub multitenant: bool,
    /// Name of this node, as known to the pod registry
    pub hostname: String,
    /// MTU for pod interfaces
    #[serde(default = "default_mtu")]
    pub mtu: u32,
    /// Network all node subnets are carved from
    #[serde(default = "default_cluster_network")]
    pub cluster_network: IpNetwork,
    /// Number of host bits in each node subnet
    #[serde(default = "default_host_subnet_length")]
    pub host_subnet_length: u32,
    /// Deadline for one agent run; unbounded when absent
    #[serde(default)]
    pub agent_timeout_secs: Option<u64>,
    /// Path to the local pod and VNID state file
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_mtu() -> u32 {
    1450
}

fn default_cluster_network() -> IpNetwork {
    IpNetwork::V4(ipnetwork::Ipv4Network::new([10, 128, 0, 0].into(), 14).expect("valid prefix"))
}

fn default_host_subnet_length() -> u32 {
    9
}

fn default_state_file() -> PathBuf {
    PathBuf::from("/var/lib/ovsnet/state.json")
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            multitenant: false,
            hostname: "localhost".to_string(),
            mtu: default_mtu(),
            cluster_network: default_cluster_network(),
            host_subnet_length: default_host_subnet_length(),
            agent_timeout_secs: None,
            state_file: default_state_file(),
        }
    }
}

impl PluginConfig {
    /// Parse PluginConfig from bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let conf: PluginConfig = serde_json::from_slice(bytes)
            .context("Failed to parse plugin configuration")?;
        conf.validate()?;
        Ok(conf)
    }

    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read plugin configuration {}", path.display()))?;
        Self::parse(&bytes)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write plugin configuration {}", path.display()))?;
        Ok(())
    }

    /// Check field values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            anyhow::bail!("Hostname is required");
        }

        if self.mtu < MIN_MTU || self.mtu > MAX_MTU {
            anyhow::bail!(
                "Invalid MTU {} (must be between {} and {})",
                self.mtu,
                MIN_MTU,
                MAX_MTU
            );
        }

        let address_bits = match self.cluster_network {
            IpNetwork::V4(_) => 32,
            IpNetwork::V6(_) => 128,
        };
        let host_room = address_bits - u32::from(self.cluster_network.prefix());
        if self.host_subnet_length == 0 || self.host_subnet_length >= host_room {
            anyhow::bail!(
                "Invalid host subnet length {} for cluster network {} (must be between 1 and {})",
                self.host_subnet_length,
                self.cluster_network,
                host_room.saturating_sub(1)
            );
        }

        Ok(())
    }

    pub fn mode(&self) -> TenantMode {
        TenantMode::from_multitenant(self.multitenant)
    }

    pub fn agent_timeout(&self) -> Option<Duration> {
        self.agent_timeout_secs.map(Duration::from_secs)
    }
}
