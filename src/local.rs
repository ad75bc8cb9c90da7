//! File-backed collaborators for running the plugin on a single node
//! without a cluster API, as `ovsnet-ctl` does.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::controller::{PodRegistry, SubnetController, VnidController};
use crate::types::{Pod, NAMESPACE_ALL};
use crate::vnid::VnidMapWriter;

/// Pods and namespace VNIDs known to this node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub namespaces: HashMap<String, u32>,
}

impl LocalState {
    /// Load state from a JSON file. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse state file {}", path.display()))
    }

    /// Save state to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write state file {}", path.display()))?;
        Ok(())
    }
}

/// Pod registry serving pods from a [`LocalState`]
#[derive(Debug, Clone)]
pub struct LocalPodRegistry {
    hostname: String,
    pods: Vec<Pod>,
}

impl LocalPodRegistry {
    pub fn new(hostname: &str, pods: Vec<Pod>) -> Self {
        Self {
            hostname: hostname.to_string(),
            pods,
        }
    }

    // Pods recorded without a host are taken to be on this node.
    fn on_host<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a Pod> + 'a {
        self.pods
            .iter()
            .filter(move |pod| pod.host.is_empty() || pod.host == host)
    }
}

#[async_trait]
impl PodRegistry for LocalPodRegistry {
    async fn get_pod(&self, host: &str, namespace: &str, name: &str) -> Result<Option<Pod>> {
        Ok(self
            .on_host(host)
            .find(|pod| pod.namespace == namespace && pod.name == name)
            .cloned())
    }

    async fn get_local_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        Ok(self
            .on_host(&self.hostname)
            .filter(|pod| namespace == NAMESPACE_ALL || pod.namespace == namespace)
            .cloned()
            .collect())
    }
}

/// Subnet controller for a node whose subnet is provisioned out of band
#[derive(Debug, Clone, Default)]
pub struct StaticSubnetController {
    network_changed: bool,
}

impl StaticSubnetController {
    /// `network_changed` is reported by node start
    pub fn new(network_changed: bool) -> Self {
        Self { network_changed }
    }
}

#[async_trait]
impl SubnetController for StaticSubnetController {
    async fn start_master(&self, cluster_network: IpNetwork, host_subnet_length: u32) -> Result<()> {
        info!(%cluster_network, host_subnet_length, "Using statically provisioned node subnets");
        Ok(())
    }

    async fn start_node(&self, _mtu: u32) -> Result<bool> {
        Ok(self.network_changed)
    }

    async fn wait_for_network_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// VNID controller publishing a fixed namespace table into the tenant map
#[derive(Debug)]
pub struct StaticVnidController {
    writer: VnidMapWriter,
    namespaces: HashMap<String, u32>,
}

impl StaticVnidController {
    pub fn new(writer: VnidMapWriter, namespaces: HashMap<String, u32>) -> Self {
        Self { writer, namespaces }
    }

    fn publish(&self) {
        for (namespace, vnid) in &self.namespaces {
            self.writer.insert(namespace, *vnid);
        }
        info!("Published VNIDs for {} namespaces", self.namespaces.len());
    }
}

#[async_trait]
impl VnidController for StaticVnidController {
    async fn start_master(&self) -> Result<()> {
        self.publish();
        Ok(())
    }

    async fn start_node(&self) -> Result<()> {
        self.publish();
        Ok(())
    }
}
