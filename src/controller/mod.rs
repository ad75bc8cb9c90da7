//! Collaborators the plugin drives but does not implement.
//!
//! Subnet allocation, VNID allocation and the pod registry live outside the
//! plugin core; they report failures as `anyhow::Error` and the plugin only
//! sequences their calls.

use async_trait::async_trait;
use ipnetwork::IpNetwork;

use crate::types::Pod;

/// Allocates per-node pod subnets
#[async_trait]
pub trait SubnetController: Send + Sync {
    /// Start subnet allocation for the cluster network
    async fn start_master(
        &self,
        cluster_network: IpNetwork,
        host_subnet_length: u32,
    ) -> anyhow::Result<()>;

    /// Set up this node's subnet. Returns `true` if the node's address range
    /// changed since the last start.
    async fn start_node(&self, mtu: u32) -> anyhow::Result<bool>;

    /// Block until the node's pod network is ready for pods
    async fn wait_for_network_ready(&self) -> anyhow::Result<()>;
}

/// Allocates per-namespace VNIDs and publishes them to the tenant map
#[async_trait]
pub trait VnidController: Send + Sync {
    async fn start_master(&self) -> anyhow::Result<()>;

    async fn start_node(&self) -> anyhow::Result<()>;
}

/// Read access to the cluster's pods
#[async_trait]
pub trait PodRegistry: Send + Sync {
    /// Fetch a pod scheduled on `host`. `Ok(None)` if it does not exist.
    async fn get_pod(&self, host: &str, namespace: &str, name: &str)
        -> anyhow::Result<Option<Pod>>;

    /// Pods scheduled on this node, in `namespace` or in all namespaces for
    /// [`NAMESPACE_ALL`](crate::types::NAMESPACE_ALL)
    async fn get_local_pods(&self, namespace: &str) -> anyhow::Result<Vec<Pod>>;
}
