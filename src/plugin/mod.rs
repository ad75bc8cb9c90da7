use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use ipnetwork::IpNetwork;
use tracing::{info, warn};

use crate::agent::{self, AgentCommand, AgentRunner};
use crate::bandwidth::extract_bandwidth;
use crate::controller::{PodRegistry, SubnetController, VnidController};
use crate::error::{Error, Result};
use crate::types::{NetworkStatus, Pod, PodNetworkState, TenantMode, NAMESPACE_ALL};
use crate::vnid::{VnidMap, VnidResolver};

/// Plugin name reported in single-tenant mode
pub const SINGLE_TENANT_PLUGIN_NAME: &str = "redhat/openshift-ovs-subnet";
/// Plugin name reported in multi-tenant mode
pub const MULTI_TENANT_PLUGIN_NAME: &str = "redhat/openshift-ovs-multitenant";

/// External controllers the plugin sequences
#[derive(Clone)]
pub struct Collaborators {
    pub subnet: Arc<dyn SubnetController>,
    pub vnids: Arc<dyn VnidController>,
    pub registry: Arc<dyn PodRegistry>,
}

/// Number of torn-down container ids remembered by [`OvsPlugin::pod_state`].
/// Older ids fall back to `Unconfigured`.
pub const TORN_DOWN_HISTORY: usize = 1024;

/// Outcome of the pod resync that follows a node subnet change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    pub updated: usize,
    pub failed: usize,
}

/// Open vSwitch network plugin
pub struct OvsPlugin {
    /// Tenancy mode
    mode: TenantMode,
    /// Name of the node this plugin runs on
    hostname: String,
    /// Pod interface MTU, set by node start
    mtu: OnceLock<u32>,
    master_started: AtomicBool,
    node_started: AtomicBool,
    collaborators: Collaborators,
    resolver: VnidResolver,
    agent: Arc<dyn AgentRunner>,
    states: Mutex<PodStates>,
}

/// Containers currently set up, plus a bounded history of teardowns
#[derive(Default)]
struct PodStates {
    configured: HashSet<String>,
    torn_down: VecDeque<String>,
}

impl PodStates {
    fn get(&self, container_id: &str) -> PodNetworkState {
        if self.configured.contains(container_id) {
            PodNetworkState::Configured
        } else if self.torn_down.iter().any(|id| id == container_id) {
            PodNetworkState::TornDown
        } else {
            PodNetworkState::Unconfigured
        }
    }

    fn configure(&mut self, container_id: &str) {
        self.torn_down.retain(|id| id != container_id);
        self.configured.insert(container_id.to_string());
    }

    fn tear_down(&mut self, container_id: &str) {
        self.configured.remove(container_id);
        self.torn_down.retain(|id| id != container_id);
        if self.torn_down.len() == TORN_DOWN_HISTORY {
            self.torn_down.pop_front();
        }
        self.torn_down.push_back(container_id.to_string());
    }

    fn len(&self) -> usize {
        self.configured.len() + self.torn_down.len()
    }
}

impl OvsPlugin {
    /// Create a new plugin
    pub fn new(
        mode: TenantMode,
        hostname: &str,
        collaborators: Collaborators,
        vnid_map: VnidMap,
        agent: Arc<dyn AgentRunner>,
    ) -> Self {
        Self {
            mode,
            hostname: hostname.to_string(),
            mtu: OnceLock::new(),
            master_started: AtomicBool::new(false),
            node_started: AtomicBool::new(false),
            collaborators,
            resolver: VnidResolver::new(mode, vnid_map),
            agent,
            states: Mutex::new(PodStates::default()),
        }
    }

    /// Plugin name the host registers this plugin under
    pub fn name(&self) -> &'static str {
        match self.mode {
            TenantMode::SingleTenant => SINGLE_TENANT_PLUGIN_NAME,
            TenantMode::MultiTenant => MULTI_TENANT_PLUGIN_NAME,
        }
    }

    pub fn mode(&self) -> TenantMode {
        self.mode
    }

    /// MTU stored by node start, if the node has been started
    pub fn mtu(&self) -> Option<u32> {
        self.mtu.get().copied()
    }

    /// Host initialization hook. Nothing to do.
    pub fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Host event hook. The plugin ignores host events.
    pub fn event(&self, _name: &str, _details: &HashMap<String, serde_json::Value>) {}

    /// Start the master side: subnet allocation, then VNID allocation in
    /// multi-tenant mode. The first failure aborts the call.
    pub async fn start_master(
        &self,
        cluster_network: IpNetwork,
        host_subnet_length: u32,
    ) -> Result<()> {
        if self.master_started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted("master"));
        }

        info!(%cluster_network, host_subnet_length, "Starting {} master", self.name());
        self.collaborators
            .subnet
            .start_master(cluster_network, host_subnet_length)
            .await?;

        if self.mode.is_multitenant() {
            self.collaborators.vnids.start_master().await?;
        }

        Ok(())
    }

    /// Start the node side. If the node's subnet changed, every local pod is
    /// updated; pods that fail to update are logged and skipped.
    pub async fn start_node(&self, mtu: u32) -> Result<()> {
        if self.node_started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted("node"));
        }
        if self.mtu.set(mtu).is_err() {
            warn!(mtu, stored = ?self.mtu(), "MTU already set, keeping the stored value");
        }

        info!(host = %self.hostname, mtu, "Starting {} node", self.name());
        let network_changed = self.collaborators.subnet.start_node(mtu).await?;

        if self.mode.is_multitenant() {
            self.collaborators.vnids.start_node().await?;
        }

        if network_changed {
            let pods = self
                .collaborators
                .registry
                .get_local_pods(NAMESPACE_ALL)
                .await?;
            info!("Node subnet changed, updating {} local pods", pods.len());

            let summary = self.resync_pods(&pods).await;
            info!(
                updated = summary.updated,
                failed = summary.failed,
                "Finished updating local pods"
            );
        }

        Ok(())
    }

    /// Update each pod in turn. Never fails; failures are counted and logged.
    async fn resync_pods(&self, pods: &[Pod]) -> ResyncSummary {
        let mut summary = ResyncSummary::default();
        for pod in pods {
            match self
                .update_pod(&pod.namespace, &pod.name, &pod.container_id)
                .await
            {
                Ok(()) => summary.updated += 1,
                Err(err) => {
                    warn!(
                        "Could not update pod {:?} ({}): {}",
                        pod.name, pod.container_id, err
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Configure the network of a new pod.
    ///
    /// Waits for the node network, then validates everything the agent needs
    /// before invoking it; any failure before that point leaves the pod
    /// untouched.
    pub async fn set_up_pod(&self, namespace: &str, name: &str, container_id: &str) -> Result<()> {
        self.collaborators.subnet.wait_for_network_ready().await?;

        let pod = self
            .collaborators
            .registry
            .get_pod(&self.hostname, namespace, name)
            .await?
            .ok_or_else(|| Error::PodNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let bandwidth = extract_bandwidth(&pod.annotations).map_err(|err| Error::Bandwidth {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source: Box::new(err),
        })?;

        let vnid = self.resolver.resolve_arg(namespace)?;
        let mtu = self.mtu().ok_or(Error::NodeNotStarted)?;

        let command = AgentCommand::Setup {
            container_id: container_id.to_string(),
            vnid,
            ingress: bandwidth.ingress_arg(),
            egress: bandwidth.egress_arg(),
            mtu,
        };
        agent::invoke(self.agent.as_ref(), &command).await?;

        self.lock_states().configure(container_id);
        info!(namespace, pod = name, container_id, "Pod network set up");
        Ok(())
    }

    /// Remove a pod's network. Needs neither the pod record nor its VNID, so
    /// it works after either is gone.
    pub async fn tear_down_pod(
        &self,
        namespace: &str,
        name: &str,
        container_id: &str,
    ) -> Result<()> {
        let command = AgentCommand::Teardown {
            container_id: container_id.to_string(),
        };
        agent::invoke(self.agent.as_ref(), &command).await?;

        self.lock_states().tear_down(container_id);
        info!(namespace, pod = name, container_id, "Pod network torn down");
        Ok(())
    }

    /// Re-apply the VNID of an already configured pod
    pub async fn update_pod(&self, namespace: &str, name: &str, container_id: &str) -> Result<()> {
        let vnid = self.resolver.resolve_arg(namespace)?;
        let command = AgentCommand::Update {
            container_id: container_id.to_string(),
            vnid,
        };
        agent::invoke(self.agent.as_ref(), &command).await?;

        info!(namespace, pod = name, container_id, "Pod network updated");
        Ok(())
    }

    /// Network status of a pod. Not reported by this plugin.
    pub async fn status(
        &self,
        _namespace: &str,
        _name: &str,
        _container_id: &str,
    ) -> Result<Option<NetworkStatus>> {
        Ok(None)
    }

    /// Last state the plugin drove a container to. Only the most recent
    /// [`TORN_DOWN_HISTORY`] teardowns are remembered.
    pub fn pod_state(&self, container_id: &str) -> PodNetworkState {
        self.lock_states().get(container_id)
    }

    /// Number of container ids the state table currently holds
    pub fn tracked_pods(&self) -> usize {
        self.lock_states().len()
    }

    fn lock_states(&self) -> MutexGuard<'_, PodStates> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
