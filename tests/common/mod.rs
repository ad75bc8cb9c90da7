// File: tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ipnetwork::IpNetwork;

use ovsnet::agent::{AgentCommand, AgentOutput, AgentRunner};
use ovsnet::controller::{PodRegistry, SubnetController, VnidController};
use ovsnet::plugin::{Collaborators, OvsPlugin};
use ovsnet::types::{Pod, TenantMode, NAMESPACE_ALL};
use ovsnet::vnid::{VnidMap, VnidMapWriter};

pub const HOST: &str = "node-1";

/// Shared, ordered log of collaborator calls
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
pub struct FakeSubnet {
    pub calls: CallLog,
    pub network_changed: bool,
    pub fail_master: bool,
    pub fail_node: bool,
    pub fail_ready: bool,
}

#[async_trait]
impl SubnetController for FakeSubnet {
    async fn start_master(&self, network: IpNetwork, host_subnet_length: u32) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("subnet.start_master {network} {host_subnet_length}"));
        if self.fail_master {
            anyhow::bail!("subnet master failed");
        }
        Ok(())
    }

    async fn start_node(&self, mtu: u32) -> anyhow::Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("subnet.start_node {mtu}"));
        if self.fail_node {
            anyhow::bail!("subnet node failed");
        }
        Ok(self.network_changed)
    }

    async fn wait_for_network_ready(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("subnet.wait".to_string());
        if self.fail_ready {
            anyhow::bail!("network never became ready");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeVnids {
    pub calls: CallLog,
    pub fail_master: bool,
    pub fail_node: bool,
}

#[async_trait]
impl VnidController for FakeVnids {
    async fn start_master(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("vnid.start_master".to_string());
        if self.fail_master {
            anyhow::bail!("vnid master failed");
        }
        Ok(())
    }

    async fn start_node(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("vnid.start_node".to_string());
        if self.fail_node {
            anyhow::bail!("vnid node failed");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub pods: Vec<Pod>,
    pub fail_list: bool,
}

#[async_trait]
impl PodRegistry for FakeRegistry {
    async fn get_pod(&self, host: &str, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>> {
        Ok(self
            .pods
            .iter()
            .find(|p| p.host == host && p.namespace == namespace && p.name == name)
            .cloned())
    }

    async fn get_local_pods(&self, namespace: &str) -> anyhow::Result<Vec<Pod>> {
        if self.fail_list {
            anyhow::bail!("registry unavailable");
        }
        Ok(self
            .pods
            .iter()
            .filter(|p| p.host == HOST && (namespace == NAMESPACE_ALL || p.namespace == namespace))
            .cloned()
            .collect())
    }
}

/// Agent that records every argv and fails for selected containers
#[derive(Default)]
pub struct RecordingAgent {
    pub invocations: Mutex<Vec<Vec<String>>>,
    pub failing: HashSet<String>,
}

impl RecordingAgent {
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            failing: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRunner for RecordingAgent {
    async fn run(&self, command: &AgentCommand) -> ovsnet::Result<AgentOutput> {
        self.invocations.lock().unwrap().push(command.argv());
        if self.failing.contains(command.container_id()) {
            return Ok(AgentOutput {
                code: Some(1),
                output: "ovs-ofctl: br0 is not a bridge".to_string(),
            });
        }
        Ok(AgentOutput {
            code: Some(0),
            output: String::new(),
        })
    }
}

/// Plugin wired to fakes, with handles to inspect them
pub struct Harness {
    pub plugin: OvsPlugin,
    pub agent: Arc<RecordingAgent>,
    pub vnids: VnidMapWriter,
    pub calls: CallLog,
}

pub struct HarnessBuilder {
    mode: TenantMode,
    subnet: FakeSubnet,
    vnids: FakeVnids,
    registry: FakeRegistry,
    agent: RecordingAgent,
    namespaces: HashMap<String, u32>,
}

impl HarnessBuilder {
    pub fn new(mode: TenantMode) -> Self {
        Self {
            mode,
            subnet: FakeSubnet::default(),
            vnids: FakeVnids::default(),
            registry: FakeRegistry::default(),
            agent: RecordingAgent::default(),
            namespaces: HashMap::new(),
        }
    }

    pub fn pod(mut self, pod: Pod) -> Self {
        self.registry.pods.push(pod);
        self
    }

    pub fn namespace(mut self, namespace: &str, vnid: u32) -> Self {
        self.namespaces.insert(namespace.to_string(), vnid);
        self
    }

    pub fn subnet(mut self, f: impl FnOnce(&mut FakeSubnet)) -> Self {
        f(&mut self.subnet);
        self
    }

    pub fn vnids(mut self, f: impl FnOnce(&mut FakeVnids)) -> Self {
        f(&mut self.vnids);
        self
    }

    pub fn registry(mut self, f: impl FnOnce(&mut FakeRegistry)) -> Self {
        f(&mut self.registry);
        self
    }

    pub fn agent(mut self, agent: RecordingAgent) -> Self {
        self.agent = agent;
        self
    }

    pub fn build(mut self) -> Harness {
        let calls = CallLog::default();
        self.subnet.calls = calls.clone();
        self.vnids.calls = calls.clone();

        let (writer, map) = VnidMap::new();
        for (namespace, vnid) in &self.namespaces {
            writer.insert(namespace, *vnid);
        }

        let agent = Arc::new(self.agent);
        let plugin = OvsPlugin::new(
            self.mode,
            HOST,
            Collaborators {
                subnet: Arc::new(self.subnet),
                vnids: Arc::new(self.vnids),
                registry: Arc::new(self.registry),
            },
            map,
            agent.clone(),
        );

        Harness {
            plugin,
            agent,
            vnids: writer,
            calls,
        }
    }
}

impl Harness {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
