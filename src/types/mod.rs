use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Namespace selector that matches every namespace in pod listings.
pub const NAMESPACE_ALL: &str = "";

/// Tenancy mode of the plugin, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TenantMode {
    /// All pods share VNID 0
    SingleTenant,
    /// Pods are isolated by the VNID of their namespace
    MultiTenant,
}

impl TenantMode {
    pub fn from_multitenant(multitenant: bool) -> Self {
        if multitenant {
            TenantMode::MultiTenant
        } else {
            TenantMode::SingleTenant
        }
    }

    pub fn is_multitenant(self) -> bool {
        matches!(self, TenantMode::MultiTenant)
    }
}

/// Pod record as served by the pod registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    /// Namespace of the pod
    pub namespace: String,
    /// Pod name
    pub name: String,
    /// Container ID of the pod's infrastructure container
    #[serde(rename = "containerID", default)]
    pub container_id: String,
    /// Node the pod is scheduled on
    #[serde(default)]
    pub host: String,
    /// Pod annotations
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl Pod {
    /// Create a pod without annotations
    pub fn new(namespace: &str, name: &str, container_id: &str, host: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            container_id: container_id.to_string(),
            host: host.to_string(),
            annotations: HashMap::new(),
        }
    }

    /// Add an annotation, builder style
    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }
}

/// Network state of one container, as last driven by the plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PodNetworkState {
    #[default]
    Unconfigured,
    Configured,
    TornDown,
}

impl fmt::Display for PodNetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodNetworkState::Unconfigured => "unconfigured",
            PodNetworkState::Configured => "configured",
            PodNetworkState::TornDown => "torn-down",
        };
        f.write_str(s)
    }
}

/// Network status of a pod. The plugin never reports one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    /// Primary IP address of the pod
    pub ip: String,
}
