//! Namespace to VNID resolution.
//!
//! The tenant map is written only by the VNID controller through a
//! [`VnidMapWriter`]; the plugin reads it through a [`VnidMap`] handle.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::types::TenantMode;

/// VNID meaning "no isolation". The only VNID used in single-tenant mode.
pub const GLOBAL_VNID: u32 = 0;

type Shared = Arc<RwLock<HashMap<String, u32>>>;

/// Read-only handle to the tenant map
#[derive(Debug, Clone, Default)]
pub struct VnidMap {
    inner: Shared,
}

/// Write handle to the tenant map, owned by the VNID controller
#[derive(Debug)]
pub struct VnidMapWriter {
    inner: Shared,
}

impl VnidMap {
    /// Create an empty tenant map, returning the writer and a reader
    pub fn new() -> (VnidMapWriter, VnidMap) {
        let inner: Shared = Arc::default();
        (
            VnidMapWriter {
                inner: inner.clone(),
            },
            VnidMap { inner },
        )
    }

    /// Look up the VNID of a namespace
    pub fn get(&self, namespace: &str) -> Option<u32> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .copied()
    }

    /// Number of namespaces with a VNID
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VnidMapWriter {
    /// Set the VNID of a namespace, returning the previous value
    pub fn insert(&self, namespace: &str, vnid: u32) -> Option<u32> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), vnid)
    }

    /// Remove a namespace, returning its VNID
    pub fn remove(&self, namespace: &str) -> Option<u32> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(namespace)
    }

    /// Another reader for the same map
    pub fn reader(&self) -> VnidMap {
        VnidMap {
            inner: self.inner.clone(),
        }
    }
}

/// Resolves the VNID a pod's namespace is isolated in
#[derive(Debug, Clone)]
pub struct VnidResolver {
    mode: TenantMode,
    map: VnidMap,
}

impl VnidResolver {
    pub fn new(mode: TenantMode, map: VnidMap) -> Self {
        Self { mode, map }
    }

    /// Resolve a namespace to its VNID.
    ///
    /// In multi-tenant mode a namespace without an entry is an error; no
    /// VNID is ever made up for it.
    pub fn resolve(&self, namespace: &str) -> Result<u32> {
        match self.mode {
            TenantMode::SingleTenant => Ok(GLOBAL_VNID),
            TenantMode::MultiTenant => self
                .map
                .get(namespace)
                .ok_or_else(|| Error::VnidNotFound(namespace.to_string())),
        }
    }

    /// Resolve a namespace to the decimal string handed to the agent
    pub fn resolve_arg(&self, namespace: &str) -> Result<String> {
        self.resolve(namespace).map(|vnid| vnid.to_string())
    }
}
