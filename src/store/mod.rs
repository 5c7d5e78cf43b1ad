//! Cluster object store abstraction
//!
//! The graph builder only needs three things from a cluster: fetch one
//! object, list objects matching a key, and discover which kinds the API
//! server serves. `KubeStore` answers them against a live cluster and
//! `MemoryStore` answers them from objects held in memory.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use kube::core::DynamicObject;
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a query against the object store
///
/// A key with a name addresses at most one object; a key with a label
/// selector may return many.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub namespace: Option<String>,
    pub api_version: String,
    pub kind: String,
    pub name: Option<String>,
    pub label_selector: Option<BTreeMap<String, String>>,
}

impl StoreKey {
    /// Key listing every object of a kind in a namespace
    pub fn list(namespace: Option<&str>, api_version: &str, kind: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: None,
            label_selector: None,
        }
    }

    /// Key addressing a single named object
    pub fn named(namespace: Option<&str>, api_version: &str, kind: &str, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::list(namespace, api_version, kind)
        }
    }

    pub fn with_selector(mut self, selector: BTreeMap<String, String>) -> Self {
        self.label_selector = Some(selector);
        self
    }

    /// Label selector in the `key=value,key=value` form the API server accepts
    pub fn selector_string(&self) -> Option<String> {
        self.label_selector.as_ref().map(|selector| {
            selector
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.api_version, self.kind)?;
        if let Some(ns) = &self.namespace {
            write!(f, " in {}", ns)?;
        }
        if let Some(name) = &self.name {
            write!(f, " named {}", name)?;
        }
        if let Some(selector) = self.selector_string() {
            write!(f, " matching {}", selector)?;
        }
        Ok(())
    }
}

/// A kind served by the API server, as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResourceInfo {
    pub api_version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl ApiResourceInfo {
    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }

    /// Namespaced kinds that can be listed and watched are the candidates for owned children
    pub fn can_own_children(&self) -> bool {
        self.namespaced && self.supports("list") && self.supports("watch")
    }
}

/// Object store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Kubernetes API request failed for {key}: {source}")]
    Api {
        key: String,
        #[source]
        source: kube::Error,
    },

    #[error("Resource discovery failed: {0}")]
    Discovery(String),

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode object: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read access to cluster objects
///
/// Absent objects are reported as `Ok(None)` by `get`, never as errors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a single named object
    async fn get(&self, key: &StoreKey) -> Result<Option<DynamicObject>, StoreError>;

    /// List objects matching the key's namespace, kind and selector
    async fn list(&self, key: &StoreKey) -> Result<Vec<DynamicObject>, StoreError>;

    /// Kinds served by the cluster with their scope and verbs
    async fn discover(&self) -> Result<Vec<ApiResourceInfo>, StoreError>;
}
