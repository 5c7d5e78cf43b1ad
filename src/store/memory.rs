//! In-memory object store
//!
//! Holds a fixed set of objects, usually loaded from YAML manifests, and
//! answers queries the way the API server would: exact label matching,
//! namespace scoping, and discovery of every kind it holds.

use super::{ApiResourceInfo, ObjectStore, StoreError, StoreKey};
use crate::models::ObjectKind;
use crate::models::object::{self, plural};
use async_trait::async_trait;
use kube::core::DynamicObject;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Built-in kinds that are not namespaced
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "Namespace",
    "Node",
    "PersistentVolume",
    "StorageClass",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "PriorityClass",
    "IngressClass",
];

const NAMESPACE_DEFAULT: &str = "default";

fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
        || ObjectKind::parse_optional(kind).is_some_and(|known| known.is_cluster_scoped())
}

/// `ObjectStore` over objects held in memory
#[derive(Default)]
pub struct MemoryStore {
    objects: Vec<DynamicObject>,
    get_calls: AtomicUsize,
    list_calls: AtomicUsize,
    discover_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(objects: impl IntoIterator<Item = DynamicObject>) -> Result<Self, StoreError> {
        let mut store = Self::default();
        for object in objects {
            store.insert(object)?;
        }
        Ok(store)
    }

    /// Load objects from one or more YAML documents
    ///
    /// `List` documents are expanded into their items. Namespaced objects
    /// without a namespace land in `default`, and objects without a UID get
    /// a stable one derived from their identity.
    pub fn from_yaml(yaml: &str) -> Result<Self, StoreError> {
        let mut store = Self::default();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_json::Value::deserialize(document)
                .map_err(|e| StoreError::Manifest(e.to_string()))?;
            if value.is_null() {
                continue;
            }
            for item in expand_list(value) {
                let typed = ["apiVersion", "kind"]
                    .iter()
                    .all(|field| item.get(field).and_then(|v| v.as_str()).is_some());
                if !typed {
                    return Err(StoreError::Manifest(
                        "document has no apiVersion or kind".to_string(),
                    ));
                }
                store.insert(serde_json::from_value(item)?)?;
            }
        }
        tracing::debug!("Loaded {} objects from manifests", store.objects.len());
        Ok(store)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Add an object, filling in the namespace and UID when missing
    pub fn insert(&mut self, mut object: DynamicObject) -> Result<(), StoreError> {
        let kind = object::kind(&object).to_string();
        if kind.is_empty() || object::api_version(&object).is_empty() {
            return Err(StoreError::Manifest(format!(
                "object {} has no apiVersion or kind",
                object::name(&object)
            )));
        }
        if object.metadata.name.is_none() {
            return Err(StoreError::Manifest(format!("{} object has no name", kind)));
        }

        if is_cluster_scoped(&kind) {
            object.metadata.namespace = None;
        } else if object.metadata.namespace.is_none() {
            object.metadata.namespace = Some(NAMESPACE_DEFAULT.to_string());
        }
        if object::uid(&object).is_none() {
            let uid = format!(
                "{}-{}-{}",
                kind.to_lowercase(),
                object::namespace(&object).unwrap_or("cluster"),
                object::name(&object)
            );
            object.metadata.uid = Some(uid);
        }

        self.objects.push(object);
        Ok(())
    }

    pub fn objects(&self) -> &[DynamicObject] {
        &self.objects
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    fn matches(object: &DynamicObject, key: &StoreKey) -> bool {
        if object::api_version(object) != key.api_version || object::kind(object) != key.kind {
            return false;
        }
        if let Some(ns) = key.namespace.as_deref()
            && object::namespace(object).is_some_and(|object_ns| object_ns != ns)
        {
            return false;
        }
        if let Some(name) = key.name.as_deref()
            && object::name(object) != name
        {
            return false;
        }
        match &key.label_selector {
            Some(selector) => {
                let labels = object.metadata.labels.as_ref();
                selector
                    .iter()
                    .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
            }
            None => true,
        }
    }
}

fn expand_list(value: serde_json::Value) -> Vec<serde_json::Value> {
    let is_list = value
        .get("kind")
        .and_then(|k| k.as_str())
        .is_some_and(|k| k == "List" || k.ends_with("List"));
    match (is_list, value.get("items").and_then(|i| i.as_array())) {
        (true, Some(items)) => items.clone(),
        _ => vec![value],
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<DynamicObject>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if key.name.is_none() {
            return Err(StoreError::InvalidKey(format!("{} has no name", key)));
        }
        Ok(self
            .objects
            .iter()
            .find(|object| Self::matches(object, key))
            .cloned())
    }

    async fn list(&self, key: &StoreKey) -> Result<Vec<DynamicObject>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .iter()
            .filter(|object| Self::matches(object, key))
            .cloned()
            .collect())
    }

    async fn discover(&self) -> Result<Vec<ApiResourceInfo>, StoreError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);

        let mut kinds: BTreeSet<(String, String)> = ObjectKind::all()
            .iter()
            .map(|known| (known.api_version().to_string(), known.as_str().to_string()))
            .collect();
        kinds.extend(self.objects.iter().map(|object| {
            (
                object::api_version(object).to_string(),
                object::kind(object).to_string(),
            )
        }));

        let verbs: Vec<String> = ["get", "list", "watch"]
            .into_iter()
            .map(String::from)
            .collect();
        Ok(kinds
            .into_iter()
            .map(|(api_version, kind)| ApiResourceInfo {
                plural: plural(&kind),
                namespaced: !is_cluster_scoped(&kind),
                verbs: verbs.clone(),
                api_version,
                kind,
            })
            .collect())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
        for object in &self.objects {
            *by_kind.entry(object::kind(object)).or_insert(0) += 1;
        }
        f.debug_struct("MemoryStore")
            .field("objects", &by_kind)
            .finish()
    }
}
