//! Object store backed by a live cluster

use super::{ApiResourceInfo, ObjectStore, StoreError, StoreKey};
use crate::models::object::split_api_version;
use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta};
use kube::discovery::{ApiCapabilities, Discovery, Scope};
use tokio::sync::OnceCell;

/// `ObjectStore` talking to the Kubernetes API server
///
/// Discovery runs once, on first use, and is reused to resolve the plural
/// and scope of every kind the store is asked about.
pub struct KubeStore {
    client: kube::Client,
    discovery: OnceCell<Discovery>,
}

impl KubeStore {
    pub fn new(client: kube::Client) -> Self {
        Self {
            client,
            discovery: OnceCell::new(),
        }
    }

    async fn discovery(&self) -> Result<&Discovery, StoreError> {
        self.discovery
            .get_or_try_init(|| async {
                tracing::debug!("Running API discovery");
                Discovery::new(self.client.clone())
                    .run()
                    .await
                    .map_err(|e| StoreError::Discovery(e.to_string()))
            })
            .await
    }

    /// Resolve the API resource for a key, falling back to a guessed plural for unknown kinds
    async fn resolve(&self, key: &StoreKey) -> Result<(ApiResource, Scope), StoreError> {
        if key.kind.is_empty() || key.api_version.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let (group, version) = split_api_version(&key.api_version);
        let gvk = GroupVersionKind::gvk(group, version, &key.kind);

        match self.discovery().await?.resolve_gvk(&gvk) {
            Some((resource, capabilities)) => Ok((resource, capabilities.scope)),
            None => {
                tracing::debug!(
                    "{} {} not found by discovery, guessing plural",
                    key.api_version,
                    key.kind
                );
                let scope = if key.namespace.is_some() {
                    Scope::Namespaced
                } else {
                    Scope::Cluster
                };
                Ok((ApiResource::from_gvk(&gvk), scope))
            }
        }
    }

    fn api(&self, key: &StoreKey, resource: &ApiResource, scope: &Scope) -> Api<DynamicObject> {
        match (scope, key.namespace.as_deref()) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, resource),
            _ => Api::all_with(self.client.clone(), resource),
        }
    }
}

/// List responses omit apiVersion and kind on their items
fn with_types(mut object: DynamicObject, resource: &ApiResource) -> DynamicObject {
    if object.types.is_none() {
        object.types = Some(TypeMeta {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
        });
    }
    object
}

fn resource_info(resource: &ApiResource, capabilities: &ApiCapabilities) -> ApiResourceInfo {
    ApiResourceInfo {
        api_version: resource.api_version.clone(),
        kind: resource.kind.clone(),
        plural: resource.plural.clone(),
        namespaced: capabilities.scope == Scope::Namespaced,
        verbs: capabilities.operations.clone(),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<DynamicObject>, StoreError> {
        let Some(name) = key.name.as_deref() else {
            return Err(StoreError::InvalidKey(format!("{} has no name", key)));
        };
        let (resource, scope) = self.resolve(key).await?;
        let object = self
            .api(key, &resource, &scope)
            .get_opt(name)
            .await
            .map_err(|source| StoreError::Api {
                key: key.to_string(),
                source,
            })?;
        Ok(object.map(|object| with_types(object, &resource)))
    }

    async fn list(&self, key: &StoreKey) -> Result<Vec<DynamicObject>, StoreError> {
        let (resource, scope) = self.resolve(key).await?;
        let mut params = ListParams::default();
        if let Some(selector) = key.selector_string() {
            params = params.labels(&selector);
        }

        let list = self
            .api(key, &resource, &scope)
            .list(&params)
            .await
            .map_err(|source| StoreError::Api {
                key: key.to_string(),
                source,
            })?;
        tracing::debug!("Listed {} objects for {}", list.items.len(), key);

        Ok(list
            .items
            .into_iter()
            .map(|object| with_types(object, &resource))
            .collect())
    }

    async fn discover(&self) -> Result<Vec<ApiResourceInfo>, StoreError> {
        let discovery = self.discovery().await?;
        Ok(discovery
            .groups()
            .flat_map(|group| group.recommended_resources())
            .map(|(resource, capabilities)| resource_info(&resource, &capabilities))
            .collect())
    }
}
