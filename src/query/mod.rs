//! Relationship queries with per-build memoization
//!
//! The Queryer answers "what is related to this object" questions on top of
//! an [`ObjectStore`]. Every answer is cached for the lifetime of the
//! Queryer, so an object reached through several paths costs one round of
//! store calls. Concurrent misses on the same key wait on one shared cell
//! and issue a single store call. The cache lock is never held while the
//! store is queried.

pub mod selector;

use crate::error::{GraphError, GraphResult};
use crate::models::ObjectKind;
use crate::models::object;
use crate::store::{ApiResourceInfo, ObjectStore, StoreKey};
use futures::future::try_join_all;
use k8s_openapi::api::admissionregistration::v1::WebhookClientConfig;
use k8s_openapi::api::autoscaling::v2::CrossVersionObjectReference;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::core::DynamicObject;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

/// Cache key for memoized list answers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum QueryKey {
    Children(String),
    PodsForService(String),
    ServicesForPod(String),
    ServicesForIngress(String),
    IngressesForService(String),
    Listing(StoreKey),
}

/// A memoized answer, filled by whichever caller misses first
type Slot<T> = Arc<OnceCell<T>>;

#[derive(Default)]
struct QueryCache {
    lists: HashMap<QueryKey, Slot<Vec<DynamicObject>>>,
    objects: HashMap<StoreKey, Slot<Option<DynamicObject>>>,
}

/// Memoizing relationship query facade over an object store
pub struct Queryer {
    store: Arc<dyn ObjectStore>,
    cache: RwLock<QueryCache>,
    resources: OnceCell<Arc<Vec<ApiResourceInfo>>>,
}

impl Queryer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(QueryCache::default()),
            resources: OnceCell::new(),
        }
    }

    /// Objects whose controller owner reference points at `owner`
    ///
    /// Lists every namespaced kind the cluster can list and watch, one
    /// request per kind, all in flight at once. Any failing kind fails the
    /// whole call.
    pub async fn children(&self, owner: &DynamicObject) -> GraphResult<Vec<DynamicObject>> {
        let owner_uid = required_uid(owner)?.to_string();
        let namespace = object::namespace(owner);

        self.memoized(QueryKey::Children(owner_uid.clone()), async {
            let resources = self.resources().await?;
            let listings = resources
                .iter()
                .filter(|resource| resource.can_own_children())
                .map(|resource| {
                    self.list(StoreKey::list(
                        namespace,
                        &resource.api_version,
                        &resource.kind,
                    ))
                });

            let children: Vec<DynamicObject> = try_join_all(listings)
                .await?
                .into_iter()
                .flatten()
                .filter(|candidate| object::is_controlled_by(candidate, &owner_uid))
                .collect();
            tracing::debug!(
                "Found {} children of {}",
                children.len(),
                object::describe(owner)
            );
            Ok(children)
        })
        .await
    }

    /// Pods in the service's namespace selected by its selector
    pub async fn pods_for_service(&self, service: &Service) -> GraphResult<Vec<DynamicObject>> {
        let uid = meta_uid(&service.metadata, ObjectKind::Service)?;
        let selector = service
            .spec
            .as_ref()
            .and_then(|spec| spec.selector.clone())
            .unwrap_or_default();
        let namespace = service.metadata.namespace.as_deref();

        self.memoized(QueryKey::PodsForService(uid), async {
            let normalized = selector::normalized(&selector);
            if normalized.is_empty() {
                return Ok(Vec::new());
            }
            // Services whose selectors differ only by injected keys share this listing
            let key = StoreKey::list(namespace, "v1", ObjectKind::Pod.as_str())
                .with_selector(normalized);
            let pods = self.list(key).await?;
            Ok(pods
                .into_iter()
                .filter(|pod| selector::matches(&selector, &labels_of(pod)))
                .collect())
        })
        .await
    }

    /// Services in the pod's namespace whose selector matches the pod
    pub async fn services_for_pod(&self, pod: &Pod) -> GraphResult<Vec<DynamicObject>> {
        let uid = meta_uid(&pod.metadata, ObjectKind::Pod)?;
        let labels = pod.metadata.labels.clone().unwrap_or_default();
        let namespace = pod.metadata.namespace.as_deref();

        self.memoized(QueryKey::ServicesForPod(uid), async {
            let services = self
                .list(StoreKey::list(namespace, "v1", ObjectKind::Service.as_str()))
                .await?;
            let mut selecting = Vec::new();
            for service in services {
                let typed: Service = object::to_typed(&service)?;
                let selector = typed
                    .spec
                    .and_then(|spec| spec.selector)
                    .unwrap_or_default();
                if selector::matches(&selector, &labels) {
                    selecting.push(service);
                }
            }
            Ok(selecting)
        })
        .await
    }

    /// Services referenced by the ingress default backend and rule backends
    ///
    /// Backends naming a Service that does not exist are skipped.
    pub async fn services_for_ingress(&self, ingress: &Ingress) -> GraphResult<Vec<DynamicObject>> {
        let uid = meta_uid(&ingress.metadata, ObjectKind::Ingress)?;
        let namespace = ingress.metadata.namespace.clone().unwrap_or_default();
        let names = backend_service_names(ingress);

        self.memoized(QueryKey::ServicesForIngress(uid), async {
            let lookups = names.iter().map(|name| self.service(&namespace, name));
            Ok(try_join_all(lookups).await?.into_iter().flatten().collect())
        })
        .await
    }

    /// Ingresses in the service's namespace with a backend naming the service
    pub async fn ingresses_for_service(
        &self,
        service: &Service,
    ) -> GraphResult<Vec<DynamicObject>> {
        let uid = meta_uid(&service.metadata, ObjectKind::Service)?;
        let name = service.metadata.name.clone().unwrap_or_default();
        let namespace = service.metadata.namespace.as_deref();

        self.memoized(QueryKey::IngressesForService(uid), async {
            let ingresses = self
                .list(StoreKey::list(
                    namespace,
                    ObjectKind::Ingress.api_version(),
                    ObjectKind::Ingress.as_str(),
                ))
                .await?;
            let mut referencing = Vec::new();
            for ingress in ingresses {
                let typed: Ingress = object::to_typed(&ingress)?;
                if backend_service_names(&typed).contains(&name) {
                    referencing.push(ingress);
                }
            }
            Ok(referencing)
        })
        .await
    }

    /// Resolve an owner reference to the owning object
    ///
    /// Returns `None` when the owner does not exist or when the stored
    /// object carries a different UID than the reference (the owner was
    /// deleted and recreated). A stored object without UID or kind is a
    /// malformed store answer.
    pub async fn owner_reference(
        &self,
        namespace: Option<&str>,
        owner: &OwnerReference,
    ) -> GraphResult<Option<DynamicObject>> {
        let key = StoreKey::named(namespace, &owner.api_version, &owner.kind, &owner.name);
        let Some(found) = self.get(key).await? else {
            return Ok(None);
        };

        let Some(found_uid) = object::uid(&found) else {
            return Err(GraphError::MalformedObject(format!(
                "owner {} {} has no uid",
                owner.kind, owner.name
            )));
        };
        if object::kind(&found).is_empty() {
            return Err(GraphError::MalformedObject(format!(
                "owner {} has no kind",
                owner.name
            )));
        }
        if found_uid != owner.uid {
            tracing::warn!(
                "Owner reference to {} {} is stale (uid {} != {})",
                owner.kind,
                owner.name,
                owner.uid,
                found_uid
            );
            return Ok(None);
        }
        Ok(Some(found))
    }

    /// Object named by an autoscaler's `spec.scaleTargetRef`
    pub async fn scale_target(&self, hpa: &DynamicObject) -> GraphResult<Option<DynamicObject>> {
        let Some(reference) = hpa.data.get("spec").and_then(|s| s.get("scaleTargetRef")) else {
            return Ok(None);
        };
        let target: CrossVersionObjectReference = serde_json::from_value(reference.clone())
            .map_err(|source| GraphError::Conversion {
                kind: object::kind(hpa).to_string(),
                name: object::name(hpa).to_string(),
                source,
            })?;

        let api_version = match target.api_version {
            Some(api_version) => api_version,
            None => match ObjectKind::parse_optional(&target.kind) {
                Some(known) => known.api_version().to_string(),
                None => {
                    return Err(GraphError::MalformedObject(format!(
                        "scale target {} of {} has no apiVersion",
                        target.kind,
                        object::describe(hpa)
                    )));
                }
            },
        };

        self.get(StoreKey::named(
            object::namespace(hpa),
            &api_version,
            &target.kind,
            &target.name,
        ))
        .await
    }

    /// Service a webhook calls, or `None` for URL-based webhooks and missing services
    pub async fn service_for_webhook_client_config(
        &self,
        config: &WebhookClientConfig,
    ) -> GraphResult<Option<DynamicObject>> {
        match &config.service {
            Some(reference) => self.service(&reference.namespace, &reference.name).await,
            None => Ok(None),
        }
    }

    /// Service by namespace and name
    pub async fn service(&self, namespace: &str, name: &str) -> GraphResult<Option<DynamicObject>> {
        self.get(StoreKey::named(
            Some(namespace),
            "v1",
            ObjectKind::Service.as_str(),
            name,
        ))
        .await
    }

    /// ServiceAccount the pod runs as, if named and present
    pub async fn service_account_for_pod(&self, pod: &Pod) -> GraphResult<Option<DynamicObject>> {
        let name = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.service_account_name.as_deref())
            .filter(|name| !name.is_empty());
        let Some(name) = name else {
            return Ok(None);
        };
        self.get(StoreKey::named(
            pod.metadata.namespace.as_deref(),
            "v1",
            ObjectKind::ServiceAccount.as_str(),
            name,
        ))
        .await
    }

    /// Run `compute` once per key; a failed computation is not cached
    async fn memoized<F>(&self, key: QueryKey, compute: F) -> GraphResult<Vec<DynamicObject>>
    where
        F: Future<Output = GraphResult<Vec<DynamicObject>>>,
    {
        let slot = self.list_slot(key).await;
        slot.get_or_try_init(|| compute).await.cloned()
    }

    async fn list_slot(&self, key: QueryKey) -> Slot<Vec<DynamicObject>> {
        let existing = self.cache.read().await.lists.get(&key).cloned();
        match existing {
            Some(slot) => slot,
            None => Arc::clone(self.cache.write().await.lists.entry(key).or_default()),
        }
    }

    async fn list(&self, key: StoreKey) -> GraphResult<Vec<DynamicObject>> {
        let store = Arc::clone(&self.store);
        let listing = QueryKey::Listing(key.clone());
        self.memoized(listing, async move { Ok(store.list(&key).await?) })
            .await
    }

    async fn get(&self, key: StoreKey) -> GraphResult<Option<DynamicObject>> {
        let existing = self.cache.read().await.objects.get(&key).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(
                self.cache
                    .write()
                    .await
                    .objects
                    .entry(key.clone())
                    .or_default(),
            ),
        };

        slot.get_or_try_init(|| async {
            let found = self.store.get(&key).await?;
            if found.is_none() {
                tracing::debug!("{} not found", key);
            }
            Ok::<_, GraphError>(found)
        })
        .await
        .cloned()
    }

    async fn resources(&self) -> GraphResult<Arc<Vec<ApiResourceInfo>>> {
        self.resources
            .get_or_try_init(|| async {
                let resources = self.store.discover().await?;
                Ok::<_, GraphError>(Arc::new(resources))
            })
            .await
            .cloned()
    }
}

/// Names of every Service an ingress routes to
pub fn backend_service_names(ingress: &Ingress) -> BTreeSet<String> {
    let Some(spec) = ingress.spec.as_ref() else {
        return BTreeSet::new();
    };

    let default_backend = spec.default_backend.iter();
    let rule_backends = spec
        .rules
        .iter()
        .flatten()
        .filter_map(|rule| rule.http.as_ref())
        .flat_map(|http| http.paths.iter().map(|path| &path.backend));

    default_backend
        .chain(rule_backends)
        .filter_map(|backend| backend.service.as_ref())
        .map(|service| service.name.clone())
        .collect()
}

fn labels_of(object: &DynamicObject) -> BTreeMap<String, String> {
    object.metadata.labels.clone().unwrap_or_default()
}

fn required_uid(object: &DynamicObject) -> GraphResult<&str> {
    object::uid(object)
        .ok_or_else(|| GraphError::InvalidObject(format!("{} has no uid", object::describe(object))))
}

fn meta_uid(meta: &ObjectMeta, kind: ObjectKind) -> GraphResult<String> {
    meta.uid.clone().filter(|uid| !uid.is_empty()).ok_or_else(|| {
        GraphError::InvalidObject(format!(
            "{} {} has no uid",
            kind,
            meta.name.as_deref().unwrap_or("")
        ))
    })
}
