//! Queryer tests: relationship answers and memoization

mod common;

use async_trait::async_trait;
use common::{ADMISSION, INGRESS, SCENARIO, fetch, store};
use k8s_openapi::api::admissionregistration::v1::WebhookClientConfig;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::core::DynamicObject;
use kubegraph::models::object;
use kubegraph::query::Queryer;
use kubegraph::store::{ApiResourceInfo, ObjectStore, StoreError, StoreKey};
use kubegraph::{GraphError, MemoryStore};
use mockall::mock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

mock! {
    pub Store {}

    #[async_trait]
    impl ObjectStore for Store {
        async fn get(&self, key: &StoreKey) -> Result<Option<DynamicObject>, StoreError>;
        async fn list(&self, key: &StoreKey) -> Result<Vec<DynamicObject>, StoreError>;
        async fn discover(&self) -> Result<Vec<ApiResourceInfo>, StoreError>;
    }
}

fn names(objects: &[DynamicObject]) -> Vec<&str> {
    let mut names: Vec<&str> = objects.iter().map(object::name).collect();
    names.sort();
    names
}

async fn typed<K: serde::de::DeserializeOwned>(
    store: &MemoryStore,
    api_version: &str,
    kind: &str,
    name: &str,
) -> K {
    let found = fetch(store, Some("default"), api_version, kind, name).await;
    object::to_typed(&found).unwrap()
}

#[tokio::test]
async fn test_children_are_memoized() {
    let store = store(&[SCENARIO]);
    let d = fetch(&store, Some("default"), "apps/v1", "Deployment", "d").await;
    let rs = fetch(&store, Some("default"), "apps/v1", "ReplicaSet", "rs").await;
    let queryer = Queryer::new(store.clone());

    let children = queryer.children(&d).await.unwrap();
    assert_eq!(names(&children), vec!["rs"]);
    let lists = store.list_calls();
    assert!(lists > 0);

    let again = queryer.children(&d).await.unwrap();
    assert_eq!(names(&again), vec!["rs"]);
    assert_eq!(store.list_calls(), lists);

    // Same namespace and kinds: every listing is already cached
    let pods = queryer.children(&rs).await.unwrap();
    assert_eq!(names(&pods), vec!["p1", "p2"]);
    assert_eq!(store.list_calls(), lists);
    assert_eq!(store.discover_calls(), 1);
}

#[tokio::test]
async fn test_services_sharing_a_selector_share_a_listing() {
    let store = store(&[
        SCENARIO,
        r#"
apiVersion: v1
kind: Service
metadata:
  name: svc-hashed
  namespace: default
spec:
  selector: { app: x, pod-template-hash: 7d9f }
"#,
    ]);
    let plain: Service = typed(&store, "v1", "Service", "svc").await;
    let hashed: Service = typed(&store, "v1", "Service", "svc-hashed").await;
    let queryer = Queryer::new(store.clone());

    let first = queryer.pods_for_service(&plain).await.unwrap();
    let second = queryer.pods_for_service(&hashed).await.unwrap();
    assert_eq!(names(&first), vec!["p1", "p2"]);
    assert_eq!(names(&second), vec!["p1", "p2"]);
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test]
async fn test_empty_selector_selects_nothing() {
    let store = store(&[
        SCENARIO,
        r#"
apiVersion: v1
kind: Service
metadata:
  name: headless
  namespace: default
spec:
  clusterIP: None
"#,
    ]);
    let headless: Service = typed(&store, "v1", "Service", "headless").await;
    let queryer = Queryer::new(store.clone());

    assert!(queryer.pods_for_service(&headless).await.unwrap().is_empty());
    assert_eq!(store.list_calls(), 0);
}

#[tokio::test]
async fn test_services_for_pod() {
    let store = store(&[SCENARIO]);
    let pod: Pod = typed(&store, "v1", "Pod", "p1").await;
    let queryer = Queryer::new(store);

    let services = queryer.services_for_pod(&pod).await.unwrap();
    assert_eq!(names(&services), vec!["svc"]);
}

#[tokio::test]
async fn test_ingress_relationships() {
    let store = store(&[SCENARIO, INGRESS]);
    let ingress: Ingress = typed(&store, "networking.k8s.io/v1", "Ingress", "shop").await;
    let service: Service = typed(&store, "v1", "Service", "svc").await;
    let queryer = Queryer::new(store);

    let services = queryer.services_for_ingress(&ingress).await.unwrap();
    assert_eq!(names(&services), vec!["svc"]);

    let ingresses = queryer.ingresses_for_service(&service).await.unwrap();
    assert_eq!(names(&ingresses), vec!["shop"]);
}

#[tokio::test]
async fn test_owner_reference_resolution() {
    let store = store(&[SCENARIO]);
    let pod = fetch(&store, Some("default"), "v1", "Pod", "p1").await;
    let queryer = Queryer::new(store);

    let reference = object::owner_references(&pod)[0].clone();
    let owner = queryer
        .owner_reference(Some("default"), &reference)
        .await
        .unwrap();
    assert_eq!(owner.as_ref().and_then(object::uid), Some("rs1"));

    let mut stale = reference.clone();
    stale.uid = "rs0".to_string();
    let owner = queryer.owner_reference(Some("default"), &stale).await.unwrap();
    assert!(owner.is_none());

    let mut missing = reference;
    missing.name = "gone".to_string();
    let owner = queryer
        .owner_reference(Some("default"), &missing)
        .await
        .unwrap();
    assert!(owner.is_none());
}

#[tokio::test]
async fn test_owner_without_uid_is_malformed() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_| {
        Ok(Some(
            serde_json::from_value(serde_json::json!({
                "apiVersion": "apps/v1",
                "kind": "ReplicaSet",
                "metadata": { "name": "rs", "namespace": "default" }
            }))
            .unwrap(),
        ))
    });
    let queryer = Queryer::new(Arc::new(store));

    let reference = k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference {
        api_version: "apps/v1".to_string(),
        kind: "ReplicaSet".to_string(),
        name: "rs".to_string(),
        uid: "rs1".to_string(),
        ..Default::default()
    };
    let result = queryer.owner_reference(Some("default"), &reference).await;
    assert!(matches!(result, Err(GraphError::MalformedObject(_))));
}

#[tokio::test]
async fn test_lookups_are_cached() {
    let mut store = MockStore::new();
    store.expect_get().times(1).returning(|_| Ok(None));
    let queryer = Queryer::new(Arc::new(store));

    assert!(queryer.service("default", "svc").await.unwrap().is_none());
    assert!(queryer.service("default", "svc").await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let mut store = MockStore::new();
    store.expect_discover().times(1).returning(|| {
        Ok(vec![ApiResourceInfo {
            api_version: "apps/v1".to_string(),
            kind: "ReplicaSet".to_string(),
            plural: "replicasets".to_string(),
            namespaced: true,
            verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
        }])
    });
    store
        .expect_list()
        .returning(|key| Err(StoreError::InvalidKey(key.to_string())));
    let queryer = Queryer::new(Arc::new(store));

    let owner: DynamicObject = serde_json::from_value(serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": "d", "namespace": "default", "uid": "d1" }
    }))
    .unwrap();

    let result = queryer.children(&owner).await;
    assert!(matches!(
        result,
        Err(GraphError::Store(StoreError::InvalidKey(_)))
    ));
}

#[tokio::test]
async fn test_webhook_client_configs() {
    let store = store(&[ADMISSION]);
    let queryer = Queryer::new(store);

    let by_service: WebhookClientConfig = serde_json::from_value(serde_json::json!({
        "service": { "namespace": "system", "name": "webhook" }
    }))
    .unwrap();
    let by_url: WebhookClientConfig = serde_json::from_value(serde_json::json!({
        "url": "https://policy.example.com/validate"
    }))
    .unwrap();

    let service = queryer
        .service_for_webhook_client_config(&by_service)
        .await
        .unwrap();
    assert_eq!(service.as_ref().and_then(object::uid), Some("svc-webhook"));
    assert!(
        queryer
            .service_for_webhook_client_config(&by_url)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_scale_target_without_api_version_for_unknown_kind() {
    let store = store(&[SCENARIO]);
    let queryer = Queryer::new(store);
    let hpa: DynamicObject = serde_json::from_value(serde_json::json!({
        "apiVersion": "autoscaling/v2",
        "kind": "HorizontalPodAutoscaler",
        "metadata": { "name": "h", "namespace": "default", "uid": "h1" },
        "spec": { "maxReplicas": 3, "scaleTargetRef": { "kind": "Rollout", "name": "d" } }
    }))
    .unwrap();

    let result = queryer.scale_target(&hpa).await;
    assert!(matches!(result, Err(GraphError::MalformedObject(_))));
}

/// Slows every call down so concurrent callers miss the cache together
struct SlowStore {
    inner: Arc<MemoryStore>,
    replica_set_gets: AtomicUsize,
}

#[async_trait]
impl ObjectStore for SlowStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<DynamicObject>, StoreError> {
        if key.kind == "ReplicaSet" {
            self.replica_set_gets.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.get(key).await
    }

    async fn list(&self, key: &StoreKey) -> Result<Vec<DynamicObject>, StoreError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.list(key).await
    }

    async fn discover(&self) -> Result<Vec<ApiResourceInfo>, StoreError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.discover().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_share_one_store_call() {
    let inner = store(&[SCENARIO]);
    let p1 = fetch(&inner, Some("default"), "v1", "Pod", "p1").await;
    let p2 = fetch(&inner, Some("default"), "v1", "Pod", "p2").await;
    let d = fetch(&inner, Some("default"), "apps/v1", "Deployment", "d").await;
    let slow = Arc::new(SlowStore {
        inner: inner.clone(),
        replica_set_gets: AtomicUsize::new(0),
    });
    let queryer = Arc::new(Queryer::new(slow.clone()));

    let owner_of = |pod: DynamicObject| {
        let queryer = Arc::clone(&queryer);
        tokio::spawn(async move {
            let reference = object::owner_references(&pod)[0].clone();
            queryer
                .owner_reference(object::namespace(&pod), &reference)
                .await
        })
    };
    let (first, second) = tokio::join!(owner_of(p1), owner_of(p2));
    let first = first.unwrap().unwrap().unwrap();
    let second = second.unwrap().unwrap().unwrap();
    assert_eq!(object::name(&first), "rs");
    assert_eq!(object::name(&second), "rs");
    assert_eq!(slow.replica_set_gets.load(Ordering::SeqCst), 1);

    let (a, b) = tokio::join!(queryer.children(&d), queryer.children(&d));
    assert_eq!(names(&a.unwrap()), vec!["rs"]);
    assert_eq!(names(&b.unwrap()), vec!["rs"]);
    assert_eq!(inner.discover_calls(), 1);
    let lists = inner.list_calls();

    queryer.children(&d).await.unwrap();
    assert_eq!(inner.list_calls(), lists);
}
