//! Shared fixtures for integration tests

#![allow(dead_code)]

use kube::core::DynamicObject;
use kubegraph::MemoryStore;
use kubegraph::graph::handler::GraphHandler;
use kubegraph::query::Queryer;
use kubegraph::store::{ObjectStore, StoreKey};
use kubegraph::traversal::{CancelSignal, Traversal};
use std::sync::Arc;

/// Deployment "d" -> ReplicaSet "rs" -> Pods "p1" (running) and "p2"
/// (pending), plus Service "svc" selecting them
pub const SCENARIO: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: d
  namespace: default
  uid: d1
  labels: { app: x }
spec:
  replicas: 2
  selector:
    matchLabels: { app: x }
  template:
    metadata:
      labels: { app: x }
    spec:
      containers:
        - name: app
          image: nginx:1.27
status:
  replicas: 2
  readyReplicas: 2
  availableReplicas: 2
---
apiVersion: apps/v1
kind: ReplicaSet
metadata:
  name: rs
  namespace: default
  uid: rs1
  labels: { app: x, pod-template-hash: 7d9f }
  ownerReferences:
    - apiVersion: apps/v1
      kind: Deployment
      name: d
      uid: d1
      controller: true
spec:
  replicas: 2
  selector:
    matchLabels: { app: x, pod-template-hash: 7d9f }
status:
  replicas: 2
  readyReplicas: 2
---
apiVersion: v1
kind: Pod
metadata:
  name: p1
  namespace: default
  uid: p1
  labels: { app: x, pod-template-hash: 7d9f }
  ownerReferences:
    - apiVersion: apps/v1
      kind: ReplicaSet
      name: rs
      uid: rs1
      controller: true
spec:
  serviceAccountName: web
  containers:
    - name: app
      image: nginx:1.27
status:
  phase: Running
  containerStatuses:
    - name: app
      image: nginx:1.27
      imageID: ""
      ready: true
      restartCount: 0
---
apiVersion: v1
kind: Pod
metadata:
  name: p2
  namespace: default
  uid: p2
  labels: { app: x, pod-template-hash: 7d9f }
  ownerReferences:
    - apiVersion: apps/v1
      kind: ReplicaSet
      name: rs
      uid: rs1
      controller: true
spec:
  containers:
    - name: app
      image: nginx:1.27
status:
  phase: Pending
---
apiVersion: v1
kind: Service
metadata:
  name: svc
  namespace: default
  uid: svc
spec:
  selector: { app: x }
  clusterIP: 10.96.0.12
"#;

/// ServiceAccount used by p1
pub const SERVICE_ACCOUNT: &str = r#"
apiVersion: v1
kind: ServiceAccount
metadata:
  name: web
  namespace: default
  uid: sa-web
"#;

/// Ingress routing to "svc"
pub const INGRESS: &str = r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: shop
  namespace: default
  uid: ing1
spec:
  rules:
    - host: shop.example.com
      http:
        paths:
          - path: /
            pathType: Prefix
            backend:
              service:
                name: svc
                port: { number: 80 }
          - path: /legacy
            pathType: Prefix
            backend:
              service:
                name: gone
                port: { number: 80 }
status:
  loadBalancer:
    ingress:
      - ip: 203.0.113.7
"#;

/// autoscaling/v2 HPA targeting Deployment "d"
pub const AUTOSCALER: &str = r#"
apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: d
  namespace: default
  uid: hpa1
spec:
  minReplicas: 1
  maxReplicas: 5
  scaleTargetRef:
    apiVersion: apps/v1
    kind: Deployment
    name: d
status:
  currentReplicas: 2
  desiredReplicas: 2
"#;

/// Webhook service, a validating webhook configuration with a service
/// backed webhook, a URL webhook and a webhook whose service is gone, and
/// aggregated plus local APIServices
pub const ADMISSION: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: webhook
  namespace: system
  uid: svc-webhook
spec:
  selector: { app: webhook }
---
apiVersion: admissionregistration.k8s.io/v1
kind: ValidatingWebhookConfiguration
metadata:
  name: policy
  uid: vwc1
webhooks:
  - name: validate.policy.example.com
    admissionReviewVersions: [v1]
    sideEffects: None
    clientConfig:
      service:
        namespace: system
        name: webhook
  - name: remote.policy.example.com
    admissionReviewVersions: [v1]
    sideEffects: None
    clientConfig:
      url: https://policy.example.com/validate
  - name: stale.policy.example.com
    admissionReviewVersions: [v1]
    sideEffects: None
    clientConfig:
      service:
        namespace: system
        name: removed
---
apiVersion: admissionregistration.k8s.io/v1
kind: MutatingWebhookConfiguration
metadata:
  name: defaults
  uid: mwc1
webhooks:
  - name: default.policy.example.com
    admissionReviewVersions: [v1]
    sideEffects: None
    clientConfig:
      service:
        namespace: system
        name: webhook
---
apiVersion: apiregistration.k8s.io/v1
kind: APIService
metadata:
  name: v1beta1.metrics.k8s.io
  uid: api-metrics
spec:
  group: metrics.k8s.io
  version: v1beta1
  groupPriorityMinimum: 100
  versionPriority: 100
  service:
    namespace: system
    name: webhook
---
apiVersion: apiregistration.k8s.io/v1
kind: APIService
metadata:
  name: v1.apps
  uid: api-apps
spec:
  group: apps
  version: v1
  groupPriorityMinimum: 17800
  versionPriority: 15
"#;

/// Join fixture documents into one manifest
pub fn manifests(parts: &[&str]) -> String {
    parts.join("\n---\n")
}

pub fn store(parts: &[&str]) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_yaml(&manifests(parts)).expect("fixtures parse"))
}

/// Fetch an object the store holds
pub async fn fetch(
    store: &MemoryStore,
    namespace: Option<&str>,
    api_version: &str,
    kind: &str,
    name: &str,
) -> DynamicObject {
    store
        .get(&StoreKey::named(namespace, api_version, kind, name))
        .await
        .expect("store get")
        .unwrap_or_else(|| panic!("{} {} not in fixtures", kind, name))
}

/// A fresh traversal session over `store`
pub fn session(store: Arc<MemoryStore>, cancel: CancelSignal) -> (Arc<Traversal>, Arc<GraphHandler>) {
    let handler = Arc::new(GraphHandler::new());
    let queryer = Arc::new(Queryer::new(store));
    (Traversal::new(queryer, Arc::clone(&handler), cancel), handler)
}
