//! Object health evaluation
//!
//! Graph nodes carry a severity plus human readable details and properties.
//! [`StatusEvaluator`] is the seam the graph handler calls while building
//! nodes; [`BasicStatusEvaluator`] implements it from the object alone,
//! without further API calls.

pub mod workload;

use crate::error::{GraphError, GraphResult};
use crate::models::ObjectKind;
use crate::models::object;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a node, ordered from best to worst
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Label/value pair shown alongside a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub label: String,
    pub value: String,
}

impl Property {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Result of evaluating one object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectStatus {
    pub severity: Severity,
    pub details: Vec<String>,
    pub properties: Vec<Property>,
}

impl ObjectStatus {
    pub fn ok() -> Self {
        Self::default()
    }
}

/// Computes the health of an object
pub trait StatusEvaluator: Send + Sync {
    fn status(&self, object: &DynamicObject) -> GraphResult<ObjectStatus>;
}

/// Kind-aware evaluator working from the object's own status fields
///
/// Kinds without a dedicated rule fall back to the `Ready` condition, which
/// most controllers and CRDs publish.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicStatusEvaluator;

impl StatusEvaluator for BasicStatusEvaluator {
    fn status(&self, object: &DynamicObject) -> GraphResult<ObjectStatus> {
        let status = match object::object_kind(object) {
            Some(ObjectKind::Pod) => pod_status(&typed(object)?),
            Some(ObjectKind::Service) => service_status(&typed(object)?),
            Some(ObjectKind::Ingress) => ingress_status(&typed(object)?),
            Some(ObjectKind::Deployment) => workload::deployment(&typed(object)?),
            Some(ObjectKind::ReplicaSet) => workload::replica_set(&typed(object)?),
            Some(ObjectKind::StatefulSet) => workload::stateful_set(&typed(object)?),
            Some(ObjectKind::DaemonSet) => workload::daemon_set(&typed(object)?),
            Some(ObjectKind::Job) => workload::job(&typed(object)?),
            Some(ObjectKind::CronJob) => workload::cron_job(&typed(object)?),
            Some(ObjectKind::HorizontalPodAutoscaler) => autoscaler_status(object),
            _ => ready_condition_status(object),
        };
        Ok(status)
    }
}

fn typed<K: DeserializeOwned>(object: &DynamicObject) -> GraphResult<K> {
    object::to_typed(object).map_err(|e| GraphError::Status {
        object: object::describe(object),
        message: e.to_string(),
    })
}

const FAILING_WAIT_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
    "CreateContainerConfigError",
    "InvalidImageName",
];

fn pod_status(pod: &Pod) -> ObjectStatus {
    let mut status = ObjectStatus::ok();
    let pod_status = pod.status.as_ref();
    let phase = pod_status
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown");
    status.properties.push(Property::new("Phase", phase));

    let containers = pod_status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|c| c.as_slice())
        .unwrap_or_default();
    let restarts: i32 = containers.iter().map(|c| c.restart_count).sum();
    status
        .properties
        .push(Property::new("Restarts", restarts.to_string()));

    status.severity = match phase {
        "Running" | "Succeeded" => Severity::Ok,
        "Failed" => Severity::Error,
        _ => Severity::Warning,
    };
    if phase == "Running" && containers.iter().any(|c| !c.ready) {
        status.severity = Severity::Warning;
        status.details.push("Not all containers are ready".to_string());
    }

    for container in containers {
        let waiting = container
            .state
            .as_ref()
            .and_then(|state| state.waiting.as_ref());
        if let Some(reason) = waiting.and_then(|w| w.reason.as_deref())
            && FAILING_WAIT_REASONS.contains(&reason)
        {
            status.severity = Severity::Error;
            status
                .details
                .push(format!("{}: {}", container.name, reason));
        }
    }
    status
}

fn service_status(service: &Service) -> ObjectStatus {
    let mut status = ObjectStatus::ok();
    if let Some(spec) = service.spec.as_ref() {
        status.properties.push(Property::new(
            "Type",
            spec.type_.as_deref().unwrap_or("ClusterIP"),
        ));
        if let Some(ip) = spec.cluster_ip.as_deref() {
            status.properties.push(Property::new("Cluster IP", ip));
        }
    }
    status
}

fn ingress_status(ingress: &Ingress) -> ObjectStatus {
    let mut status = ObjectStatus::ok();
    let hosts: Vec<&str> = ingress
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.host.as_deref())
        .collect();
    if !hosts.is_empty() {
        status.properties.push(Property::new("Hosts", hosts.join(", ")));
    }

    let addresses: Vec<&str> = ingress
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|lb| lb.ip.as_deref().or(lb.hostname.as_deref()))
        .collect();
    if addresses.is_empty() {
        status.details.push("No load balancer address assigned".to_string());
    } else {
        status
            .properties
            .push(Property::new("Address", addresses.join(", ")));
    }
    status
}

/// autoscaling/v1 and v2 share the replica fields this reads
fn autoscaler_status(object: &DynamicObject) -> ObjectStatus {
    let mut status = ObjectStatus::ok();
    let field = |name: &str| {
        object
            .data
            .get("status")
            .and_then(|s| s.get(name))
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    };
    status.properties.push(Property::new(
        "Replicas",
        format!("{}/{}", field("currentReplicas"), field("desiredReplicas")),
    ));

    for condition in conditions(object) {
        if condition.type_ == "ScalingActive" && condition.status == "False" {
            status.severity = Severity::Warning;
            status.details.push(condition.message.unwrap_or_default());
        }
    }
    status
}

fn ready_condition_status(object: &DynamicObject) -> ObjectStatus {
    let mut status = ObjectStatus::ok();
    if let Some(ready) = conditions(object).into_iter().find(|c| c.type_ == "Ready") {
        status.severity = match ready.status.as_str() {
            "True" => Severity::Ok,
            "False" => Severity::Error,
            _ => Severity::Warning,
        };
        if let Some(message) = ready.message.filter(|m| !m.is_empty()) {
            status.details.push(message);
        }
    }
    status
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    type_: String,
    status: String,
    #[serde(default)]
    message: Option<String>,
}

fn conditions(object: &DynamicObject) -> Vec<Condition> {
    object
        .data
        .get("status")
        .and_then(|s| s.get("conditions"))
        .and_then(|c| serde_json::from_value(c.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(
            [Severity::Warning, Severity::Error, Severity::Ok]
                .into_iter()
                .max(),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_crash_looping_pod_is_error() {
        let pod = object(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "web-1", "namespace": "default" },
            "status": {
                "phase": "Running",
                "containerStatuses": [{
                    "name": "web",
                    "image": "web:1",
                    "imageID": "",
                    "ready": false,
                    "restartCount": 7,
                    "state": { "waiting": { "reason": "CrashLoopBackOff" } }
                }]
            }
        }));

        let status = BasicStatusEvaluator.status(&pod).unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert!(status.details.contains(&"web: CrashLoopBackOff".to_string()));
        assert!(status.properties.contains(&Property::new("Restarts", "7")));
    }

    #[test]
    fn test_pending_pod_is_warning() {
        let pod = object(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "web-2", "namespace": "default" },
            "status": { "phase": "Pending" }
        }));
        assert_eq!(
            BasicStatusEvaluator.status(&pod).unwrap().severity,
            Severity::Warning
        );
    }

    #[test]
    fn test_ready_condition_fallback() {
        let custom = object(json!({
            "apiVersion": "example.com/v1",
            "kind": "Database",
            "metadata": { "name": "orders", "namespace": "default" },
            "status": { "conditions": [{
                "type": "Ready",
                "status": "False",
                "message": "connection refused"
            }]}
        }));

        let status = BasicStatusEvaluator.status(&custom).unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.details, vec!["connection refused"]);
    }

    #[test]
    fn test_object_without_status_is_ok() {
        let config_map = object(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "settings", "namespace": "default" }
        }));
        assert_eq!(BasicStatusEvaluator.status(&config_map).unwrap(), ObjectStatus::ok());
    }
}
