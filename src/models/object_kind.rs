//! Well-known Kubernetes object kinds
//!
//! Centralizes the kinds the graph builder reasons about, so visitors, the
//! status evaluator and the CLI never compare against scattered string
//! literals.

use std::fmt;
use std::str::FromStr;

/// Enumeration of the object kinds with dedicated handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    // Core
    Pod,
    Service,
    ServiceAccount,
    ReplicationController,
    // Apps
    Deployment,
    ReplicaSet,
    StatefulSet,
    DaemonSet,
    // Batch
    Job,
    CronJob,
    // Networking
    Ingress,
    // Autoscaling
    HorizontalPodAutoscaler,
    // API extension points
    ApiService,
    MutatingWebhookConfiguration,
    ValidatingWebhookConfiguration,
}

impl ObjectKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Pod => "Pod",
            ObjectKind::Service => "Service",
            ObjectKind::ServiceAccount => "ServiceAccount",
            ObjectKind::ReplicationController => "ReplicationController",
            ObjectKind::Deployment => "Deployment",
            ObjectKind::ReplicaSet => "ReplicaSet",
            ObjectKind::StatefulSet => "StatefulSet",
            ObjectKind::DaemonSet => "DaemonSet",
            ObjectKind::Job => "Job",
            ObjectKind::CronJob => "CronJob",
            ObjectKind::Ingress => "Ingress",
            ObjectKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ObjectKind::ApiService => "APIService",
            ObjectKind::MutatingWebhookConfiguration => "MutatingWebhookConfiguration",
            ObjectKind::ValidatingWebhookConfiguration => "ValidatingWebhookConfiguration",
        }
    }

    /// Preferred apiVersion for this kind
    pub fn api_version(&self) -> &'static str {
        match self {
            ObjectKind::Pod
            | ObjectKind::Service
            | ObjectKind::ServiceAccount
            | ObjectKind::ReplicationController => "v1",
            ObjectKind::Deployment
            | ObjectKind::ReplicaSet
            | ObjectKind::StatefulSet
            | ObjectKind::DaemonSet => "apps/v1",
            ObjectKind::Job | ObjectKind::CronJob => "batch/v1",
            ObjectKind::Ingress => "networking.k8s.io/v1",
            ObjectKind::HorizontalPodAutoscaler => "autoscaling/v2",
            ObjectKind::ApiService => "apiregistration.k8s.io/v1",
            ObjectKind::MutatingWebhookConfiguration
            | ObjectKind::ValidatingWebhookConfiguration => "admissionregistration.k8s.io/v1",
        }
    }

    /// Whether objects of this kind live outside namespaces
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            ObjectKind::ApiService
                | ObjectKind::MutatingWebhookConfiguration
                | ObjectKind::ValidatingWebhookConfiguration
        )
    }

    /// ReplicaSet-like controllers whose zero-replica instances are left out of the graph
    pub fn is_replica_set_family(&self) -> bool {
        matches!(
            self,
            ObjectKind::ReplicaSet | ObjectKind::ReplicationController
        )
    }

    /// Try to parse a string into an ObjectKind, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Get all well-known kinds
    pub fn all() -> &'static [Self] {
        &[
            ObjectKind::Pod,
            ObjectKind::Service,
            ObjectKind::ServiceAccount,
            ObjectKind::ReplicationController,
            ObjectKind::Deployment,
            ObjectKind::ReplicaSet,
            ObjectKind::StatefulSet,
            ObjectKind::DaemonSet,
            ObjectKind::Job,
            ObjectKind::CronJob,
            ObjectKind::Ingress,
            ObjectKind::HorizontalPodAutoscaler,
            ObjectKind::ApiService,
            ObjectKind::MutatingWebhookConfiguration,
            ObjectKind::ValidatingWebhookConfiguration,
        ]
    }

    /// Try to parse a string (case-insensitive, kubectl short names allowed)
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pod" | "pods" | "po" => Some(ObjectKind::Pod),
            "service" | "services" | "svc" => Some(ObjectKind::Service),
            "serviceaccount" | "serviceaccounts" | "sa" => Some(ObjectKind::ServiceAccount),
            "replicationcontroller" | "replicationcontrollers" | "rc" => {
                Some(ObjectKind::ReplicationController)
            }
            "deployment" | "deployments" | "deploy" => Some(ObjectKind::Deployment),
            "replicaset" | "replicasets" | "rs" => Some(ObjectKind::ReplicaSet),
            "statefulset" | "statefulsets" | "sts" => Some(ObjectKind::StatefulSet),
            "daemonset" | "daemonsets" | "ds" => Some(ObjectKind::DaemonSet),
            "job" | "jobs" => Some(ObjectKind::Job),
            "cronjob" | "cronjobs" | "cj" => Some(ObjectKind::CronJob),
            "ingress" | "ingresses" | "ing" => Some(ObjectKind::Ingress),
            "horizontalpodautoscaler" | "horizontalpodautoscalers" | "hpa" => {
                Some(ObjectKind::HorizontalPodAutoscaler)
            }
            "apiservice" | "apiservices" => Some(ObjectKind::ApiService),
            "mutatingwebhookconfiguration" | "mutatingwebhookconfigurations" => {
                Some(ObjectKind::MutatingWebhookConfiguration)
            }
            "validatingwebhookconfiguration" | "validatingwebhookconfigurations" => {
                Some(ObjectKind::ValidatingWebhookConfiguration)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown object kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(ObjectKind::Pod.as_str(), "Pod");
        assert_eq!(ObjectKind::ApiService.as_str(), "APIService");
        assert_eq!(
            ObjectKind::HorizontalPodAutoscaler.as_str(),
            "HorizontalPodAutoscaler"
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            ObjectKind::parse_optional("ReplicaSet"),
            Some(ObjectKind::ReplicaSet)
        );
        assert_eq!(
            ObjectKind::parse_optional("APIService"),
            Some(ObjectKind::ApiService)
        );
        assert_eq!(ObjectKind::parse_optional("replicaset"), None);
        assert_eq!(ObjectKind::parse_optional("ConfigMap"), None);
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!(
            ObjectKind::from_str_case_insensitive("deploy"),
            Some(ObjectKind::Deployment)
        );
        assert_eq!(
            ObjectKind::from_str_case_insensitive("SVC"),
            Some(ObjectKind::Service)
        );
        assert_eq!(
            ObjectKind::from_str_case_insensitive("hpa"),
            Some(ObjectKind::HorizontalPodAutoscaler)
        );
        assert_eq!(ObjectKind::from_str_case_insensitive("configmap"), None);
    }

    #[test]
    fn test_replica_set_family() {
        assert!(ObjectKind::ReplicaSet.is_replica_set_family());
        assert!(ObjectKind::ReplicationController.is_replica_set_family());
        assert!(!ObjectKind::Deployment.is_replica_set_family());
    }

    #[test]
    fn test_every_kind_round_trips_through_from_str() {
        for kind in ObjectKind::all() {
            assert_eq!(ObjectKind::parse_optional(kind.as_str()), Some(*kind));
        }
    }
}
