//! Dashboard paths for graph nodes

use crate::models::ObjectKind;
use crate::models::object::{self, plural};
use kube::core::DynamicObject;

/// Produces the dashboard path a node links to
pub trait LinkGenerator: Send + Sync {
    fn path_for(&self, object: &DynamicObject) -> Option<String>;
}

/// Content paths grouped into dashboard sections
///
/// Namespaced objects live under `/overview/namespace/<ns>/<section>/...`,
/// cluster-scoped ones under `/cluster-overview/<section>/...`.
#[derive(Debug, Clone, Default)]
pub struct DashboardLinks {
    prefix: String,
}

impl DashboardLinks {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    fn section(object: &DynamicObject) -> &'static str {
        match object::object_kind(object) {
            Some(
                ObjectKind::Pod
                | ObjectKind::ReplicationController
                | ObjectKind::Deployment
                | ObjectKind::ReplicaSet
                | ObjectKind::StatefulSet
                | ObjectKind::DaemonSet
                | ObjectKind::Job
                | ObjectKind::CronJob,
            ) => "workloads",
            Some(ObjectKind::Service | ObjectKind::Ingress) => "discovery-and-load-balancing",
            Some(ObjectKind::ServiceAccount) => "rbac",
            Some(ObjectKind::HorizontalPodAutoscaler) => "autoscaling",
            Some(
                ObjectKind::ApiService
                | ObjectKind::MutatingWebhookConfiguration
                | ObjectKind::ValidatingWebhookConfiguration,
            ) => "api-extensions",
            None => match object::kind(object) {
                "ConfigMap" | "Secret" | "PersistentVolumeClaim" => "config-and-storage",
                _ => "custom-resources",
            },
        }
    }
}

impl LinkGenerator for DashboardLinks {
    fn path_for(&self, object: &DynamicObject) -> Option<String> {
        let kind = object::kind(object);
        let name = object.metadata.name.as_deref()?;
        if kind.is_empty() {
            return None;
        }

        let section = Self::section(object);
        let resource = if section == "custom-resources" {
            let (group, version) = object::split_api_version(object::api_version(object));
            format!("{}/{}/{}", group, version, kind)
        } else {
            plural(kind)
        };

        let path = match object::namespace(object) {
            Some(ns) => format!(
                "{}/overview/namespace/{}/{}/{}/{}",
                self.prefix, ns, section, resource, name
            ),
            None => format!(
                "{}/cluster-overview/{}/{}/{}",
                self.prefix, section, resource, name
            ),
        };
        Some(path)
    }
}
