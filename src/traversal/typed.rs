//! Kind-specific relationships
//!
//! The supported kinds form a closed set. [`VisitorRegistry`] maps each
//! GroupVersionKind to its variant so dispatch is a table lookup, and
//! [`TypedVisitor::all`] lists every kind with dedicated handling.

use super::{Direction, TaskGroup, Traversal};
use crate::error::GraphResult;
use crate::models::ObjectKind;
use crate::models::object::{self, split_api_version};
use futures::future::try_join_all;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration, WebhookClientConfig,
};
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use kube::core::{DynamicObject, GroupVersionKind};
use std::collections::HashMap;
use std::sync::Arc;

/// A kind with relationships beyond ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedVisitor {
    Pod,
    Service,
    Ingress,
    HorizontalPodAutoscaler,
    ApiService,
    MutatingWebhookConfiguration,
    ValidatingWebhookConfiguration,
}

impl TypedVisitor {
    pub fn all() -> &'static [Self] {
        &[
            TypedVisitor::Pod,
            TypedVisitor::Service,
            TypedVisitor::Ingress,
            TypedVisitor::HorizontalPodAutoscaler,
            TypedVisitor::ApiService,
            TypedVisitor::MutatingWebhookConfiguration,
            TypedVisitor::ValidatingWebhookConfiguration,
        ]
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            TypedVisitor::Pod => ObjectKind::Pod,
            TypedVisitor::Service => ObjectKind::Service,
            TypedVisitor::Ingress => ObjectKind::Ingress,
            TypedVisitor::HorizontalPodAutoscaler => ObjectKind::HorizontalPodAutoscaler,
            TypedVisitor::ApiService => ObjectKind::ApiService,
            TypedVisitor::MutatingWebhookConfiguration => ObjectKind::MutatingWebhookConfiguration,
            TypedVisitor::ValidatingWebhookConfiguration => {
                ObjectKind::ValidatingWebhookConfiguration
            }
        }
    }

    /// Every apiVersion the visitor accepts
    pub fn api_versions(&self) -> &'static [&'static str] {
        match self {
            // v1 and v2 autoscalers share spec.scaleTargetRef
            TypedVisitor::HorizontalPodAutoscaler => &["autoscaling/v1", "autoscaling/v2"],
            TypedVisitor::Pod | TypedVisitor::Service => &["v1"],
            TypedVisitor::Ingress => &["networking.k8s.io/v1"],
            TypedVisitor::ApiService => &["apiregistration.k8s.io/v1"],
            TypedVisitor::MutatingWebhookConfiguration
            | TypedVisitor::ValidatingWebhookConfiguration => &["admissionregistration.k8s.io/v1"],
        }
    }

    pub fn gvks(&self) -> Vec<GroupVersionKind> {
        self.api_versions()
            .iter()
            .map(|api_version| {
                let (group, version) = split_api_version(api_version);
                GroupVersionKind::gvk(group, version, self.kind().as_str())
            })
            .collect()
    }

    /// Walk the kind's relationships
    ///
    /// Related objects are visited and their edges recorded at `level`.
    pub async fn visit(
        &self,
        traversal: &Arc<Traversal>,
        object: &DynamicObject,
        visit_descendants: bool,
        level: usize,
    ) -> GraphResult<()> {
        let visit = Visit {
            traversal,
            object,
            visit_descendants,
            level,
        };
        match self {
            TypedVisitor::Pod => visit.pod().await,
            TypedVisitor::Service => visit.service().await,
            TypedVisitor::Ingress => visit.ingress().await,
            TypedVisitor::HorizontalPodAutoscaler => visit.autoscaler().await,
            TypedVisitor::ApiService => visit.api_service().await,
            TypedVisitor::MutatingWebhookConfiguration => {
                let config: MutatingWebhookConfiguration = object::to_typed(object)?;
                let client_configs = config
                    .webhooks
                    .unwrap_or_default()
                    .into_iter()
                    .map(|webhook| webhook.client_config)
                    .collect();
                visit.webhook_services(client_configs).await
            }
            TypedVisitor::ValidatingWebhookConfiguration => {
                let config: ValidatingWebhookConfiguration = object::to_typed(object)?;
                let client_configs = config
                    .webhooks
                    .unwrap_or_default()
                    .into_iter()
                    .map(|webhook| webhook.client_config)
                    .collect();
                visit.webhook_services(client_configs).await
            }
        }
    }
}

/// Arguments shared by every typed visit
struct Visit<'a> {
    traversal: &'a Arc<Traversal>,
    object: &'a DynamicObject,
    visit_descendants: bool,
    level: usize,
}

impl Visit<'_> {
    /// Visit related objects concurrently, recording edges in `direction`
    async fn related(
        &self,
        related: impl IntoIterator<Item = DynamicObject>,
        direction: Direction,
    ) -> GraphResult<()> {
        let mut group = TaskGroup::new();
        for object in related {
            group.spawn(self.traversal.visit_related(
                self.object,
                object,
                direction,
                self.visit_descendants,
                self.level,
                self.level,
            ));
        }
        group.join().await
    }

    /// Services selecting the pod, and the pod's ServiceAccount
    ///
    /// The service side owns the selector, so those edges point
    /// service -> pod.
    async fn pod(&self) -> GraphResult<()> {
        let pod: Pod = object::to_typed(self.object)?;
        let queryer = self.traversal.queryer();
        let (services, account) = tokio::try_join!(
            queryer.services_for_pod(&pod),
            queryer.service_account_for_pod(&pod),
        )?;

        tokio::try_join!(
            self.related(services, Direction::Incoming),
            self.related(account, Direction::Outgoing),
        )?;
        Ok(())
    }

    async fn service(&self) -> GraphResult<()> {
        let service: Service = object::to_typed(self.object)?;
        let queryer = self.traversal.queryer();
        let (pods, ingresses) = tokio::try_join!(
            queryer.pods_for_service(&service),
            queryer.ingresses_for_service(&service),
        )?;

        let mut related = pods;
        related.extend(ingresses);
        self.related(related, Direction::Outgoing).await
    }

    async fn ingress(&self) -> GraphResult<()> {
        let ingress: Ingress = object::to_typed(self.object)?;
        let services = self.traversal.queryer().services_for_ingress(&ingress).await?;
        self.related(services, Direction::Outgoing).await
    }

    async fn autoscaler(&self) -> GraphResult<()> {
        let target = self.traversal.queryer().scale_target(self.object).await?;
        if target.is_none() {
            tracing::debug!(
                "Scale target of {} not found",
                object::describe(self.object)
            );
        }
        self.related(target, Direction::Outgoing).await
    }

    /// Local APIServices have no `spec.service` and relate to nothing
    async fn api_service(&self) -> GraphResult<()> {
        let api_service: APIService = object::to_typed(self.object)?;
        let reference = api_service
            .spec
            .and_then(|spec| spec.service)
            .and_then(|service| Some((service.namespace?, service.name?)));
        let Some((namespace, name)) = reference else {
            return Ok(());
        };

        let service = self.traversal.queryer().service(&namespace, &name).await?;
        self.related(service, Direction::Outgoing).await
    }

    /// URL webhooks and services that no longer exist are skipped
    async fn webhook_services(&self, client_configs: Vec<WebhookClientConfig>) -> GraphResult<()> {
        let queryer = self.traversal.queryer();
        let lookups = client_configs
            .iter()
            .map(|config| queryer.service_for_webhook_client_config(config));
        let services = try_join_all(lookups).await?;
        self.related(services.into_iter().flatten(), Direction::Outgoing)
            .await
    }
}

/// Lookup table from GroupVersionKind to typed visitor
#[derive(Debug, Clone)]
pub struct VisitorRegistry {
    visitors: HashMap<GroupVersionKind, TypedVisitor>,
}

impl Default for VisitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitorRegistry {
    pub fn new() -> Self {
        let visitors = TypedVisitor::all()
            .iter()
            .flat_map(|visitor| visitor.gvks().into_iter().map(move |gvk| (gvk, *visitor)))
            .collect();
        Self { visitors }
    }

    pub fn lookup(&self, object: &DynamicObject) -> Option<TypedVisitor> {
        let (group, version) = split_api_version(object::api_version(object));
        let gvk = GroupVersionKind::gvk(group, version, object::kind(object));
        self.visitors.get(&gvk).copied()
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(api_version: &str, kind: &str) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": { "name": "x", "namespace": "default", "uid": "u" }
        }))
        .unwrap()
    }

    #[test]
    fn test_registry_covers_every_visitor() {
        let registry = VisitorRegistry::new();
        let expected: usize = TypedVisitor::all()
            .iter()
            .map(|visitor| visitor.api_versions().len())
            .sum();
        assert_eq!(registry.len(), expected);
    }

    #[test]
    fn test_lookup() {
        let registry = VisitorRegistry::new();
        assert_eq!(
            registry.lookup(&object("v1", "Pod")),
            Some(TypedVisitor::Pod)
        );
        assert_eq!(
            registry.lookup(&object("autoscaling/v1", "HorizontalPodAutoscaler")),
            Some(TypedVisitor::HorizontalPodAutoscaler)
        );
        assert_eq!(
            registry.lookup(&object("apiregistration.k8s.io/v1", "APIService")),
            Some(TypedVisitor::ApiService)
        );
        assert_eq!(registry.lookup(&object("apps/v1", "Deployment")), None);
        assert_eq!(registry.lookup(&object("example.com/v1", "Pod")), None);
    }
}
