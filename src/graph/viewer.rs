//! Resource graph facade
//!
//! Runs a complete build for a set of root objects: traverse, finalize the
//! collected edges, then materialize nodes with status and links.

use super::ResourceGraph;
use super::handler::GraphHandler;
use crate::error::GraphResult;
use crate::link::LinkGenerator;
use crate::models::object;
use crate::query::Queryer;
use crate::status::StatusEvaluator;
use crate::store::ObjectStore;
use crate::traversal::{CancelSignal, TaskGroup, Traversal};
use kube::core::DynamicObject;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Build options
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Traversals running longer than this are reported, never aborted
    pub warn_after: Duration,
    /// Expand owned descendants of the roots
    pub visit_descendants: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            warn_after: Duration::from_secs(5),
            visit_descendants: true,
        }
    }
}

/// Builds relationship graphs against one object store
pub struct ResourceViewer {
    store: Arc<dyn ObjectStore>,
    status: Arc<dyn StatusEvaluator>,
    links: Arc<dyn LinkGenerator>,
    options: ViewerOptions,
}

impl ResourceViewer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        status: Arc<dyn StatusEvaluator>,
        links: Arc<dyn LinkGenerator>,
        options: ViewerOptions,
    ) -> Self {
        Self {
            store,
            status,
            links,
            options,
        }
    }

    /// Build the graph around `roots`
    ///
    /// Every call starts from an empty cache and an empty graph. A
    /// cancelled build still returns whatever was collected before the
    /// signal; a failed build returns the error and no graph.
    pub async fn build(
        &self,
        roots: Vec<DynamicObject>,
        cancel: CancelSignal,
    ) -> GraphResult<ResourceGraph> {
        let queryer = Arc::new(Queryer::new(Arc::clone(&self.store)));
        let handler = Arc::new(GraphHandler::new());
        let traversal = Traversal::new(queryer, Arc::clone(&handler), cancel);

        let started = Instant::now();
        let mut group = TaskGroup::new();
        for root in roots {
            tracing::debug!("Building graph from {}", object::describe(&root));
            group.spawn(traversal.visit(root, self.options.visit_descendants, 0));
        }

        let join = group.join();
        tokio::pin!(join);
        match tokio::time::timeout(self.options.warn_after, &mut join).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "Graph traversal still running after {:?} ({} objects visited)",
                    self.options.warn_after,
                    traversal.visited_count()
                );
                join.await?;
            }
        }
        tracing::debug!(
            "Visited {} objects in {:?}",
            traversal.visited_count(),
            started.elapsed()
        );

        handler.finalize()?;
        let nodes = handler.nodes(self.status.as_ref(), self.links.as_ref())?;
        Ok(ResourceGraph {
            nodes,
            adjacency: handler.adjacency_list(),
        })
    }
}
