//! Relationship traversal
//!
//! A [`Traversal`] is one graph-building session. It owns the visited set,
//! the visitor registry and the cancellation signal, and it is the single
//! re-entry point every visitor uses to walk to a related object.
//!
//! - `typed.rs` - Kind-specific relationships (Service selects Pods, ...)
//! - `default.rs` - Ownership relationships, run for every object
//! - `group.rs` - Task group used for concurrent recursive visits

mod default;
pub mod group;
pub mod typed;

pub use group::TaskGroup;
pub use typed::{TypedVisitor, VisitorRegistry};

use crate::error::{GraphError, GraphResult};
use crate::graph::handler::GraphHandler;
use crate::models::object;
use crate::query::Queryer;
use futures::FutureExt;
use futures::future::BoxFuture;
use kube::core::DynamicObject;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cooperative cancellation flag shared by every task of a traversal
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which way a recorded edge points relative to the visiting object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// anchor -> related
    Outgoing,
    /// related -> anchor
    Incoming,
}

/// One traversal session
pub struct Traversal {
    queryer: Arc<Queryer>,
    handler: Arc<GraphHandler>,
    registry: VisitorRegistry,
    visited: Mutex<HashSet<String>>,
    cancel: CancelSignal,
}

impl Traversal {
    pub fn new(queryer: Arc<Queryer>, handler: Arc<GraphHandler>, cancel: CancelSignal) -> Arc<Self> {
        Arc::new(Self {
            queryer,
            handler,
            registry: VisitorRegistry::new(),
            visited: Mutex::new(HashSet::new()),
            cancel,
        })
    }

    pub fn queryer(&self) -> &Queryer {
        &self.queryer
    }

    pub fn handler(&self) -> &GraphHandler {
        &self.handler
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of objects visited so far
    pub fn visited_count(&self) -> usize {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Test-and-set on the visited set; true when the UID was not yet present
    fn mark_visited(&self, uid: &str) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uid.to_string())
    }

    /// Visit an object and, recursively, everything related to it
    ///
    /// Returns immediately once the traversal is cancelled or when the
    /// object was already visited. The matching typed visitor runs first,
    /// then the ownership visitor, and the first error from either aborts
    /// the visit.
    pub fn visit(
        self: &Arc<Self>,
        object: DynamicObject,
        visit_descendants: bool,
        level: usize,
    ) -> BoxFuture<'static, GraphResult<()>> {
        let traversal = Arc::clone(self);
        async move {
            if traversal.is_cancelled() {
                tracing::debug!("Traversal cancelled, skipping {}", object::describe(&object));
                return Ok(());
            }
            let Some(uid) = object::uid(&object) else {
                return Err(GraphError::InvalidObject(format!(
                    "{} has no uid",
                    object::describe(&object)
                )));
            };
            if object::kind(&object).is_empty() {
                return Err(GraphError::InvalidObject(format!(
                    "object {} has no kind",
                    object::name(&object)
                )));
            }
            if !traversal.mark_visited(uid) {
                return Ok(());
            }

            tracing::debug!(
                "Visiting {} at level {} (descendants: {})",
                object::describe(&object),
                level,
                visit_descendants
            );
            traversal.handler.process(&object);

            if let Some(visitor) = traversal.registry.lookup(&object) {
                let typed_level = traversal.handler.set_level(object::kind(&object), level);
                visitor
                    .visit(&traversal, &object, visit_descendants, typed_level)
                    .await?;
            }
            default::visit(&traversal, &object, visit_descendants, level).await
        }
        .boxed()
    }

    /// Visit `related` and then record the edge between it and `anchor`
    ///
    /// The edge is only recorded once the related visit has returned
    /// successfully and the traversal has not been cancelled, so objects
    /// skipped by cancellation never appear in the graph.
    pub fn visit_related(
        self: &Arc<Self>,
        anchor: &DynamicObject,
        related: DynamicObject,
        direction: Direction,
        visit_descendants: bool,
        edge_level: usize,
        visit_level: usize,
    ) -> BoxFuture<'static, GraphResult<()>> {
        let traversal = Arc::clone(self);
        let anchor = anchor.clone();
        async move {
            traversal
                .visit(related.clone(), visit_descendants, visit_level)
                .await?;
            if traversal.is_cancelled() {
                return Ok(());
            }
            match direction {
                Direction::Outgoing => traversal.handler.add_edge(&anchor, &related, edge_level),
                Direction::Incoming => traversal.handler.add_edge(&related, &anchor, edge_level),
            }
            Ok(())
        }
        .boxed()
    }
}
