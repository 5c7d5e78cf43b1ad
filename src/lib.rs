//! kubegraph library
//!
//! Builds the relationship graph around Kubernetes objects: owners,
//! controlled descendants and kind-specific peers, collapsed into a
//! leveled adjacency list with per-node health.
//!
//! The binary is a thin CLI over [`ResourceViewer`]; everything here can be
//! driven against a live cluster ([`KubeStore`]) or in-memory manifests
//! ([`MemoryStore`]).

pub mod client;
pub mod config;
pub mod error;
pub mod graph;
pub mod link;
pub mod models;
pub mod query;
pub mod status;
pub mod store;
pub mod traversal;

pub use error::{GraphError, GraphResult};
pub use graph::viewer::{ResourceViewer, ViewerOptions};
pub use graph::{AdjacencyList, EdgeType, GraphEdge, Node, ResourceGraph};
pub use link::{DashboardLinks, LinkGenerator};
pub use models::ObjectKind;
pub use status::{BasicStatusEvaluator, ObjectStatus, Severity, StatusEvaluator};
pub use store::{KubeStore, MemoryStore, ObjectStore, StoreError, StoreKey};
pub use traversal::CancelSignal;
