//! Edge accumulation and graph finalization
//!
//! During traversal visitors append raw edges from many tasks at once.
//! Once every visit has returned, [`GraphHandler::finalize`] sorts the raw
//! edges and replays them one by one, collapsing reciprocal observations
//! into a single directed entry and folding owned pods into pod groups.

use super::{AdjacencyList, EdgeType, Node, pod_group_name};
use crate::error::{GraphError, GraphResult};
use crate::link::LinkGenerator;
use crate::models::ObjectKind;
use crate::models::object;
use crate::status::{Property, Severity, StatusEvaluator};
use kube::core::DynamicObject;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An unprocessed edge observed during traversal
#[derive(Debug, Clone)]
pub struct RawEdge {
    pub from: DynamicObject,
    pub to: DynamicObject,
    pub level: usize,
}

impl RawEdge {
    fn sort_key(&self) -> (usize, &str, &str, &str, &str) {
        (
            self.level,
            object::kind(&self.from),
            object::name(&self.from),
            object::kind(&self.to),
            object::name(&self.to),
        )
    }
}

#[derive(Default)]
struct EdgeLog {
    edges: Vec<RawEdge>,
    sealed: bool,
}

#[derive(Default)]
struct GraphState {
    /// Individually materialized objects by UID
    objects: BTreeMap<String, DynamicObject>,
    /// Pod group name -> member pods by UID
    pod_groups: BTreeMap<String, BTreeMap<String, DynamicObject>>,
    adjacency: AdjacencyList,
}

/// Where an object lands in the finished graph
enum Endpoint {
    Object(String),
    PodGroup(String),
}

impl Endpoint {
    /// Resolve the node an object belongs to; `None` means the object is left out
    fn resolve(object: &DynamicObject) -> Option<Self> {
        if object::is_scaled_to_zero(object) {
            return None;
        }
        if object::object_kind(object) == Some(ObjectKind::Pod) {
            let owner = object::controller_of(object)
                .or_else(|| object::owner_references(object).first());
            if let Some(owner) = owner {
                return Some(Endpoint::PodGroup(pod_group_name(&owner.name)));
            }
        }
        object::uid(object).map(|uid| Endpoint::Object(uid.to_string()))
    }

    fn key(&self) -> &str {
        match self {
            Endpoint::Object(key) | Endpoint::PodGroup(key) => key,
        }
    }
}

impl GraphState {
    fn register(&mut self, endpoint: &Endpoint, object: &DynamicObject) {
        match endpoint {
            Endpoint::Object(uid) => {
                self.objects
                    .entry(uid.clone())
                    .or_insert_with(|| object.clone());
            }
            Endpoint::PodGroup(group) => {
                if let Some(uid) = object::uid(object) {
                    self.pod_groups
                        .entry(group.clone())
                        .or_default()
                        .entry(uid.to_string())
                        .or_insert_with(|| object.clone());
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-build accumulator of edges, levels and nodes
#[derive(Default)]
pub struct GraphHandler {
    edges: Mutex<EdgeLog>,
    levels: Mutex<HashMap<String, usize>>,
    graph: Mutex<GraphState>,
}

impl GraphHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed edge
    ///
    /// Edges arriving after finalization are dropped.
    pub fn add_edge(&self, from: &DynamicObject, to: &DynamicObject, level: usize) {
        let mut log = lock(&self.edges);
        if log.sealed {
            tracing::debug!(
                "Dropping edge {} -> {} recorded after finalization",
                object::describe(from),
                object::describe(to)
            );
            return;
        }
        log.edges.push(RawEdge {
            from: from.clone(),
            to: to.clone(),
            level,
        });
    }

    /// Layer of `kind`, recording `level + 1` the first time the kind is seen
    pub fn set_level(&self, kind: &str, level: usize) -> usize {
        *lock(&self.levels)
            .entry(kind.to_string())
            .or_insert(level + 1)
    }

    pub fn level_for(&self, kind: &str) -> Option<usize> {
        lock(&self.levels).get(kind).copied()
    }

    /// Register a visited object as a node candidate
    pub fn process(&self, object: &DynamicObject) {
        match Endpoint::resolve(object) {
            Some(endpoint) => lock(&self.graph).register(&endpoint, object),
            None => tracing::debug!(
                "{} is scaled to zero, not adding a node",
                object::describe(object)
            ),
        }
    }

    /// Sort the raw edges and replay them into the adjacency list
    ///
    /// Can run once per handler.
    pub fn finalize(&self) -> GraphResult<()> {
        let mut edges = {
            let mut log = lock(&self.edges);
            if log.sealed {
                return Err(GraphError::Finalized);
            }
            log.sealed = true;
            std::mem::take(&mut log.edges)
        };

        edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        tracing::debug!("Finalizing {} raw edges", edges.len());
        for edge in &edges {
            self.finalize_edge(&edge.from, &edge.to);
        }
        Ok(())
    }

    /// Add one edge to the adjacency list
    ///
    /// Self edges and pairs already connected in either direction are
    /// dropped, as are edges touching a scaled-to-zero object. Otherwise
    /// the edge hangs under whichever endpoint is already a source key,
    /// preferring `from`.
    pub fn finalize_edge(&self, from: &DynamicObject, to: &DynamicObject) {
        let (Some(from_endpoint), Some(to_endpoint)) =
            (Endpoint::resolve(from), Endpoint::resolve(to))
        else {
            return;
        };
        let (from_key, to_key) = (from_endpoint.key(), to_endpoint.key());
        if from_key == to_key {
            return;
        }

        let mut graph = lock(&self.graph);
        graph.register(&from_endpoint, from);
        graph.register(&to_endpoint, to);
        if graph.adjacency.has_edge(from_key, to_key) {
            return;
        }

        let edge_type = match (&from_endpoint, &to_endpoint) {
            (Endpoint::Object(_), Endpoint::Object(_)) => EdgeType::Explicit,
            _ => EdgeType::Implicit,
        };
        if graph.adjacency.contains_key(from_key) {
            graph.adjacency.insert(from_key, to_key, edge_type);
        } else if graph.adjacency.contains_key(to_key) {
            graph.adjacency.insert(to_key, from_key, edge_type);
        } else {
            graph.adjacency.insert(from_key, to_key, edge_type);
        }
    }

    pub fn adjacency_list(&self) -> AdjacencyList {
        lock(&self.graph).adjacency.clone()
    }

    /// Materialize every registered node
    pub fn nodes(
        &self,
        status: &dyn StatusEvaluator,
        links: &dyn LinkGenerator,
    ) -> GraphResult<BTreeMap<String, Node>> {
        let (objects, pod_groups) = {
            let graph = lock(&self.graph);
            (graph.objects.clone(), graph.pod_groups.clone())
        };

        let mut nodes = BTreeMap::new();
        for (uid, object) in &objects {
            if object::is_scaled_to_zero(object) {
                continue;
            }
            let evaluated = status.status(object)?;
            nodes.insert(
                uid.clone(),
                Node {
                    name: object::name(object).to_string(),
                    api_version: object::api_version(object).to_string(),
                    kind: object::kind(object).to_string(),
                    status: evaluated.severity,
                    properties: evaluated.properties,
                    details: evaluated.details,
                    path: links.path_for(object),
                },
            );
        }

        for (group, members) in &pod_groups {
            nodes.insert(group.clone(), pod_group_node(group, members, status)?);
        }
        Ok(nodes)
    }
}

fn pod_group_node(
    group: &str,
    members: &BTreeMap<String, DynamicObject>,
    status: &dyn StatusEvaluator,
) -> GraphResult<Node> {
    let mut worst = Severity::Ok;
    let mut details = Vec::with_capacity(members.len());

    let mut pods: Vec<&DynamicObject> = members.values().collect();
    pods.sort_by(|a, b| object::name(a).cmp(object::name(b)));
    for pod in pods {
        let evaluated = status.status(pod)?;
        worst = worst.max(evaluated.severity);
        details.push(format!("{}: {}", object::name(pod), evaluated.severity));
    }

    Ok(Node {
        name: group.to_string(),
        api_version: ObjectKind::Pod.api_version().to_string(),
        kind: ObjectKind::Pod.as_str().to_string(),
        status: worst,
        properties: vec![Property::new("Pods", members.len().to_string())],
        details,
        path: None,
    })
}
