//! Graph data structures for resource relationships
//!
//! A finished graph is a set of nodes keyed by node key (the object UID, or
//! `"<owner-name> pods"` for a pod group) and an adjacency list holding at
//! most one directed entry per pair of node keys.

pub mod handler;
pub mod viewer;

use crate::status::{Property, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Suffix of pod group node names
pub const POD_GROUP_SUFFIX: &str = " pods";

/// Name of the node that folds every pod owned by `owner_name`
pub fn pod_group_name(owner_name: &str) -> String {
    format!("{}{}", owner_name, POD_GROUP_SUFFIX)
}

/// How an edge was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Between two individually materialized objects
    Explicit,
    /// Touching a pod group node
    Implicit,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Explicit => write!(f, "explicit"),
            EdgeType::Implicit => write!(f, "implicit"),
        }
    }
}

/// Target of an adjacency entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub node: String,
    #[serde(rename = "edge")]
    pub edge_type: EdgeType,
}

/// Finalized adjacency list, ordered by source node key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdjacencyList(BTreeMap<String, Vec<GraphEdge>>);

impl AdjacencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry exists between `a` and `b` in either direction
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        let points_to = |from: &str, to: &str| {
            self.0
                .get(from)
                .is_some_and(|edges| edges.iter().any(|edge| edge.node == to))
        };
        points_to(a, b) || points_to(b, a)
    }

    pub fn insert(&mut self, from: &str, to: &str, edge_type: EdgeType) {
        self.0.entry(from.to_string()).or_default().push(GraphEdge {
            node: to.to_string(),
            edge_type,
        });
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&[GraphEdge]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Number of source keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<GraphEdge>> {
        self.0.iter()
    }

    /// Target keys of `key`, in insertion order
    pub fn targets(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .unwrap_or_default()
            .iter()
            .map(|edge| edge.node.as_str())
            .collect()
    }
}

impl fmt::Display for AdjacencyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (from, edges) in &self.0 {
            for edge in edges {
                writeln!(f, "{} -> {} ({})", from, edge.node, edge.edge_type)?;
            }
        }
        Ok(())
    }
}

/// A materialized graph vertex
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    pub api_version: String,
    pub kind: String,
    pub status: Severity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Nodes and adjacency of a finished build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceGraph {
    pub nodes: BTreeMap<String, Node>,
    pub adjacency: AdjacencyList,
}

impl ResourceGraph {
    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Worst status across every node
    pub fn worst_status(&self) -> Severity {
        self.nodes
            .values()
            .map(|node| node.status)
            .max()
            .unwrap_or_default()
    }
}

impl fmt::Display for ResourceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, node) in &self.nodes {
            writeln!(f, "{} {} [{}] ({})", node.kind, node.name, node.status, key)?;
        }
        if !self.adjacency.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.adjacency)?;
        }
        Ok(())
    }
}
