//! Dependency graph and topological resolution
//!
//! Owns the financial nodes and the "evaluated after" edge relation, and
//! produces one valid total evaluation order per version of the graph.
//!
//! # Determinism
//!
//! - Nodes with no ordering constraint between them resolve in insertion
//!   order, so identical construction sequences always produce identical
//!   evaluation orders.
//! - All internal maps are BTreeMap/BTreeSet for sorted iteration.
//! - The resolved order is computed lazily and cached; any graph mutation
//!   invalidates the cache.

use crate::models::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised during graph construction and resolution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("node '{0}' already exists")]
    DuplicateNode(String),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("dependency cycle detected: {}", format_cycle(.0))]
    Cycle(Vec<String>),
}

/// Render a cycle as `a -> b -> a`
fn format_cycle(cycle: &[String]) -> String {
    let mut rendered = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        rendered.push_str(" -> ");
        rendered.push_str(first);
    }
    rendered
}

/// Directed acyclic graph of financial nodes
///
/// Edges read "`from` is evaluated before `to`". A node's declared
/// dependencies are recorded as edges when the node is added; additional
/// ordering constraints can be added explicitly with [`add_edge`].
///
/// [`add_edge`]: DependencyGraph::add_edge
///
/// # Example
/// ```
/// use wallet_simulator_core::{DependencyGraph, Node, NodeKind};
/// use rust_decimal::Decimal;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_node(Node::new("salary", NodeKind::Salary {
///     annual_salary: Decimal::from(60_000),
///     payment_day: 1,
/// })).unwrap();
/// graph.add_node(Node::new("rent", NodeKind::FixedExpense {
///     amount: Decimal::from(1_500),
///     payment_day: 1,
///     description: "Monthly rent".to_string(),
/// })).unwrap();
/// graph.add_edge("salary", "rent").unwrap();
///
/// assert_eq!(graph.resolve_order().unwrap(), vec!["salary", "rent"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// All nodes, indexed by identifier
    nodes: BTreeMap<String, Node>,

    /// Node identifiers in the order they were added (tie-break order)
    insertion_order: Vec<String>,

    /// Edge set: (from, to) means `from` is evaluated before `to`
    edges: BTreeSet<(String, String)>,

    /// Cached evaluation order, invalidated on every mutation
    #[serde(skip)]
    cached_order: Option<Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            insertion_order: Vec::new(),
            edges: BTreeSet::new(),
            cached_order: None,
        }
    }

    /// Register a node
    ///
    /// The node's declared dependencies are recorded as edges immediately;
    /// they may reference nodes that are added later and are validated at
    /// resolution time.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        for dep in node.depends_on() {
            self.edges.insert((dep.clone(), id.clone()));
        }

        self.insertion_order.push(id.clone());
        self.nodes.insert(id, node);
        self.cached_order = None;
        Ok(())
    }

    /// Add an explicit ordering edge: `from` is evaluated before `to`
    ///
    /// Unlike declared dependencies, both endpoints must already exist.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::UnknownNode(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphError::UnknownNode(to.to_string()));
        }

        self.edges.insert((from.to_string(), to.to_string()));
        self.cached_order = None;
        Ok(())
    }

    /// Remove a node and every edge touching it
    ///
    /// Returns whether the node existed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.nodes.remove(id).is_none() {
            return false;
        }
        self.insertion_order.retain(|n| n != id);
        self.edges.retain(|(from, to)| from != id && to != id);
        self.cached_order = None;
        true
    }

    /// Remove an ordering edge
    ///
    /// Returns whether the edge existed.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let removed = self.edges.remove(&(from.to_string(), to.to_string()));
        if removed {
            self.cached_order = None;
        }
        removed
    }

    /// Get a node by identifier
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node identifiers in insertion order
    pub fn node_ids(&self) -> &[String] {
        &self.insertion_order
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Identifiers of nodes that must be evaluated before `id`, sorted
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, to)| to == id)
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Resolve the evaluation order
    ///
    /// Every node appears after all nodes it depends on. Nodes with no
    /// ordering constraint between them appear in insertion order. The
    /// result is cached until the graph is mutated.
    ///
    /// Fails with [`GraphError::UnknownNode`] if an edge references a node
    /// that was never added, or [`GraphError::Cycle`] naming an offending
    /// cycle if no order exists.
    pub fn resolve_order(&mut self) -> Result<Vec<String>, GraphError> {
        if let Some(order) = &self.cached_order {
            return Ok(order.clone());
        }

        let order = self.compute_order()?;
        self.cached_order = Some(order.clone());
        Ok(order)
    }

    fn validate(&self) -> Result<(), GraphError> {
        for (from, to) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            if !self.nodes.contains_key(to) {
                return Err(GraphError::UnknownNode(to.clone()));
            }
        }
        Ok(())
    }

    /// Kahn's algorithm with insertion-order tie-breaking
    fn compute_order(&self) -> Result<Vec<String>, GraphError> {
        self.validate()?;

        let mut indegree: BTreeMap<&str, usize> =
            self.nodes.keys().map(|id| (id.as_str(), 0)).collect();
        let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (from, to) in &self.edges {
            *indegree.get_mut(to.as_str()).expect("validated edge endpoint") += 1;
            successors.entry(from.as_str()).or_default().push(to.as_str());
        }

        let mut order: Vec<String> = Vec::with_capacity(self.nodes.len());
        let mut placed: BTreeSet<&str> = BTreeSet::new();

        while order.len() < self.nodes.len() {
            // First ready node in insertion order; node counts are bounded,
            // so the quadratic scan stays cheap.
            let ready = self
                .insertion_order
                .iter()
                .find(|id| !placed.contains(id.as_str()) && indegree[id.as_str()] == 0);

            let Some(id) = ready else {
                return Err(GraphError::Cycle(self.find_cycle(&placed)));
            };

            placed.insert(id.as_str());
            order.push(id.clone());
            if let Some(next) = successors.get(id.as_str()) {
                for succ in next {
                    *indegree.get_mut(succ).expect("validated edge endpoint") -= 1;
                }
            }
        }

        Ok(order)
    }

    /// Extract one concrete cycle from the stalled remainder
    ///
    /// When resolution stalls, every unplaced node still has an unplaced
    /// predecessor, so walking predecessors must revisit a node.
    fn find_cycle(&self, placed: &BTreeSet<&str>) -> Vec<String> {
        let mut preds: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, to) in &self.edges {
            if !placed.contains(from.as_str()) && !placed.contains(to.as_str()) {
                preds.entry(to.as_str()).or_default().push(from.as_str());
            }
        }

        let start = self
            .insertion_order
            .iter()
            .find(|id| !placed.contains(id.as_str()))
            .expect("stalled resolution leaves at least one node");

        let mut position: BTreeMap<&str, usize> = BTreeMap::new();
        let mut path: Vec<&str> = Vec::new();
        let mut current: &str = start.as_str();

        loop {
            if let Some(&idx) = position.get(current) {
                // Path follows predecessors; reverse to present edge direction.
                let mut cycle: Vec<String> = path[idx..].iter().map(|s| s.to_string()).collect();
                cycle.reverse();
                return cycle;
            }
            position.insert(current, path.len());
            path.push(current);
            current = preds
                .get(current)
                .and_then(|p| p.first().copied())
                .expect("unplaced node must have an unplaced predecessor");
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
