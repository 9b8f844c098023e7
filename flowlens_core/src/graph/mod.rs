//! Workflow graph model using petgraph.
//!
//! Provides the typed, weighted directed graph that every analyzer reads.
//! Unlike a task DAG the workflow graph may contain cycles: a validator
//! routing back to the classifier is an ordinary edge here, and retry
//! bounds are enforced by the execution engine instead.

pub mod builder;

use crate::error::{FlowError, Result};
use crate::types::{EdgeAttrs, NodeAttrs, NodeId, NodeKind};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef as _;
use petgraph::Direction;

pub use builder::{build_graph, GraphBuilder};

/// Tolerance used when checking that branch weights sum to 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Node data stored in the workflow graph.
#[derive(Clone, Debug)]
pub struct WorkflowNode {
    /// Node identifier
    pub id: NodeId,
    /// Node attributes
    pub attrs: NodeAttrs,
}

/// Borrowed view of one directed edge.
#[derive(Clone, Copy, Debug)]
pub struct EdgeView<'a> {
    /// Edge source
    pub source: &'a NodeId,
    /// Edge target
    pub target: &'a NodeId,
    /// Edge attributes
    pub attrs: EdgeAttrs,
}

/// Weighted directed graph describing an agent workflow.
///
/// Nodes keep their insertion order and outgoing edges are always reported
/// in insertion order, so every derived result (paths, centrality, cost
/// aggregates) is reproducible across runs.
///
/// # Example
///
/// ```
/// use flowlens_core::{NodeAttrs, NodeKind, WorkflowGraph};
///
/// let mut graph = WorkflowGraph::new();
/// graph.add_node("input", NodeAttrs::new(NodeKind::Entry))?;
/// graph.add_node("output", NodeAttrs::new(NodeKind::Exit))?;
/// graph.add_edge("input", "output", 1.0)?;
/// graph.validate()?;
/// assert_eq!(graph.edge_count(), 1);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct WorkflowGraph {
    pub(crate) graph: DiGraph<WorkflowNode, EdgeAttrs>,
    pub(crate) node_map: IndexMap<NodeId, NodeIndex>,
}

impl WorkflowGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph.
    ///
    /// # Returns
    ///
    /// - `Err(FlowError::DuplicateNode)` if the id already exists
    /// - `Err(FlowError::InvalidAttribute)` if cost or time is negative or not finite
    pub fn add_node(&mut self, id: impl Into<NodeId>, attrs: NodeAttrs) -> Result<NodeIndex> {
        let id = id.into();
        if self.node_map.contains_key(&id) {
            return Err(FlowError::DuplicateNode(id));
        }
        check_attribute(&id, "cost_per_call", attrs.cost_per_call)?;
        check_attribute(&id, "avg_time_ms", attrs.avg_time_ms)?;

        tracing::debug!(node = %id, kind = %attrs.kind, "adding workflow node");
        let idx = self.graph.add_node(WorkflowNode {
            id: id.clone(),
            attrs,
        });
        self.node_map.insert(id, idx);
        Ok(idx)
    }

    /// Adds a directed edge carrying a traffic probability.
    ///
    /// Adding an edge that already exists replaces its weight.
    ///
    /// # Returns
    ///
    /// - `Err(FlowError::UnknownNode)` if either endpoint is absent
    /// - `Err(FlowError::InvalidWeight)` if weight is outside [0, 1]
    pub fn add_edge(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        weight: f64,
    ) -> Result<()> {
        let source = source.into();
        let target = target.into();

        let from = self.index_of(&source)?;
        let to = self.index_of(&target)?;

        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(FlowError::InvalidWeight {
                source_node: source,
                target,
                weight,
            });
        }

        match self.graph.find_edge(from, to) {
            Some(existing) => {
                tracing::debug!(%source, %target, weight, "replacing edge weight");
                self.graph[existing] = EdgeAttrs::new(weight);
            }
            None => {
                tracing::debug!(%source, %target, weight, "adding workflow edge");
                self.graph.add_edge(from, to, EdgeAttrs::new(weight));
            }
        }
        Ok(())
    }

    /// Checks whole-graph invariants.
    ///
    /// - exactly one entry node and exactly one exit node
    /// - for every node with more than one outgoing edge, the outgoing
    ///   weights sum to 1.0 within [`WEIGHT_TOLERANCE`]
    pub fn validate(&self) -> Result<()> {
        let entries = self.nodes_of_kind(NodeKind::Entry).len();
        let exits = self.nodes_of_kind(NodeKind::Exit).len();
        if entries != 1 || exits != 1 {
            return Err(FlowError::EntryExitCardinality { entries, exits });
        }

        for (id, &idx) in &self.node_map {
            let outgoing = self.outgoing_edges(idx);
            if outgoing.len() < 2 {
                continue;
            }
            let sum: f64 = outgoing.iter().map(|&e| self.graph[e].weight).sum();
            if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(FlowError::BranchWeightMismatch {
                    node: id.clone(),
                    sum,
                });
            }
        }
        Ok(())
    }

    /// Returns the attributes of a node.
    pub fn node_attr(&self, id: &NodeId) -> Result<&NodeAttrs> {
        let idx = self.index_of(id)?;
        Ok(&self.graph[idx].attrs)
    }

    /// Returns outgoing edges of a node in insertion order.
    pub fn neighbors(&self, id: &NodeId) -> Result<Vec<EdgeView<'_>>> {
        let idx = self.index_of(id)?;
        Ok(self
            .outgoing_edges(idx)
            .into_iter()
            .map(|e| self.edge_view(e))
            .collect())
    }

    /// Returns every edge in insertion order.
    pub fn edges(&self) -> Vec<EdgeView<'_>> {
        self.graph
            .edge_indices()
            .map(|e| self.edge_view(e))
            .collect()
    }

    /// Looks up the weight of a directed edge, if present.
    pub fn edge_weight(&self, source: &NodeId, target: &NodeId) -> Option<f64> {
        let from = *self.node_map.get(source)?;
        let to = *self.node_map.get(target)?;
        self.graph.find_edge(from, to).map(|e| self.graph[e].weight)
    }

    /// Returns true if the directed edge exists.
    pub fn has_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edge_weight(source, target).is_some()
    }

    /// Iterates node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.node_map.keys()
    }

    /// Iterates nodes with their attributes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeAttrs)> + '_ {
        self.node_map
            .iter()
            .map(move |(id, &idx)| (id, &self.graph[idx].attrs))
    }

    /// Returns the ids of all nodes of the given kind, in insertion order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&NodeId> {
        self.nodes()
            .filter(|(_, attrs)| attrs.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns the single entry node.
    pub fn entry(&self) -> Result<&NodeId> {
        self.single_of_kind(NodeKind::Entry)
    }

    /// Returns the single exit node.
    pub fn exit(&self) -> Result<&NodeId> {
        self.single_of_kind(NodeKind::Exit)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Checks if a node exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, id: &NodeId) -> Result<usize> {
        let idx = self.index_of(id)?;
        Ok(self.graph.edges_directed(idx, Direction::Incoming).count())
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, id: &NodeId) -> Result<usize> {
        let idx = self.index_of(id)?;
        Ok(self.graph.edges_directed(idx, Direction::Outgoing).count())
    }

    /// Returns a copy of this graph with one node's time and cost scaled.
    ///
    /// The original graph is left untouched, so what-if scenarios never
    /// mutate a snapshot that other analyses are reading.
    pub fn with_node_scaled(
        &self,
        id: &NodeId,
        time_multiplier: f64,
        cost_multiplier: f64,
    ) -> Result<WorkflowGraph> {
        let idx = self.index_of(id)?;
        check_attribute(id, "time_multiplier", time_multiplier)?;
        check_attribute(id, "cost_multiplier", cost_multiplier)?;

        let mut scaled = self.clone();
        let attrs = &mut scaled.graph[idx].attrs;
        attrs.avg_time_ms *= time_multiplier;
        attrs.cost_per_call *= cost_multiplier;
        Ok(scaled)
    }

    /// Content hash of nodes, attributes and edges.
    ///
    /// Two graphs with the same fingerprint produce identical analyses,
    /// which lets stored result bundles be matched to their snapshot.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (id, attrs) in self.nodes() {
            hasher.update(id.as_str().as_bytes());
            hasher.update(&[0]);
            hasher.update(attrs.kind.as_str().as_bytes());
            hasher.update(&attrs.cost_per_call.to_le_bytes());
            hasher.update(&attrs.avg_time_ms.to_le_bytes());
        }
        for edge in self.edges() {
            hasher.update(edge.source.as_str().as_bytes());
            hasher.update(&[0]);
            hasher.update(edge.target.as_str().as_bytes());
            hasher.update(&[0]);
            hasher.update(&edge.attrs.weight.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    pub(crate) fn index_of(&self, id: &NodeId) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))
    }

    pub(crate) fn id_at(&self, idx: NodeIndex) -> &NodeId {
        &self.graph[idx].id
    }

    pub(crate) fn attrs_at(&self, idx: NodeIndex) -> &NodeAttrs {
        &self.graph[idx].attrs
    }

    /// Successor indices in edge insertion order.
    pub(crate) fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.outgoing_edges(idx)
            .into_iter()
            .map(|e| self.graph.raw_edges()[e.index()].target())
            .collect()
    }

    // petgraph walks adjacency lists newest-first, so sort by edge index
    fn outgoing_edges(&self, idx: NodeIndex) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        edges.sort();
        edges
    }

    fn edge_view(&self, e: EdgeIndex) -> EdgeView<'_> {
        let raw = &self.graph.raw_edges()[e.index()];
        EdgeView {
            source: &self.graph[raw.source()].id,
            target: &self.graph[raw.target()].id,
            attrs: raw.weight,
        }
    }

    fn single_of_kind(&self, kind: NodeKind) -> Result<&NodeId> {
        let matches = self.nodes_of_kind(kind);
        if matches.len() == 1 {
            return Ok(matches[0]);
        }
        Err(FlowError::EntryExitCardinality {
            entries: self.nodes_of_kind(NodeKind::Entry).len(),
            exits: self.nodes_of_kind(NodeKind::Exit).len(),
        })
    }
}

pub(crate) fn check_attribute(node: &NodeId, attribute: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FlowError::InvalidAttribute {
            node: node.clone(),
            attribute,
            value,
        })
    }
}
