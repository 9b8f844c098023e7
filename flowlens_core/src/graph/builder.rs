//! Fluent builder API for workflow graph construction.
//!
//! Collects nodes and edges, then builds and validates the graph in one
//! step. Construction errors are fatal and surfaced from [`GraphBuilder::build`].

use crate::error::Result;
use crate::graph::WorkflowGraph;
use crate::types::{NodeAttrs, NodeId};

/// Fluent builder for constructing workflow graphs.
///
/// # Example
///
/// ```
/// use flowlens_core::{GraphBuilder, NodeAttrs, NodeKind};
///
/// let graph = GraphBuilder::new()
///     .node("input", NodeAttrs::new(NodeKind::Entry))
///     .node("classify", NodeAttrs::new(NodeKind::Classifier).with_cost(0.002))
///     .node("output", NodeAttrs::new(NodeKind::Exit))
///     .edge("input", "classify", 1.0)
///     .edge("classify", "output", 1.0)
///     .build()?;
/// assert_eq!(graph.node_count(), 3);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<(NodeId, NodeAttrs)>,
    edges: Vec<(NodeId, NodeId, f64)>,
}

impl GraphBuilder {
    /// Creates a new GraphBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    pub fn node(mut self, id: impl Into<NodeId>, attrs: NodeAttrs) -> Self {
        self.nodes.push((id.into(), attrs));
        self
    }

    /// Adds a weighted edge.
    pub fn edge(mut self, source: impl Into<NodeId>, target: impl Into<NodeId>, weight: f64) -> Self {
        self.edges.push((source.into(), target.into(), weight));
        self
    }

    /// Builds the graph and validates whole-graph invariants.
    ///
    /// Nodes are added first, then edges, both in the order given.
    pub fn build(self) -> Result<WorkflowGraph> {
        build_graph(self.nodes, self.edges)
    }
}

/// Builds and validates a graph from node and edge lists.
///
/// # Returns
///
/// - `Ok(WorkflowGraph)` - A validated, ready-to-analyze graph
/// - `Err(FlowError)` - The first construction or validation error
pub fn build_graph<N, E>(nodes: N, edges: E) -> Result<WorkflowGraph>
where
    N: IntoIterator<Item = (NodeId, NodeAttrs)>,
    E: IntoIterator<Item = (NodeId, NodeId, f64)>,
{
    let mut graph = WorkflowGraph::new();
    for (id, attrs) in nodes {
        graph.add_node(id, attrs)?;
    }
    for (source, target, weight) in edges {
        graph.add_edge(source, target, weight)?;
    }
    graph.validate()?;

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "workflow graph built"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::types::NodeKind;

    #[test]
    fn test_builder_linear() {
        let graph = GraphBuilder::new()
            .node("input", NodeAttrs::new(NodeKind::Entry))
            .node("output", NodeAttrs::new(NodeKind::Exit))
            .edge("input", "output", 1.0)
            .build()
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_builder_surfaces_duplicate() {
        let result = GraphBuilder::new()
            .node("input", NodeAttrs::new(NodeKind::Entry))
            .node("input", NodeAttrs::new(NodeKind::Exit))
            .build();
        assert!(matches!(result, Err(FlowError::DuplicateNode(_))));
    }

    #[test]
    fn test_builder_rejects_unbalanced_branch() {
        let result = GraphBuilder::new()
            .node("input", NodeAttrs::new(NodeKind::Entry))
            .node("a", NodeAttrs::new(NodeKind::Specialist))
            .node("output", NodeAttrs::new(NodeKind::Exit))
            .edge("input", "a", 0.5)
            .edge("input", "output", 0.2)
            .build();
        assert!(matches!(result, Err(FlowError::BranchWeightMismatch { .. })));
    }

    #[test]
    fn test_build_graph_from_lists() {
        let nodes = vec![
            (NodeId::new("input"), NodeAttrs::new(NodeKind::Entry)),
            (NodeId::new("output"), NodeAttrs::new(NodeKind::Exit)),
        ];
        let edges = vec![(NodeId::new("input"), NodeId::new("output"), 1.0)];
        let graph = build_graph(nodes, edges).unwrap();
        assert!(graph.has_edge(&NodeId::new("input"), &NodeId::new("output")));
    }
}
