//! Betweenness and degree centrality for bottleneck detection.
//!
//! Betweenness uses Brandes' algorithm over unweighted hop distance. Edge
//! weights are traffic probabilities, not lengths, so they play no part
//! here. Every shortest path between an ordered pair gets equal fractional
//! credit, and scores are normalized by the number of ordered pairs that
//! exclude the scored node, `(n - 1)(n - 2)`.

use crate::config::SeverityThresholds;
use crate::graph::WorkflowGraph;
use crate::types::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// How critical a node is to overall flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Most traffic funnels through this node
    Critical,
    /// Significant share of traffic
    Moderate,
    /// Minor share of traffic
    Low,
}

impl Severity {
    /// Classifies a betweenness score.
    pub fn classify(score: f64, thresholds: &SeverityThresholds) -> Self {
        if score > thresholds.critical {
            Severity::Critical
        } else if score > thresholds.moderate {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Moderate => write!(f, "MODERATE"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

/// A node paired with its centrality score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeScore {
    /// Scored node
    pub node: NodeId,
    /// Normalized score in [0, 1]
    pub score: f64,
}

/// Betweenness scores keyed by node, in node insertion order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BetweennessScores {
    scores: IndexMap<NodeId, f64>,
}

impl BetweennessScores {
    /// Returns the score of a node.
    pub fn get(&self, node: &NodeId) -> Option<f64> {
        self.scores.get(node).copied()
    }

    /// Iterates scores in node insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, f64)> + '_ {
        self.scores.iter().map(|(id, &score)| (id, score))
    }

    /// Number of scored nodes.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if no nodes were scored.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Scores sorted highest first; equal scores keep insertion order.
    pub fn ranked(&self) -> Vec<NodeScore> {
        let mut ranked: Vec<NodeScore> = self
            .iter()
            .map(|(node, score)| NodeScore {
                node: node.clone(),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// The node with the highest score.
    ///
    /// Ties go to the node inserted first. Returns `None` for an empty graph.
    pub fn primary_bottleneck(&self) -> Option<NodeScore> {
        let mut best: Option<(&NodeId, f64)> = None;
        for (node, score) in self.iter() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((node, score)),
            }
        }
        best.map(|(node, score)| NodeScore {
            node: node.clone(),
            score,
        })
    }
}

/// Computes normalized betweenness centrality for every node.
///
/// # Example
///
/// ```
/// use flowlens_core::{betweenness_centrality, reference::customer_support_workflow};
///
/// let scores = betweenness_centrality(&customer_support_workflow().unwrap());
/// let top = scores.primary_bottleneck().unwrap();
/// assert_eq!(top.node.as_str(), "quality_check");
/// ```
pub fn betweenness_centrality(graph: &WorkflowGraph) -> BetweennessScores {
    let n = graph.node_count();
    let adjacency: Vec<Vec<usize>> = graph
        .node_map
        .values()
        .map(|&idx| {
            graph
                .successors(idx)
                .into_iter()
                .map(|s| s.index())
                .collect()
        })
        .collect();

    let mut raw = vec![0.0f64; n];
    let mut stack = Vec::with_capacity(n);
    let mut queue = VecDeque::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut distance = vec![-1i64; n];
    let mut delta = vec![0.0f64; n];

    for s in 0..n {
        stack.clear();
        for preds in predecessors.iter_mut() {
            preds.clear();
        }
        sigma.fill(0.0);
        distance.fill(-1);
        delta.fill(0.0);

        sigma[s] = 1.0;
        distance[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &adjacency[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                raw[w] += delta[w];
            }
        }
    }

    let scale = if n > 2 {
        1.0 / ((n - 1) as f64 * (n - 2) as f64)
    } else {
        0.0
    };

    // node_map and the petgraph node indices share insertion order
    let scores = graph
        .node_map
        .iter()
        .map(|(id, &idx)| (id.clone(), (raw[idx.index()] * scale).clamp(0.0, 1.0)))
        .collect();

    BetweennessScores { scores }
}

/// In- and out-degree of a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connectivity {
    /// Node
    pub node: NodeId,
    /// Incoming edge count
    pub in_degree: usize,
    /// Outgoing edge count
    pub out_degree: usize,
}

impl Connectivity {
    /// Total degree.
    pub fn total(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

/// Returns nodes ranked by total degree, highest first.
///
/// Equal totals keep insertion order.
pub fn degree_connectivity(graph: &WorkflowGraph) -> Vec<Connectivity> {
    let mut ranked: Vec<Connectivity> = graph
        .node_map
        .iter()
        .map(|(id, &idx)| Connectivity {
            node: id.clone(),
            in_degree: graph
                .graph
                .edges_directed(idx, petgraph::Direction::Incoming)
                .count(),
            out_degree: graph
                .graph
                .edges_directed(idx, petgraph::Direction::Outgoing)
                .count(),
        })
        .collect();
    ranked.sort_by(|a, b| b.total().cmp(&a.total()));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::reference::customer_support_workflow;
    use crate::types::{NodeAttrs, NodeKind};

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_reference_scores() {
        let scores = betweenness_centrality(&customer_support_workflow().unwrap());

        assert!(approx(scores.get(&id("quality_check")).unwrap(), 25.0 / 56.0));
        assert!(approx(scores.get(&id("context_enricher")).unwrap(), 21.0 / 56.0));
        assert!(approx(scores.get(&id("intent_classifier")).unwrap(), 20.0 / 56.0));
        assert!(approx(scores.get(&id("response_formatter")).unwrap(), 7.0 / 56.0));
        assert!(approx(scores.get(&id("billing_agent")).unwrap(), (10.0 / 3.0) / 56.0));
    }

    #[test]
    fn test_entry_and_exit_score_zero() {
        let scores = betweenness_centrality(&customer_support_workflow().unwrap());
        assert_eq!(scores.get(&id("input")), Some(0.0));
        assert_eq!(scores.get(&id("output")), Some(0.0));
    }

    #[test]
    fn test_scores_within_unit_interval() {
        let scores = betweenness_centrality(&customer_support_workflow().unwrap());
        for (_, score) in scores.iter() {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_rerun_is_identical() {
        let graph = customer_support_workflow().unwrap();
        let first = betweenness_centrality(&graph);
        let second = betweenness_centrality(&graph);
        let first_bits: Vec<u64> = first.iter().map(|(_, s)| s.to_bits()).collect();
        let second_bits: Vec<u64> = second.iter().map(|(_, s)| s.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_primary_bottleneck_reference() {
        let scores = betweenness_centrality(&customer_support_workflow().unwrap());
        let top = scores.primary_bottleneck().unwrap();
        assert_eq!(top.node, id("quality_check"));
        assert_eq!(
            Severity::classify(top.score, &SeverityThresholds::default()),
            Severity::Moderate
        );
    }

    #[test]
    fn test_bottleneck_tie_goes_to_first_inserted() {
        // Two parallel middle nodes carry identical betweenness
        let graph = GraphBuilder::new()
            .node("input", NodeAttrs::new(NodeKind::Entry))
            .node("left", NodeAttrs::new(NodeKind::Specialist))
            .node("right", NodeAttrs::new(NodeKind::Specialist))
            .node("output", NodeAttrs::new(NodeKind::Exit))
            .edge("input", "left", 0.5)
            .edge("input", "right", 0.5)
            .edge("left", "output", 1.0)
            .edge("right", "output", 1.0)
            .build()
            .unwrap();

        let scores = betweenness_centrality(&graph);
        assert_eq!(scores.get(&id("left")), scores.get(&id("right")));
        assert_eq!(scores.primary_bottleneck().unwrap().node, id("left"));
        assert_eq!(scores.ranked()[0].node, id("left"));
    }

    #[test]
    fn test_chain_middle_node() {
        let graph = GraphBuilder::new()
            .node("a", NodeAttrs::new(NodeKind::Entry))
            .node("b", NodeAttrs::new(NodeKind::Classifier))
            .node("c", NodeAttrs::new(NodeKind::Exit))
            .edge("a", "b", 1.0)
            .edge("b", "c", 1.0)
            .build()
            .unwrap();

        // Only (a, c) passes through b: 1 / ((3 - 1) * (3 - 2))
        let scores = betweenness_centrality(&graph);
        assert!(approx(scores.get(&id("b")).unwrap(), 0.5));
    }

    #[test]
    fn test_tiny_graph_scores_zero() {
        let graph = GraphBuilder::new()
            .node("input", NodeAttrs::new(NodeKind::Entry))
            .node("output", NodeAttrs::new(NodeKind::Exit))
            .edge("input", "output", 1.0)
            .build()
            .unwrap();
        let scores = betweenness_centrality(&graph);
        assert!(scores.iter().all(|(_, s)| s == 0.0));
    }

    #[test]
    fn test_empty_graph_has_no_bottleneck() {
        let scores = betweenness_centrality(&WorkflowGraph::new());
        assert!(scores.is_empty());
        assert!(scores.primary_bottleneck().is_none());
    }

    #[test]
    fn test_severity_boundaries() {
        let thresholds = SeverityThresholds::default();
        assert_eq!(Severity::classify(0.51, &thresholds), Severity::Critical);
        assert_eq!(Severity::classify(0.5, &thresholds), Severity::Moderate);
        assert_eq!(Severity::classify(0.21, &thresholds), Severity::Moderate);
        assert_eq!(Severity::classify(0.2, &thresholds), Severity::Low);
        assert_eq!(Severity::classify(0.0, &thresholds), Severity::Low);
    }

    #[test]
    fn test_degree_connectivity() {
        let ranked = degree_connectivity(&customer_support_workflow().unwrap());
        // quality_check: 3 in + 2 out
        assert_eq!(ranked[0].node, id("quality_check"));
        assert_eq!(ranked[0].in_degree, 3);
        assert_eq!(ranked[0].out_degree, 2);
        // context_enricher: 1 in + 3 out
        assert_eq!(ranked[1].node, id("context_enricher"));
        assert_eq!(ranked[1].total(), 4);
    }
}
