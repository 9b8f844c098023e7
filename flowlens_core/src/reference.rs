//! Built-in customer support workflow.
//!
//! Nine nodes, eleven edges and one retry edge from the quality check back
//! to the intent classifier. Used as a fixture by tests, benchmarks and
//! documentation, and as a starting point for custom workflows.

use crate::error::Result;
use crate::graph::{build_graph, WorkflowGraph};
use crate::types::{AttrValue, NodeAttrs, NodeId, NodeKind};

/// Edges of the reference workflow, in insertion order.
const EDGES: [(&str, &str, f64); 11] = [
    ("input", "intent_classifier", 1.0),
    ("intent_classifier", "context_enricher", 1.0),
    ("context_enricher", "billing_agent", 0.4),
    ("context_enricher", "technical_agent", 0.35),
    ("context_enricher", "account_agent", 0.25),
    ("billing_agent", "quality_check", 1.0),
    ("technical_agent", "quality_check", 1.0),
    ("account_agent", "quality_check", 1.0),
    ("quality_check", "response_formatter", 0.95),
    ("quality_check", "intent_classifier", 0.05),
    ("response_formatter", "output", 1.0),
];

fn reference_nodes() -> Vec<(&'static str, NodeAttrs)> {
    vec![
        (
            "input",
            NodeAttrs::new(NodeKind::Entry)
                .with_time_ms(5.0)
                .with_description("User query input"),
        ),
        (
            "intent_classifier",
            NodeAttrs::new(NodeKind::Classifier)
                .with_cost(0.002)
                .with_time_ms(800.0)
                .with_model("gpt-4-mini")
                .with_tokens(150)
                .with_description("Classify user intent (billing, technical, account)"),
        ),
        (
            "context_enricher",
            NodeAttrs::new(NodeKind::Enricher)
                .with_time_ms(200.0)
                .with_description("Fetch user context from DB"),
        ),
        (
            "billing_agent",
            NodeAttrs::new(NodeKind::Specialist)
                .with_cost(0.015)
                .with_time_ms(1500.0)
                .with_model("gpt-4")
                .with_tokens(1000)
                .with_description("Handle billing queries")
                .with_extension("confidence", AttrValue::Float(0.92)),
        ),
        (
            "technical_agent",
            NodeAttrs::new(NodeKind::Specialist)
                .with_cost(0.020)
                .with_time_ms(2000.0)
                .with_model("gpt-4")
                .with_tokens(1300)
                .with_description("Handle technical support")
                .with_extension("confidence", AttrValue::Float(0.88)),
        ),
        (
            "account_agent",
            NodeAttrs::new(NodeKind::Specialist)
                .with_cost(0.012)
                .with_time_ms(1200.0)
                .with_model("gpt-4")
                .with_tokens(800)
                .with_description("Handle account management")
                .with_extension("confidence", AttrValue::Float(0.90)),
        ),
        (
            "response_formatter",
            NodeAttrs::new(NodeKind::Formatter)
                .with_cost(0.001)
                .with_time_ms(100.0)
                .with_model("gpt-4-mini")
                .with_tokens(50)
                .with_description("Format final response"),
        ),
        (
            "quality_check",
            NodeAttrs::new(NodeKind::Validator)
                .with_cost(0.003)
                .with_time_ms(500.0)
                .with_model("gpt-4-mini")
                .with_tokens(200)
                .with_description("Validate response quality"),
        ),
        (
            "output",
            NodeAttrs::new(NodeKind::Exit)
                .with_time_ms(5.0)
                .with_description("Final output to user"),
        ),
    ]
}

/// Builds the customer support reference workflow.
///
/// Goes through [`build_graph`], so the fixture is held to the same
/// validation as any loaded definition.
pub fn customer_support_workflow() -> Result<WorkflowGraph> {
    build_graph(
        reference_nodes()
            .into_iter()
            .map(|(name, attrs)| (NodeId::new(name), attrs)),
        EDGES
            .iter()
            .map(|&(source, target, weight)| (NodeId::new(source), NodeId::new(target), weight)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let graph = customer_support_workflow().unwrap();
        assert_eq!(graph.node_count(), 9);
        assert_eq!(graph.edge_count(), 11);
        assert_eq!(graph.entry().unwrap().as_str(), "input");
        assert_eq!(graph.exit().unwrap().as_str(), "output");
        assert!(graph.has_edge(&NodeId::new("quality_check"), &NodeId::new("intent_classifier")));
    }

    #[test]
    fn test_reference_passes_validation() {
        let graph = customer_support_workflow().unwrap();
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_misspelled_edge_is_rejected() {
        let mut edges: Vec<_> = EDGES
            .iter()
            .map(|&(s, t, w)| (NodeId::new(s), NodeId::new(t), w))
            .collect();
        edges[1].1 = NodeId::new("context_enrichr");
        let nodes = reference_nodes()
            .into_iter()
            .map(|(name, attrs)| (NodeId::new(name), attrs));

        let err = build_graph(nodes, edges).unwrap_err();
        assert!(matches!(err, crate::FlowError::UnknownNode(id) if id.as_str() == "context_enrichr"));
    }

    #[test]
    fn test_specialist_confidence() {
        let graph = customer_support_workflow().unwrap();
        let attrs = graph.node_attr(&NodeId::new("billing_agent")).unwrap();
        assert_eq!(attrs.extension("confidence").and_then(AttrValue::as_f64), Some(0.92));
        assert_eq!(graph.nodes_of_kind(NodeKind::Specialist).len(), 3);
    }
}
