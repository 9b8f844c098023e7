//! Error types for FlowLens.

use crate::types::NodeId;

/// Main error type for FlowLens graph construction and analysis.
///
/// All core operations return `Result<T> = std::result::Result<T, FlowError>`.
/// Construction errors are fatal; [`FlowError::NoPath`] is the only variant
/// analysis callers are expected to recover from.
#[derive(thiserror::Error, Debug)]
pub enum FlowError {
    /// A node with this identifier already exists.
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// Referenced node is not part of the graph.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Edge weight outside [0, 1].
    #[error("Invalid weight {weight} on edge {source_node} -> {target}")]
    InvalidWeight {
        /// Edge source
        source_node: NodeId,
        /// Edge target
        target: NodeId,
        /// Offending weight
        weight: f64,
    },

    /// Node attribute is negative or not finite.
    #[error("Invalid attribute '{attribute}' on node {node}: {value}")]
    InvalidAttribute {
        /// Node carrying the attribute
        node: NodeId,
        /// Attribute name
        attribute: &'static str,
        /// Offending value
        value: f64,
    },

    /// Outgoing weights of a branching node do not sum to 1.0.
    #[error("Outgoing weights of {node} sum to {sum}, expected 1.0")]
    BranchWeightMismatch {
        /// Branching node
        node: NodeId,
        /// Actual sum of outgoing weights
        sum: f64,
    },

    /// The graph must contain exactly one entry and one exit node.
    #[error("Expected exactly one entry and one exit node, found {entries} entries and {exits} exits")]
    EntryExitCardinality {
        /// Number of entry nodes
        entries: usize,
        /// Number of exit nodes
        exits: usize,
    },

    /// No simple path connects the two nodes.
    #[error("No path from {from} to {to}")]
    NoPath {
        /// Path start
        from: NodeId,
        /// Path end
        to: NodeId,
    },

    /// Workflow definition document is malformed.
    #[error("Invalid workflow definition: {0}")]
    Definition(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result with FlowError.
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::UnknownNode(NodeId::new("ghost"));
        assert_eq!(err.to_string(), "Unknown node: ghost");
    }

    #[test]
    fn test_weight_error_display() {
        let err = FlowError::InvalidWeight {
            source_node: NodeId::new("a"),
            target: NodeId::new("b"),
            weight: 1.5,
        };
        assert_eq!(err.to_string(), "Invalid weight 1.5 on edge a -> b");
    }

    #[test]
    fn test_no_path_display() {
        let err = FlowError::NoPath {
            from: NodeId::new("input"),
            to: NodeId::new("output"),
        };
        assert!(err.to_string().contains("input"));
        assert!(err.to_string().contains("output"));
    }
}
