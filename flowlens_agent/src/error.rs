//! Error types for workflow execution.

use flowlens_core::{FlowError, NodeId};
use std::time::Duration;

/// Errors that end an execution.
///
/// Every variant is fatal for the execution that raised it. The bounded
/// validator-to-classifier retry is a workflow transition, not an error,
/// and nothing here is retried automatically.
#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    /// The intent router chose a node that cannot handle the request.
    #[error("Routing error: {0}")]
    Routing(String),

    /// The validator kept rejecting responses after the retry bound.
    #[error("Retry limit exceeded after {retries} retries (path: {})", format_path(.path))]
    RetryLimitExceeded {
        /// Retries performed before giving up
        retries: u32,
        /// Nodes visited up to the failure
        path: Vec<NodeId>,
    },

    /// A node's processing step exceeded its time limit.
    #[error("Step '{node}' exceeded timeout limit of {timeout:?}")]
    StepTimeout {
        /// Node whose step timed out
        node: NodeId,
        /// Configured limit
        timeout: Duration,
    },

    /// The whole execution exceeded its time limit.
    #[error("Execution exceeded timeout limit of {timeout:?}")]
    ExecutionTimeout {
        /// Configured limit
        timeout: Duration,
    },

    /// The execution was cancelled through its token.
    #[error("Execution cancelled at '{node}'")]
    Cancelled {
        /// Node that was about to run or running
        node: NodeId,
    },

    /// A node processor reported a failure.
    #[error("Step '{node}' failed: {message}")]
    StepFailed {
        /// Failing node
        node: NodeId,
        /// Processor message
        message: String,
    },

    /// No processor is registered for a node or its kind.
    #[error("No processor registered for node '{0}'")]
    NoProcessor(NodeId),

    /// The graph lacks a role or edge the state machine needs.
    #[error("Malformed workflow: {0}")]
    MalformedWorkflow(String),

    /// A spawned execution panicked.
    #[error("Execution task panicked: {0}")]
    Panicked(String),

    /// Graph lookup or configuration loading failed.
    #[error(transparent)]
    Graph(#[from] FlowError),
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Type alias for Result with ExecutionError.
pub type Result<T> = std::result::Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_limit_display() {
        let err = ExecutionError::RetryLimitExceeded {
            retries: 3,
            path: vec![NodeId::new("intent_classifier"), NodeId::new("quality_check")],
        };
        assert_eq!(
            err.to_string(),
            "Retry limit exceeded after 3 retries (path: intent_classifier → quality_check)"
        );
    }

    #[test]
    fn test_step_timeout_display() {
        let err = ExecutionError::StepTimeout {
            node: NodeId::new("billing_agent"),
            timeout: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("billing_agent"));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_graph_error_is_transparent() {
        let err: ExecutionError = FlowError::UnknownNode(NodeId::new("ghost")).into();
        assert_eq!(err.to_string(), "Unknown node: ghost");
    }
}
