//! Routing functions for the conditional transitions.
//!
//! Two transitions depend on data: the enricher picks a specialist from the
//! classified intent, and the validator either accepts the response or
//! sends the request back to the classifier.

use crate::state::ExecutionState;
use flowlens_core::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Chooses the specialist that handles a request.
pub trait IntentRouter: Send + Sync {
    /// Returns the specialist for the state's intent, or `None` if the
    /// intent cannot be routed at all.
    fn route(&self, state: &ExecutionState) -> Option<NodeId>;
}

/// Routes intent `x` to node `x_agent`.
///
/// # Example
///
/// ```
/// use flowlens_agent::{ExecutionState, IntentRouter, SuffixIntentRouter};
///
/// let mut state = ExecutionState::new("Why was I charged twice?");
/// state.intent = Some("billing".to_string());
/// let target = SuffixIntentRouter::default().route(&state).unwrap();
/// assert_eq!(target.as_str(), "billing_agent");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuffixIntentRouter {
    suffix: String,
}

impl SuffixIntentRouter {
    /// Creates a router appending `suffix` to the intent.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Default for SuffixIntentRouter {
    fn default() -> Self {
        Self::new("_agent")
    }
}

impl IntentRouter for SuffixIntentRouter {
    fn route(&self, state: &ExecutionState) -> Option<NodeId> {
        let intent = state.intent.as_deref()?;
        Some(NodeId::new(format!("{}{}", intent, self.suffix)))
    }
}

/// Routes intents through an explicit table, with an optional fallback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableIntentRouter {
    routes: IndexMap<String, NodeId>,
    fallback: Option<NodeId>,
}

impl TableIntentRouter {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an intent to a specialist.
    pub fn with_route(mut self, intent: impl Into<String>, node: impl Into<NodeId>) -> Self {
        self.routes.insert(intent.into(), node.into());
        self
    }

    /// Specialist used for intents missing from the table.
    pub fn with_fallback(mut self, node: impl Into<NodeId>) -> Self {
        self.fallback = Some(node.into());
        self
    }
}

impl IntentRouter for TableIntentRouter {
    fn route(&self, state: &ExecutionState) -> Option<NodeId> {
        state
            .intent
            .as_deref()
            .and_then(|intent| self.routes.get(intent))
            .or(self.fallback.as_ref())
            .cloned()
    }
}

/// Outcome of the validator's routing decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    /// Continue to the formatter
    Accept,
    /// Return to the classifier
    Retry,
}

/// Compares response confidence against a fixed threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityGate {
    threshold: f64,
}

impl QualityGate {
    /// Creates a gate; confidences below `threshold` are retried.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decides whether the response is good enough.
    pub fn decide(&self, state: &ExecutionState) -> GateDecision {
        if state.confidence < self.threshold {
            GateDecision::Retry
        } else {
            GateDecision::Accept
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(0.5)
    }
}
