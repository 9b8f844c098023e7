//! Per-request execution state.
//!
//! An [`ExecutionState`] is created when a request enters the workflow and
//! is moved through each node's processing step. Processors may rewrite
//! the free-form fields (intent, context, response, confidence), but the
//! path and the cost/time accumulators only grow: they are private and
//! change exclusively through [`ExecutionState::charge`] and the engine's
//! step bookkeeping.

use chrono::{DateTime, Utc};
use flowlens_core::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One completed processing step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Node that ran
    pub node: NodeId,
    /// Accumulated cost after the step
    pub accumulated_cost: f64,
    /// Accumulated time after the step, in milliseconds
    pub accumulated_time_ms: f64,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

/// Mutable record for one in-flight request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionState {
    execution_id: Uuid,
    /// Requesting user
    pub user_id: String,
    /// Original query text
    pub query: String,
    /// Classified intent
    pub intent: Option<String>,
    /// Key-value bag filled by enrichment
    pub context: IndexMap<String, Value>,
    /// Current response text
    pub response: String,
    /// Confidence in the current response, in [0, 1]
    pub confidence: f64,
    accumulated_cost: f64,
    accumulated_time_ms: f64,
    path_taken: Vec<NodeId>,
    retry_count: u32,
    trace: Vec<StepRecord>,
    started_at: DateTime<Utc>,
}

impl ExecutionState {
    /// Creates a fresh state for a query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            user_id: "anonymous".to_string(),
            query: query.into(),
            intent: None,
            context: IndexMap::new(),
            response: String::new(),
            confidence: 0.0,
            accumulated_cost: 0.0,
            accumulated_time_ms: 0.0,
            path_taken: Vec::new(),
            retry_count: 0,
            trace: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Sets the requesting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Unique id of this execution.
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Total cost charged so far.
    pub fn accumulated_cost(&self) -> f64 {
        self.accumulated_cost
    }

    /// Total time charged so far, in milliseconds.
    pub fn accumulated_time_ms(&self) -> f64 {
        self.accumulated_time_ms
    }

    /// Nodes visited so far, in order.
    pub fn path_taken(&self) -> &[NodeId] {
        &self.path_taken
    }

    /// Validator-triggered retries performed so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Per-step accumulator snapshots.
    pub fn trace(&self) -> &[StepRecord] {
        &self.trace
    }

    /// When the execution started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Adds cost and time on top of what the engine charges for a node.
    ///
    /// Negative or non-finite amounts are ignored so the accumulators
    /// never decrease.
    pub fn charge(&mut self, cost: f64, time_ms: f64) {
        if cost.is_finite() && cost > 0.0 {
            self.accumulated_cost += cost;
        }
        if time_ms.is_finite() && time_ms > 0.0 {
            self.accumulated_time_ms += time_ms;
        }
    }

    /// Charges a node's cost and appends it to the path and trace.
    pub(crate) fn complete_step(&mut self, node: &NodeId, cost: f64, time_ms: f64) {
        self.charge(cost, time_ms);
        self.path_taken.push(node.clone());
        self.trace.push(StepRecord {
            node: node.clone(),
            accumulated_cost: self.accumulated_cost,
            accumulated_time_ms: self.accumulated_time_ms,
            completed_at: Utc::now(),
        });
    }

    pub(crate) fn record_retry(&mut self) {
        self.retry_count += 1;
    }
}
