//! Concurrent execution of independent requests.
//!
//! Each request gets its own [`ExecutionState`], so requests run fully in
//! parallel on a `JoinSet` and share nothing but the read-only engine.

use crate::engine::{ExecutionEngine, ExecutionRequest};
use crate::error::{ExecutionError, Result};
use crate::state::ExecutionState;
use flowlens_core::cost::safe_ratio;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Aggregate figures over a batch.
///
/// Averages are taken over successful executions only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Requests in the batch
    pub count: usize,
    /// Executions that completed
    pub succeeded: usize,
    /// Executions that failed
    pub failed: usize,
    /// Average accumulated cost
    pub avg_cost: f64,
    /// Average accumulated time, in milliseconds
    pub avg_time_ms: f64,
    /// Total accumulated cost
    pub total_cost: f64,
    /// Average cost per classified intent, in first-seen order
    pub avg_cost_by_intent: IndexMap<String, f64>,
}

impl BatchSummary {
    /// Summarizes a set of execution results.
    pub fn from_results(results: &[Result<ExecutionState>]) -> Self {
        let completed: Vec<&ExecutionState> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let succeeded = completed.len();
        let total_cost: f64 = completed.iter().map(|s| s.accumulated_cost()).sum();
        let total_time: f64 = completed.iter().map(|s| s.accumulated_time_ms()).sum();

        let mut by_intent: IndexMap<String, (f64, usize)> = IndexMap::new();
        for state in &completed {
            let intent = state.intent.clone().unwrap_or_else(|| "unknown".to_string());
            let entry = by_intent.entry(intent).or_insert((0.0, 0));
            entry.0 += state.accumulated_cost();
            entry.1 += 1;
        }

        Self {
            count: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            avg_cost: safe_ratio(total_cost, succeeded as f64),
            avg_time_ms: safe_ratio(total_time, succeeded as f64),
            total_cost,
            avg_cost_by_intent: by_intent
                .into_iter()
                .map(|(intent, (cost, n))| (intent, safe_ratio(cost, n as f64)))
                .collect(),
        }
    }
}

/// Results of a batch, in request order.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per request
    pub results: Vec<Result<ExecutionState>>,
    /// Aggregate figures
    pub summary: BatchSummary,
}

impl ExecutionEngine {
    /// Executes independent requests concurrently.
    ///
    /// Results keep the order of `requests`. A failing request does not
    /// affect the others.
    pub async fn execute_batch(self: &Arc<Self>, requests: Vec<ExecutionRequest>) -> BatchOutcome {
        let count = requests.len();
        let mut set = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let engine = Arc::clone(self);
            set.spawn(async move { (index, engine.execute_request(request, None).await) });
        }

        let mut slots: Vec<Option<Result<ExecutionState>>> = (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "Batch task did not complete"),
            }
        }

        let results: Vec<Result<ExecutionState>> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(ExecutionError::Panicked(format!(
                        "request {} did not complete",
                        index
                    )))
                })
            })
            .collect();

        let summary = BatchSummary::from_results(&results);
        info!(
            count = summary.count,
            succeeded = summary.succeeded,
            failed = summary.failed,
            avg_cost = summary.avg_cost,
            "Batch completed"
        );
        BatchOutcome { results, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::SimulatedProcessors;
    use flowlens_core::reference::customer_support_workflow;

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_results(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.avg_cost, 0.0);
        assert!(summary.avg_cost_by_intent.is_empty());
    }

    #[tokio::test]
    async fn test_batch_keeps_request_order() {
        let engine = Arc::new(
            ExecutionEngine::new(
                customer_support_workflow().unwrap(),
                SimulatedProcessors::new().registry(),
            )
            .unwrap(),
        );
        let outcome = engine
            .execute_batch(vec![
                ExecutionRequest::new("I was charged twice"),
                ExecutionRequest::new("the app shows an error"),
                ExecutionRequest::new("update my address").with_user("user_7"),
            ])
            .await;

        let intents: Vec<_> = outcome
            .results
            .iter()
            .map(|r| r.as_ref().unwrap().intent.clone().unwrap())
            .collect();
        assert_eq!(intents, ["billing", "technical", "account"]);
        assert_eq!(outcome.results[2].as_ref().unwrap().user_id, "user_7");

        let summary = &outcome.summary;
        assert_eq!(summary.succeeded, 3);
        assert!((summary.total_cost - 0.065).abs() < 1e-12);
        assert!((summary.avg_cost - 0.065 / 3.0).abs() < 1e-12);
        assert!((summary.avg_cost_by_intent["technical"] - 0.026).abs() < 1e-12);
    }
}
