//! Execution engine.
//!
//! The engine threads one [`ExecutionState`] through the workflow: it asks
//! the [`StateMachine`] for the next node, resolves and runs that node's
//! processor under the step timeout and the cancellation token, then charges
//! the node's `cost_per_call` and `avg_time_ms` to the state. The whole run
//! is bounded by the execution timeout.
//!
//! # Example
//!
//! ```
//! use flowlens_agent::{ExecutionEngine, SimulatedProcessors};
//! use flowlens_core::reference::customer_support_workflow;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ExecutionEngine::new(
//!     customer_support_workflow()?,
//!     SimulatedProcessors::new().registry(),
//! )?;
//!
//! let state = engine.execute("Why was my bill so high?").await?;
//! assert_eq!(state.intent.as_deref(), Some("billing"));
//! assert!(state.response.starts_with("[FORMATTED]"));
//! # Ok(())
//! # }
//! ```

use crate::cancellation::CancellationToken;
use crate::config::ExecutionConfig;
use crate::error::{ExecutionError, Result};
use crate::machine::{Stage, StateMachine, WorkflowRoles};
use crate::processor::{NodeProcessor, ProcessorRegistry, StepContext};
use crate::routing::{IntentRouter, QualityGate, SuffixIntentRouter};
use crate::state::ExecutionState;
use flowlens_core::{NodeId, WorkflowGraph};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

/// One request to execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Query text
    pub query: String,
    /// Requesting user
    #[serde(default = "default_user")]
    pub user_id: String,
}

fn default_user() -> String {
    "anonymous".to_string()
}

impl ExecutionRequest {
    /// Creates an anonymous request.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: default_user(),
        }
    }

    /// Sets the requesting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

/// Runs requests through a workflow graph.
///
/// The graph is shared and never mutated, so one engine can serve any
/// number of concurrent executions.
pub struct ExecutionEngine {
    graph: Arc<WorkflowGraph>,
    machine: StateMachine,
    registry: ProcessorRegistry,
    router: Arc<dyn IntentRouter>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    /// Creates an engine with the default configuration and the suffix
    /// intent router.
    ///
    /// # Errors
    ///
    /// Fails if the graph lacks a role or edge the state machine needs.
    pub fn new(graph: impl Into<Arc<WorkflowGraph>>, registry: ProcessorRegistry) -> Result<Self> {
        Self::with_config(graph, registry, ExecutionConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(
        graph: impl Into<Arc<WorkflowGraph>>,
        registry: ProcessorRegistry,
        config: ExecutionConfig,
    ) -> Result<Self> {
        let graph = graph.into();
        let roles = WorkflowRoles::resolve(&graph)?;
        let machine = StateMachine::new(
            roles,
            QualityGate::new(config.confidence_threshold),
            config.max_retries,
        );
        Ok(Self {
            graph,
            machine,
            registry,
            router: Arc::new(SuffixIntentRouter::default()),
            config,
        })
    }

    /// Replaces the intent router.
    pub fn with_router(mut self, router: impl IntentRouter + 'static) -> Self {
        self.router = Arc::new(router);
        self
    }

    /// The workflow graph.
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// The resolved workflow roles.
    pub fn roles(&self) -> &WorkflowRoles {
        self.machine.roles()
    }

    /// The engine configuration.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Executes an anonymous query.
    pub async fn execute(&self, query: impl Into<String>) -> Result<ExecutionState> {
        self.execute_request(ExecutionRequest::new(query), None).await
    }

    /// Executes a request, optionally under a cancellation token.
    ///
    /// # Returns
    ///
    /// - `Ok(state)` - The final state after the formatter ran
    /// - `Err(ExecutionError)` - The execution failed; nothing is retried
    pub async fn execute_request(
        &self,
        request: ExecutionRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ExecutionState> {
        let state = ExecutionState::new(request.query).with_user(request.user_id);
        let span = info_span!("execution", id = %state.execution_id());

        async {
            let run = self.run(state, cancel.as_ref());
            let result = match self.config.timeouts.execution_timeout {
                Some(limit) => tokio::time::timeout(limit.duration(), run)
                    .await
                    .unwrap_or_else(|_| {
                        Err(ExecutionError::ExecutionTimeout {
                            timeout: limit.duration(),
                        })
                    }),
                None => run.await,
            };

            match &result {
                Ok(state) => info!(
                    intent = ?state.intent,
                    steps = state.path_taken().len(),
                    retries = state.retry_count(),
                    cost = state.accumulated_cost(),
                    time_ms = state.accumulated_time_ms(),
                    "Execution completed"
                ),
                Err(e) => error!(error = %e, "Execution failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        mut state: ExecutionState,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExecutionState> {
        let mut stage = Stage::Start;
        loop {
            stage = self
                .machine
                .next(&stage, &mut state, &self.graph, self.router.as_ref())?;
            let Stage::Node(node) = &stage else {
                return Ok(state);
            };
            state = self.run_step(node, state, cancel).await?;
        }
    }

    async fn run_step(
        &self,
        node: &NodeId,
        state: ExecutionState,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExecutionState> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(ExecutionError::Cancelled { node: node.clone() });
        }

        let attrs = self.graph.node_attr(node)?.clone();
        let processor = self
            .registry
            .resolve(node, attrs.kind)
            .ok_or_else(|| ExecutionError::NoProcessor(node.clone()))?;
        let ctx = StepContext {
            node: node.clone(),
            attrs,
            attempt: state.retry_count(),
        };
        debug!(node = %node, attempt = ctx.attempt, "Running step");

        let step = self.bounded_step(processor.as_ref(), &ctx, state);
        let mut state = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(ExecutionError::Cancelled { node: node.clone() });
                }
                outcome = step => outcome?,
            },
            None => step.await?,
        };

        state.complete_step(node, ctx.attrs.cost_per_call, ctx.attrs.avg_time_ms);
        Ok(state)
    }

    async fn bounded_step(
        &self,
        processor: &dyn NodeProcessor,
        ctx: &StepContext,
        state: ExecutionState,
    ) -> Result<ExecutionState> {
        let step = processor.process(ctx, state);
        let outcome = match self.config.timeouts.step_timeout {
            Some(limit) => tokio::time::timeout(limit.duration(), step)
                .await
                .map_err(|_| ExecutionError::StepTimeout {
                    node: ctx.node.clone(),
                    timeout: limit.duration(),
                })?,
            None => step.await,
        };
        outcome.map_err(|e| ExecutionError::StepFailed {
            node: ctx.node.clone(),
            message: e.0,
        })
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("roles", self.machine.roles())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{FnProcessor, PassThrough, StepError};
    use crate::simulate::SimulatedProcessors;
    use flowlens_core::reference::customer_support_workflow;
    use flowlens_core::NodeKind;

    fn engine(registry: ProcessorRegistry) -> ExecutionEngine {
        ExecutionEngine::new(customer_support_workflow().unwrap(), registry).unwrap()
    }

    #[tokio::test]
    async fn test_billing_path_charges_node_costs() {
        let state = engine(SimulatedProcessors::new().registry())
            .execute("I have a question about my bill")
            .await
            .unwrap();

        let path: Vec<&str> = state.path_taken().iter().map(NodeId::as_str).collect();
        assert_eq!(
            path,
            [
                "intent_classifier",
                "context_enricher",
                "billing_agent",
                "quality_check",
                "response_formatter"
            ]
        );
        assert!((state.accumulated_cost() - 0.021).abs() < 1e-12);
        assert!((state.accumulated_time_ms() - 3100.0).abs() < 1e-9);
        assert_eq!(state.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_processor() {
        let registry = ProcessorRegistry::new().with_kind(NodeKind::Classifier, PassThrough);
        let err = engine(registry).execute("q").await.unwrap_err();
        assert!(matches!(err, ExecutionError::NoProcessor(node) if node.as_str() == "context_enricher"));
    }

    #[tokio::test]
    async fn test_step_failure_is_fatal() {
        let registry = SimulatedProcessors::new().registry().with_node(
            "context_enricher",
            FnProcessor::new(|_ctx, _state| async move { Err(StepError::new("db down")) }),
        );
        let err = engine(registry).execute("q").await.unwrap_err();
        assert_eq!(err.to_string(), "Step 'context_enricher' failed: db down");
    }

    #[tokio::test]
    async fn test_processor_sees_retry_attempt() {
        let registry = SimulatedProcessors::new().registry().with_node(
            "account_agent",
            FnProcessor::new(|ctx, mut state| async move {
                state.response = "ok".to_string();
                state.confidence = if ctx.attempt == 0 { 0.2 } else { 0.9 };
                Ok(state)
            }),
        );
        let state = engine(registry).execute("reset my password").await.unwrap();
        assert_eq!(state.retry_count(), 1);
        assert_eq!(state.path_taken().len(), 9);
        assert_eq!(state.response, "[FORMATTED] ok");
    }

    #[test]
    fn test_malformed_graph_rejected_at_construction() {
        let graph = flowlens_core::GraphBuilder::new()
            .node("in", flowlens_core::NodeAttrs::new(NodeKind::Entry))
            .node("out", flowlens_core::NodeAttrs::new(NodeKind::Exit))
            .edge("in", "out", 1.0)
            .build()
            .unwrap();
        let err = ExecutionEngine::new(graph, ProcessorRegistry::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::MalformedWorkflow(_)));
    }
}
