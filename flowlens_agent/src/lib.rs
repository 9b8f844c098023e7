//! FlowLens Agent - Workflow Execution
//!
//! Runs requests through a workflow graph as a conditional-routing state
//! machine. The engine owns routing, timeouts, cancellation and cost/time
//! bookkeeping; the work done at each node is injected through
//! [`NodeProcessor`] implementations.
//!
//! # Overview
//!
//! - **State machine**: classifier → enricher → routed specialist → validator
//!   → formatter, with a bounded validator-to-classifier retry
//! - **Processors**: async trait, closure adapter, registry by node or kind
//! - **Limits**: per-step and per-execution timeouts, cooperative cancellation
//! - **Batches**: independent requests executed concurrently
//!
//! # Quick Start
//!
//! ```rust
//! use flowlens_agent::{ExecutionEngine, ExecutionError, FnProcessor, SimulatedProcessors};
//! use flowlens_core::reference::customer_support_workflow;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = SimulatedProcessors::new().registry().with_node(
//!     "technical_agent",
//!     FnProcessor::new(|_ctx, mut state| async move {
//!         state.confidence = 0.1;
//!         Ok(state)
//!     }),
//! );
//! let engine = ExecutionEngine::new(customer_support_workflow().unwrap(), registry).unwrap();
//!
//! let err = engine.execute("technical question").await.unwrap_err();
//! assert!(matches!(err, ExecutionError::RetryLimitExceeded { retries: 3, .. }));
//! # }
//! ```
//!
//! # Modules
//!
//! - [`engine`]: Execution engine and requests
//! - [`machine`]: Role resolution and transitions
//! - [`processor`]: Node processor trait and registry
//! - [`routing`]: Intent routers and the quality gate
//! - [`state`]: Per-request execution state
//! - [`timeout`]: Step and execution time limits
//! - [`cancellation`]: Cancellation tokens
//! - [`batch`]: Concurrent batches
//! - [`simulate`]: Deterministic processors
//! - [`config`]: Execution configuration

pub mod error;
pub mod state;

pub mod machine;
pub mod processor;
pub mod routing;

pub mod cancellation;
pub mod timeout;

pub mod batch;
pub mod config;
pub mod engine;
pub mod simulate;

// Re-export commonly used types
pub use error::{ExecutionError, Result};
pub use state::{ExecutionState, StepRecord};

pub use batch::{BatchOutcome, BatchSummary};
pub use cancellation::{CancellationToken, CancellationTokenSource};
pub use config::ExecutionConfig;
pub use engine::{ExecutionEngine, ExecutionRequest};
pub use machine::{Stage, StateMachine, WorkflowRoles};
pub use processor::{FnProcessor, NodeProcessor, PassThrough, ProcessorRegistry, StepContext, StepError};
pub use routing::{GateDecision, IntentRouter, QualityGate, SuffixIntentRouter, TableIntentRouter};
pub use simulate::SimulatedProcessors;
pub use timeout::{ExecutionTimeout, StepTimeout, TimeoutConfig};

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
