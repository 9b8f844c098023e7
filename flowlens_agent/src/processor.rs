//! Node processing steps.
//!
//! A [`NodeProcessor`] does the actual work of one node: classifying,
//! enriching, answering, validating or formatting. The engine owns routing
//! and bookkeeping; processors only transform the state they are handed.
//!
//! Processors are resolved through a [`ProcessorRegistry`], which checks
//! for a processor registered on the node id first and falls back to the
//! node's kind.

use crate::state::ExecutionState;
use async_trait::async_trait;
use flowlens_core::{NodeAttrs, NodeId, NodeKind};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Failure reported by a processor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StepError(pub String);

impl StepError {
    /// Creates a new step error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What a processor knows about the node it is running for.
#[derive(Clone, Debug)]
pub struct StepContext {
    /// Node being processed
    pub node: NodeId,
    /// The node's attributes
    pub attrs: NodeAttrs,
    /// Retries performed so far in this execution
    pub attempt: u32,
}

/// Processing logic for one node.
///
/// The state is moved in and out, so a step has exclusive access to it.
#[async_trait]
pub trait NodeProcessor: Send + Sync {
    /// Processes the state for one node.
    ///
    /// # Returns
    ///
    /// - `Ok(state)` - The updated state
    /// - `Err(StepError)` - The step failed; the execution ends
    async fn process(
        &self,
        ctx: &StepContext,
        state: ExecutionState,
    ) -> Result<ExecutionState, StepError>;
}

type StepFuture = Pin<Box<dyn Future<Output = Result<ExecutionState, StepError>> + Send>>;
type BoxedStep = Box<dyn Fn(StepContext, ExecutionState) -> StepFuture + Send + Sync>;

/// Processor backed by an async closure.
///
/// # Example
///
/// ```
/// use flowlens_agent::FnProcessor;
///
/// let low_confidence = FnProcessor::new(|_ctx, mut state| async move {
///     state.confidence = 0.2;
///     Ok(state)
/// });
/// ```
pub struct FnProcessor {
    f: BoxedStep,
}

impl FnProcessor {
    /// Creates a new FnProcessor from an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(StepContext, ExecutionState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ExecutionState, StepError>> + Send + 'static,
    {
        Self {
            f: Box::new(move |ctx, state| Box::pin(f(ctx, state)) as StepFuture),
        }
    }
}

#[async_trait]
impl NodeProcessor for FnProcessor {
    async fn process(
        &self,
        ctx: &StepContext,
        state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        (self.f)(ctx.clone(), state).await
    }
}

/// Processor that passes the state through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

#[async_trait]
impl NodeProcessor for PassThrough {
    async fn process(
        &self,
        _ctx: &StepContext,
        state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        Ok(state)
    }
}

/// Lookup table from nodes and node kinds to processors.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    by_node: HashMap<NodeId, Arc<dyn NodeProcessor>>,
    by_kind: HashMap<NodeKind, Arc<dyn NodeProcessor>>,
}

impl ProcessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor for every node of a kind.
    pub fn with_kind(mut self, kind: NodeKind, processor: impl NodeProcessor + 'static) -> Self {
        self.by_kind.insert(kind, Arc::new(processor));
        self
    }

    /// Registers a processor for one node, overriding its kind's processor.
    pub fn with_node(mut self, node: impl Into<NodeId>, processor: impl NodeProcessor + 'static) -> Self {
        self.by_node.insert(node.into(), Arc::new(processor));
        self
    }

    /// Resolves the processor for a node.
    pub fn resolve(&self, node: &NodeId, kind: NodeKind) -> Option<Arc<dyn NodeProcessor>> {
        self.by_node
            .get(node)
            .or_else(|| self.by_kind.get(&kind))
            .cloned()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("nodes", &self.by_node.keys().collect::<Vec<_>>())
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .finish()
    }
}
