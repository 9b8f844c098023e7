//! Deterministic processors for simulation and tests.
//!
//! These stand in for the LLM and database calls of a real deployment. The
//! engine already charges each node's cost and average time, so the
//! processors only shape the state: keyword intent classification, a
//! canned user context, a specialist answer whose confidence comes from the
//! node's `confidence` extension, and response formatting.
//!
//! With a time scale set, every step also sleeps for `avg_time_ms × scale`,
//! which makes step and execution timeouts observable.

use crate::processor::{NodeProcessor, PassThrough, ProcessorRegistry, StepContext, StepError};
use crate::state::ExecutionState;
use async_trait::async_trait;
use flowlens_core::NodeKind;
use serde_json::json;
use std::time::Duration;

const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Factory for the simulated processor set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedProcessors {
    time_scale: Option<f64>,
    default_confidence: f64,
}

impl SimulatedProcessors {
    /// Creates processors that do not sleep.
    pub fn new() -> Self {
        Self {
            time_scale: None,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Makes each step sleep for its node's average time multiplied by
    /// `scale`.
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = Some(scale);
        self
    }

    /// Confidence for specialists without a `confidence` extension.
    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }

    /// Builds a registry with one processor per executable node kind.
    pub fn registry(&self) -> ProcessorRegistry {
        let delay = Delay(self.time_scale);
        ProcessorRegistry::new()
            .with_kind(NodeKind::Classifier, Simulated::new(delay, KeywordClassifier))
            .with_kind(NodeKind::Enricher, Simulated::new(delay, CannedContext))
            .with_kind(
                NodeKind::Specialist,
                Simulated::new(delay, SpecialistResponder::new(self.default_confidence)),
            )
            .with_kind(NodeKind::Validator, Simulated::new(delay, PassThrough))
            .with_kind(NodeKind::Formatter, Simulated::new(delay, ResponseFormatter))
    }
}

impl Default for SimulatedProcessors {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
struct Delay(Option<f64>);

impl Delay {
    async fn wait(&self, ctx: &StepContext) {
        let Some(scale) = self.0 else { return };
        let millis = ctx.attrs.avg_time_ms * scale;
        if millis.is_finite() && millis > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(millis / 1000.0)).await;
        }
    }
}

struct Simulated<P> {
    delay: Delay,
    inner: P,
}

impl<P> Simulated<P> {
    fn new(delay: Delay, inner: P) -> Self {
        Self { delay, inner }
    }
}

#[async_trait]
impl<P: NodeProcessor> NodeProcessor for Simulated<P> {
    async fn process(
        &self,
        ctx: &StepContext,
        state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        self.delay.wait(ctx).await;
        self.inner.process(ctx, state).await
    }
}

/// Classifies intent from keywords in the query.
///
/// `bill`, `charge` or `payment` map to `billing`; `technical`, `error` or
/// `bug` map to `technical`; anything else is `account`.
pub fn classify_intent(query: &str) -> &'static str {
    let query = query.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| query.contains(w));
    if mentions(&["bill", "charge", "payment"]) {
        "billing"
    } else if mentions(&["technical", "error", "bug"]) {
        "technical"
    } else {
        "account"
    }
}

/// Keyword intent classifier.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordClassifier;

#[async_trait]
impl NodeProcessor for KeywordClassifier {
    async fn process(
        &self,
        _ctx: &StepContext,
        mut state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        state.intent = Some(classify_intent(&state.query).to_string());
        Ok(state)
    }
}

/// Fills the context with a fixed user profile.
#[derive(Clone, Copy, Debug, Default)]
pub struct CannedContext;

#[async_trait]
impl NodeProcessor for CannedContext {
    async fn process(
        &self,
        _ctx: &StepContext,
        mut state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        state.context.insert("user_tier".to_string(), json!("premium"));
        state
            .context
            .insert("past_issues".to_string(), json!(["billing_q1", "technical_q2"]));
        state
            .context
            .insert("last_contact".to_string(), json!("2024-01-15"));
        Ok(state)
    }
}

/// Answers the query with the node's configured confidence.
#[derive(Clone, Copy, Debug)]
pub struct SpecialistResponder {
    default_confidence: f64,
}

impl SpecialistResponder {
    /// Creates a responder with a fallback confidence.
    pub fn new(default_confidence: f64) -> Self {
        Self { default_confidence }
    }
}

#[async_trait]
impl NodeProcessor for SpecialistResponder {
    async fn process(
        &self,
        ctx: &StepContext,
        mut state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        let label = match state.intent.as_deref() {
            Some("billing") => "Billing response",
            Some("technical") => "Technical support",
            Some("account") => "Account management",
            _ => "Response",
        };
        state.response = format!("{} for: {}", label, state.query);
        state.confidence = ctx
            .attrs
            .extension("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(self.default_confidence);
        Ok(state)
    }
}

/// Marks the response as formatted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseFormatter;

#[async_trait]
impl NodeProcessor for ResponseFormatter {
    async fn process(
        &self,
        _ctx: &StepContext,
        mut state: ExecutionState,
    ) -> Result<ExecutionState, StepError> {
        state.response = format!("[FORMATTED] {}", state.response);
        Ok(state)
    }
}
