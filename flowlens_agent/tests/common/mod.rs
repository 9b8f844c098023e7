//! Shared helpers for execution tests.

use flowlens_agent::{
    ExecutionConfig, ExecutionEngine, FnProcessor, ProcessorRegistry, SimulatedProcessors,
    TimeoutConfig,
};
use flowlens_core::reference::customer_support_workflow;

/// Engine over the reference workflow with simulated processors.
pub fn reference_engine(config: ExecutionConfig) -> ExecutionEngine {
    engine_with(SimulatedProcessors::new().registry(), config)
}

/// Engine over the reference workflow with the given processors.
pub fn engine_with(registry: ProcessorRegistry, config: ExecutionConfig) -> ExecutionEngine {
    ExecutionEngine::with_config(customer_support_workflow().unwrap(), registry, config)
        .expect("reference workflow is executable")
}

/// Simulated processors whose steps sleep for each node's average time.
pub fn timed_engine(timeouts: TimeoutConfig) -> ExecutionEngine {
    engine_with(
        SimulatedProcessors::new().with_time_scale(1.0).registry(),
        ExecutionConfig::default().with_timeouts(timeouts),
    )
}

/// Specialist that always answers with the given confidence.
pub fn fixed_confidence(confidence: f64) -> FnProcessor {
    FnProcessor::new(move |_ctx, mut state| async move {
        state.response = "answer".to_string();
        state.confidence = confidence;
        Ok(state)
    })
}
