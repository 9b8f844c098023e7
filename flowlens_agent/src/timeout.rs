//! Timeout configuration for steps and executions.
//!
//! A step timeout bounds one node's processing step and an execution
//! timeout bounds the whole run. Both are enforced with `tokio::time` and
//! either one failing ends the execution. Durations are written as
//! milliseconds in configuration files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Time limit for a single node's processing step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepTimeout(Duration);

impl StepTimeout {
    /// Creates a new StepTimeout with the specified duration.
    ///
    /// # Example
    ///
    /// ```
    /// use flowlens_agent::timeout::StepTimeout;
    /// use std::time::Duration;
    ///
    /// let timeout = StepTimeout::new(Duration::from_secs(10));
    /// assert_eq!(timeout.duration(), Duration::from_secs(10));
    /// ```
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Creates a StepTimeout from seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Creates a StepTimeout from milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Returns the timeout duration.
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for StepTimeout {
    /// Default timeout is 30 seconds.
    fn default() -> Self {
        Self(Duration::from_secs(30))
    }
}

/// Time limit for a whole execution, retries included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionTimeout(Duration);

impl ExecutionTimeout {
    /// Creates a new ExecutionTimeout with the specified duration.
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Creates an ExecutionTimeout from seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Creates an ExecutionTimeout from milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Returns the timeout duration.
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for ExecutionTimeout {
    /// Default timeout is 5 minutes.
    fn default() -> Self {
        Self(Duration::from_secs(300))
    }
}

macro_rules! millis_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u64(self.0.as_millis() as u64)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                u64::deserialize(deserializer).map(Self::from_millis)
            }
        }
    };
}

millis_serde!(StepTimeout);
millis_serde!(ExecutionTimeout);

/// Combined timeout configuration.
///
/// `None` disables a limit.
///
/// # Example
///
/// ```
/// use flowlens_agent::timeout::TimeoutConfig;
///
/// let config = TimeoutConfig::new();
/// assert!(config.step_timeout.is_some());
///
/// let config = TimeoutConfig::no_timeouts();
/// assert!(config.step_timeout.is_none());
/// assert!(config.execution_timeout.is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Optional per-step limit
    pub step_timeout: Option<StepTimeout>,
    /// Optional whole-execution limit
    pub execution_timeout: Option<ExecutionTimeout>,
}

impl TimeoutConfig {
    /// Creates a TimeoutConfig with default limits (30s step, 5m execution).
    pub fn new() -> Self {
        Self {
            step_timeout: Some(StepTimeout::default()),
            execution_timeout: Some(ExecutionTimeout::default()),
        }
    }

    /// Creates a TimeoutConfig with both limits disabled.
    pub fn no_timeouts() -> Self {
        Self {
            step_timeout: None,
            execution_timeout: None,
        }
    }

    /// Sets the step limit.
    pub fn with_step_timeout(mut self, timeout: StepTimeout) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Sets the execution limit.
    pub fn with_execution_timeout(mut self, timeout: ExecutionTimeout) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::new()
    }
}
