//! Execution configuration.

use crate::error::{ExecutionError, Result};
use crate::timeout::TimeoutConfig;
use flowlens_core::FlowError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the execution engine.
///
/// Missing fields in a YAML document take their defaults:
///
/// ```
/// use flowlens_agent::ExecutionConfig;
///
/// let config = ExecutionConfig::from_yaml_str("max_retries: 1").unwrap();
/// assert_eq!(config.max_retries, 1);
/// assert_eq!(config.confidence_threshold, 0.5);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Validator-to-classifier retries allowed before the execution fails
    pub max_retries: u32,
    /// Responses below this confidence are sent back to the classifier
    pub confidence_threshold: f64,
    /// Step and execution time limits
    pub timeouts: TimeoutConfig,
}

impl ExecutionConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML.
    ///
    /// Parse failures surface as [`ExecutionError::Graph`] wrapping
    /// [`FlowError::Yaml`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ExecutionError::Graph(FlowError::from(e)))
    }

    /// Loads a configuration from a YAML file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| ExecutionError::Graph(FlowError::from(e)))?;
        Self::from_yaml_str(&content)
    }

    /// Sets the retry bound.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Sets the timeouts.
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            confidence_threshold: 0.5,
            timeouts: TimeoutConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeout::StepTimeout;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.timeouts, TimeoutConfig::new());
    }

    #[test]
    fn test_nested_timeouts() {
        let yaml = "confidence_threshold: 0.7\ntimeouts:\n  step_timeout: 1500\n";
        let config = ExecutionConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.timeouts.step_timeout, Some(StepTimeout::from_millis(1500)));
        assert!(config.timeouts.execution_timeout.is_some());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ExecutionConfig::from_yaml_str("max_retries: many").unwrap_err();
        assert!(matches!(err, ExecutionError::Graph(FlowError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExecutionConfig::from_file(dir.path().join("absent.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Graph(FlowError::Io(_))));
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_retries: 0").unwrap();
        let config = ExecutionConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.max_retries, 0);
    }
}
