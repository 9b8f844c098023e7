//! Analysis configuration.
//!
//! Every field has a default matching the customer support reference
//! workload, so an empty YAML document is a valid configuration.

use crate::cost::ContributionStrategy;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named request volume used for cost projections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleTier {
    /// Display name
    pub name: String,
    /// Requests per month
    pub monthly_requests: u64,
}

impl ScaleTier {
    /// Creates a new tier.
    pub fn new(name: impl Into<String>, monthly_requests: u64) -> Self {
        Self {
            name: name.into(),
            monthly_requests,
        }
    }

    /// The four default tiers, from 10K to 10M requests per month.
    pub fn defaults() -> Vec<ScaleTier> {
        vec![
            ScaleTier::new("Small", 10_000),
            ScaleTier::new("Medium", 100_000),
            ScaleTier::new("Large", 1_000_000),
            ScaleTier::new("Enterprise", 10_000_000),
        ]
    }
}

/// A what-if optimization applied to the primary bottleneck.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name
    pub name: String,
    /// Factor applied to the node's average time
    pub time_multiplier: f64,
    /// Factor applied to the node's per-call cost
    pub cost_multiplier: f64,
}

impl Scenario {
    /// Creates a new scenario.
    pub fn new(name: impl Into<String>, time_multiplier: f64, cost_multiplier: f64) -> Self {
        Self {
            name: name.into(),
            time_multiplier,
            cost_multiplier,
        }
    }

    /// Caching, prompt optimization and model substitution.
    pub fn defaults() -> Vec<Scenario> {
        vec![
            Scenario::new("Add caching (80% hit rate)", 0.2, 0.2),
            Scenario::new("Add caching (50% hit rate)", 0.5, 0.5),
            Scenario::new("Optimize prompt", 0.7, 0.7),
            Scenario::new("Use faster model", 0.8, 0.6),
        ]
    }
}

/// Score thresholds for bottleneck severity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    /// Scores above this are critical
    pub critical: f64,
    /// Scores above this are moderate
    pub moderate: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 0.5,
            moderate: 0.2,
        }
    }
}

/// Configuration for [`analyze`](crate::analyze) and
/// [`project_costs`](crate::project_costs).
///
/// # Example
///
/// ```
/// use flowlens_core::AnalysisConfig;
///
/// let config = AnalysisConfig::from_yaml_str("critical_path_count: 3\n")?;
/// assert_eq!(config.critical_path_count, 3);
/// assert_eq!(config.scale_tiers.len(), 4);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of slowest paths reported
    pub critical_path_count: usize,
    /// Volumes for cost projections
    pub scale_tiers: Vec<ScaleTier>,
    /// What-if scenarios for the primary bottleneck
    pub scenarios: Vec<Scenario>,
    /// Cost multiplier applied to the top cost driver
    pub optimization_multiplier: f64,
    /// Cache hit rates simulated on the optimization target
    pub cache_hit_rates: Vec<f64>,
    /// Severity thresholds
    pub severity: SeverityThresholds,
    /// How node cost contributions are weighted
    pub contribution_strategy: ContributionStrategy,
    /// Enumerate paths on the rayon pool
    pub parallel_paths: bool,
    /// Monthly volume used for savings figures
    pub reference_monthly_volume: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_path_count: 5,
            scale_tiers: ScaleTier::defaults(),
            scenarios: Scenario::defaults(),
            optimization_multiplier: 0.5,
            cache_hit_rates: vec![0.3, 0.5, 0.7, 0.9],
            severity: SeverityThresholds::default(),
            contribution_strategy: ContributionStrategy::default(),
            parallel_paths: false,
            reference_monthly_volume: 1_000_000,
        }
    }
}

impl AnalysisConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml_str(&content)
    }

    /// Sets the contribution strategy.
    pub fn with_contribution_strategy(mut self, strategy: ContributionStrategy) -> Self {
        self.contribution_strategy = strategy;
        self
    }

    /// Sets parallel path enumeration.
    pub fn with_parallel_paths(mut self, parallel: bool) -> Self {
        self.parallel_paths = parallel;
        self
    }

    /// Sets the number of critical paths reported.
    pub fn with_critical_path_count(mut self, count: usize) -> Self {
        self.critical_path_count = count;
        self
    }

    /// Replaces the scale tiers.
    pub fn with_scale_tiers(mut self, tiers: Vec<ScaleTier>) -> Self {
        self.scale_tiers = tiers;
        self
    }
}
