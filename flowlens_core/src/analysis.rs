//! Bottleneck and cost reports.
//!
//! [`analyze`] and [`project_costs`] are the two entry points a reporting
//! layer consumes. Both read the graph without mutating it and return
//! serializable bundles keyed by the graph fingerprint.

use crate::centrality::{
    betweenness_centrality, degree_connectivity, BetweennessScores, Connectivity, Severity,
};
use crate::config::{AnalysisConfig, ScaleTier};
use crate::cost::{
    safe_ratio, BaselineStats, CacheSimulation, CostModel, NodeContribution, OptimizationDelta,
    PathMetrics, ScaleProjection,
};
use crate::error::Result;
use crate::graph::{check_attribute, WorkflowGraph};
use crate::types::{NodeId, NodeKind, Path, PathId};
use indexmap::IndexMap;
use serde::Serialize;

/// Number of nodes listed in the connectivity ranking.
const CONNECTIVITY_TOP: usize = 5;

/// Number of top cost drivers reported.
const COST_DRIVER_TOP: usize = 3;

/// Structural overview of a graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphSummary {
    /// Node count
    pub node_count: usize,
    /// Edge count
    pub edge_count: usize,
    /// Node count per kind, in workflow order
    pub nodes_by_kind: IndexMap<NodeKind, usize>,
    /// Sum of every node's per-call cost
    pub max_theoretical_cost: f64,
}

impl GraphSummary {
    /// Summarizes a graph.
    pub fn of(graph: &WorkflowGraph) -> Self {
        let nodes_by_kind = NodeKind::ALL
            .iter()
            .map(|&kind| (kind, graph.nodes_of_kind(kind).len()))
            .filter(|&(_, count)| count > 0)
            .collect();
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            nodes_by_kind,
            max_theoretical_cost: graph.nodes().map(|(_, attrs)| attrs.cost_per_call).sum(),
        }
    }
}

/// A node with its centrality, severity and cost profile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedNode {
    /// Node
    pub node: NodeId,
    /// Betweenness score
    pub score: f64,
    /// Severity of the score
    pub severity: Severity,
    /// Per-call cost
    pub cost_per_call: f64,
    /// Average time in milliseconds
    pub avg_time_ms: f64,
}

/// One of the slowest entry-to-exit paths.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CriticalPath {
    /// Stable path identifier
    pub id: PathId,
    /// Node sequence
    pub path: Path,
    /// Total time in milliseconds
    pub time_ms: f64,
    /// Total cost
    pub cost: f64,
}

impl From<&PathMetrics> for CriticalPath {
    fn from(metrics: &PathMetrics) -> Self {
        Self {
            id: metrics.id,
            path: metrics.path.clone(),
            time_ms: metrics.time_ms,
            cost: metrics.cost,
        }
    }
}

/// Outcome of one what-if scenario on the primary bottleneck.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Factor applied to the node's time
    pub time_multiplier: f64,
    /// Factor applied to the node's cost
    pub cost_multiplier: f64,
    /// Node time after the scenario
    pub new_node_time_ms: f64,
    /// Node cost after the scenario
    pub new_node_cost: f64,
    /// Average request time reduction in percent
    pub time_improvement_pct: f64,
    /// Average request cost reduction in percent
    pub cost_improvement_pct: f64,
    /// Annual saving at the reference volume
    pub annual_savings: f64,
}

/// Result of [`analyze`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BottleneckReport {
    /// Fingerprint of the analyzed graph
    pub fingerprint: String,
    /// Structural overview
    pub summary: GraphSummary,
    /// Betweenness score per node, in insertion order
    pub betweenness: BetweennessScores,
    /// Nodes ranked by betweenness, highest first
    pub ranking: Vec<RankedNode>,
    /// Highest scoring node
    pub bottleneck: Option<RankedNode>,
    /// Most connected nodes
    pub connectivity: Vec<Connectivity>,
    /// Slowest paths, slowest first
    pub critical_paths: Vec<CriticalPath>,
    /// What-if scenarios applied to the bottleneck
    pub scenarios: Vec<ScenarioOutcome>,
}

/// Runs centrality, critical path and scenario analysis.
///
/// Centrality and path enumeration are independent and run side by side
/// on the rayon pool. A graph whose exit is unreachable produces a report
/// with no critical paths and zero-valued scenarios.
///
/// # Example
///
/// ```
/// use flowlens_core::{analyze, reference::customer_support_workflow, AnalysisConfig};
///
/// let report = analyze(&customer_support_workflow()?, &AnalysisConfig::default())?;
/// assert_eq!(report.bottleneck.unwrap().node.as_str(), "quality_check");
/// assert_eq!(report.critical_paths.len(), 3);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
pub fn analyze(graph: &WorkflowGraph, config: &AnalysisConfig) -> Result<BottleneckReport> {
    let (betweenness, model) = rayon::join(
        || betweenness_centrality(graph),
        || CostModel::with_parallel(graph, config.parallel_paths),
    );
    let model = model?;

    let ranking: Vec<RankedNode> = betweenness
        .ranked()
        .into_iter()
        .map(|scored| ranked_node(graph, scored.node, scored.score, config))
        .collect::<Result<_>>()?;

    let bottleneck = match betweenness.primary_bottleneck() {
        Some(top) => Some(ranked_node(graph, top.node, top.score, config)?),
        None => None,
    };

    let mut by_time: Vec<&PathMetrics> = model.paths().iter().collect();
    by_time.sort_by(|a, b| b.time_ms.total_cmp(&a.time_ms));
    let critical_paths = by_time
        .into_iter()
        .take(config.critical_path_count)
        .map(CriticalPath::from)
        .collect();

    let scenarios = match &bottleneck {
        Some(node) => scenario_outcomes(&model, node, config)?,
        None => Vec::new(),
    };

    let mut connectivity = degree_connectivity(graph);
    connectivity.truncate(CONNECTIVITY_TOP);

    if let Some(top) = &bottleneck {
        tracing::info!(
            node = %top.node,
            score = top.score,
            severity = %top.severity,
            paths = model.total_paths(),
            "bottleneck analysis complete"
        );
    }

    Ok(BottleneckReport {
        fingerprint: graph.fingerprint(),
        summary: GraphSummary::of(graph),
        betweenness,
        ranking,
        bottleneck,
        connectivity,
        critical_paths,
        scenarios,
    })
}

fn ranked_node(
    graph: &WorkflowGraph,
    node: NodeId,
    score: f64,
    config: &AnalysisConfig,
) -> Result<RankedNode> {
    let attrs = graph.node_attr(&node)?;
    Ok(RankedNode {
        severity: Severity::classify(score, &config.severity),
        cost_per_call: attrs.cost_per_call,
        avg_time_ms: attrs.avg_time_ms,
        node,
        score,
    })
}

fn scenario_outcomes(
    model: &CostModel<'_>,
    bottleneck: &RankedNode,
    config: &AnalysisConfig,
) -> Result<Vec<ScenarioOutcome>> {
    let share = model.node_share(&bottleneck.node, config.contribution_strategy)?;
    let avg_time = model.average_time_ms();

    config
        .scenarios
        .iter()
        .map(|scenario| {
            check_attribute(&bottleneck.node, "time_multiplier", scenario.time_multiplier)?;
            let delta = model.optimization_delta(
                &bottleneck.node,
                scenario.cost_multiplier,
                config.contribution_strategy,
            )?;
            let new_node_time_ms = bottleneck.avg_time_ms * scenario.time_multiplier;
            let time_saved = (bottleneck.avg_time_ms - new_node_time_ms) * share;

            Ok(ScenarioOutcome {
                name: scenario.name.clone(),
                time_multiplier: scenario.time_multiplier,
                cost_multiplier: scenario.cost_multiplier,
                new_node_time_ms,
                new_node_cost: delta.new_node_cost,
                time_improvement_pct: safe_ratio(time_saved, avg_time) * 100.0,
                cost_improvement_pct: delta.reduction_pct,
                annual_savings: delta.annual_savings(config.reference_monthly_volume),
            })
        })
        .collect()
}

/// Annual saving of the optimization target at one tier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierSavings {
    /// Tier name
    pub tier: String,
    /// Requests per month
    pub monthly_requests: u64,
    /// Annual saving
    pub annual_savings: f64,
}

/// Cache simulation with its annual saving at the reference volume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheImpact {
    /// Simulated costs
    #[serde(flatten)]
    pub simulation: CacheSimulation,
    /// Annual saving at the reference volume
    pub annual_savings: f64,
}

/// The top cost driver and what optimizing it is worth.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationTarget {
    /// Cost delta of applying the configured multiplier
    pub delta: OptimizationDelta,
    /// Annual saving per scale tier
    pub savings_by_tier: Vec<TierSavings>,
    /// Cache impact per configured hit rate
    pub cache_impact: Vec<CacheImpact>,
}

/// Result of [`project_costs`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostReport {
    /// Fingerprint of the analyzed graph
    pub fingerprint: String,
    /// Cost statistics across paths
    pub baseline: BaselineStats,
    /// Unweighted mean path time
    pub average_time_ms: f64,
    /// Every enumerated path
    pub paths: Vec<PathMetrics>,
    /// Cost at each scale tier
    pub projections: Vec<ScaleProjection>,
    /// Positively costed nodes, largest contribution first
    pub node_costs: Vec<NodeContribution>,
    /// The largest contributors
    pub top_drivers: Vec<NodeContribution>,
    /// Optimization of the largest contributor
    pub optimization_target: Option<OptimizationTarget>,
}

/// Runs the cost projection pipeline.
///
/// # Returns
///
/// - `Ok(CostReport)` - All-zero statistics when the exit is unreachable
/// - `Err(FlowError)` - If the graph lacks a single entry or exit
pub fn project_costs(graph: &WorkflowGraph, config: &AnalysisConfig) -> Result<CostReport> {
    let model = CostModel::with_parallel(graph, config.parallel_paths)?;
    let baseline = model.baseline();
    let node_costs = model.contributions(config.contribution_strategy)?;
    let top_drivers: Vec<NodeContribution> =
        node_costs.iter().take(COST_DRIVER_TOP).cloned().collect();

    let optimization_target = match top_drivers.first() {
        Some(driver) => Some(optimization_target(&model, &driver.node, config)?),
        None => None,
    };

    tracing::info!(
        avg = baseline.avg,
        min = baseline.min,
        max = baseline.max,
        paths = baseline.path_count,
        "cost projection complete"
    );

    Ok(CostReport {
        fingerprint: graph.fingerprint(),
        baseline,
        average_time_ms: model.average_time_ms(),
        paths: model.paths().to_vec(),
        projections: config
            .scale_tiers
            .iter()
            .map(|tier| model.project(tier))
            .collect(),
        node_costs,
        top_drivers,
        optimization_target,
    })
}

fn optimization_target(
    model: &CostModel<'_>,
    node: &NodeId,
    config: &AnalysisConfig,
) -> Result<OptimizationTarget> {
    let delta = model.optimization_delta(
        node,
        config.optimization_multiplier,
        config.contribution_strategy,
    )?;

    let savings_by_tier = config
        .scale_tiers
        .iter()
        .map(|tier: &ScaleTier| TierSavings {
            tier: tier.name.clone(),
            monthly_requests: tier.monthly_requests,
            annual_savings: delta.annual_savings(tier.monthly_requests),
        })
        .collect();

    let cache_impact = config
        .cache_hit_rates
        .iter()
        .map(|&rate| {
            let simulation = delta.with_cache(rate);
            CacheImpact {
                annual_savings: simulation.annual_savings(config.reference_monthly_volume),
                simulation,
            }
        })
        .collect();

    Ok(OptimizationTarget {
        delta,
        savings_by_tier,
        cache_impact,
    })
}
