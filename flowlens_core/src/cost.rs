//! Cost and latency aggregation over enumerated paths.
//!
//! [`CostModel`] enumerates the entry-to-exit paths once and answers every
//! cost question from that snapshot: baseline statistics, per-node
//! contributions, scale projections and what-if optimization deltas.
//!
//! A graph whose exit is unreachable is a valid input. It has zero paths and
//! every statistic, share and percentage derived from it is zero.

use crate::config::ScaleTier;
use crate::error::{FlowError, Result};
use crate::graph::{check_attribute, WorkflowGraph};
use crate::paths::PathQuery;
use crate::types::{NodeId, Path, PathId};
use serde::{Deserialize, Serialize};

/// How a node's share of traffic is estimated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStrategy {
    /// Fraction of enumerated simple paths that visit the node.
    ///
    /// Every path counts once regardless of edge weights.
    #[default]
    PathFraction,
    /// Probability mass of the paths that visit the node over the total
    /// mass, where a path's mass is the product of its edge weights.
    TrafficWeighted,
}

/// Divides, yielding 0.0 when the denominator is zero.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Sum of `cost_per_call` over the nodes of a path.
pub fn path_cost(graph: &WorkflowGraph, path: &Path) -> Result<f64> {
    path.iter()
        .map(|id| graph.node_attr(id).map(|attrs| attrs.cost_per_call))
        .sum()
}

/// Sum of `avg_time_ms` over the nodes of a path.
pub fn path_time(graph: &WorkflowGraph, path: &Path) -> Result<f64> {
    path.iter()
        .map(|id| graph.node_attr(id).map(|attrs| attrs.avg_time_ms))
        .sum()
}

/// Product of the edge weights along a path.
///
/// A pair of consecutive nodes without an edge contributes zero.
pub fn path_probability(graph: &WorkflowGraph, path: &Path) -> f64 {
    path.nodes()
        .windows(2)
        .map(|pair| graph.edge_weight(&pair[0], &pair[1]).unwrap_or(0.0))
        .product()
}

/// Cost statistics across all enumerated paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BaselineStats {
    /// Unweighted mean path cost
    pub avg: f64,
    /// Cheapest path cost
    pub min: f64,
    /// Most expensive path cost
    pub max: f64,
    /// Number of paths the statistics cover
    pub path_count: usize,
}

impl BaselineStats {
    /// Computes statistics over a set of path costs; empty input gives zeros.
    pub fn from_costs(costs: &[f64]) -> Self {
        if costs.is_empty() {
            return Self::default();
        }
        let sum: f64 = costs.iter().sum();
        Self {
            avg: sum / costs.len() as f64,
            min: costs.iter().copied().fold(f64::INFINITY, f64::min),
            max: costs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            path_count: costs.len(),
        }
    }

    /// Spread between the most and least expensive path.
    pub fn variance(&self) -> f64 {
        self.max - self.min
    }
}

/// One enumerated path with its aggregates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathMetrics {
    /// Stable path identifier
    pub id: PathId,
    /// Node sequence
    pub path: Path,
    /// Total cost
    pub cost: f64,
    /// Total time in milliseconds
    pub time_ms: f64,
    /// Product of edge weights
    pub probability: f64,
}

/// Monthly and annual cost at a given request volume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScaleProjection {
    /// Tier name
    pub tier: String,
    /// Requests per month
    pub monthly_requests: u64,
    /// Monthly cost
    pub monthly_cost: f64,
    /// Annual cost
    pub annual_cost: f64,
}

impl ScaleProjection {
    /// Projects an average per-request cost onto a tier.
    pub fn for_tier(tier: &ScaleTier, avg_cost: f64) -> Self {
        let monthly_cost = tier.monthly_requests as f64 * avg_cost;
        Self {
            tier: tier.name.clone(),
            monthly_requests: tier.monthly_requests,
            monthly_cost,
            annual_cost: monthly_cost * 12.0,
        }
    }
}

/// A node's weighted share of the average request cost.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeContribution {
    /// Node
    pub node: NodeId,
    /// Per-call cost
    pub cost_per_call: f64,
    /// Number of enumerated paths through the node
    pub paths_through: usize,
    /// Traffic share under the chosen strategy, in [0, 1]
    pub share: f64,
    /// `cost_per_call * share`
    pub contribution: f64,
    /// Contribution as a percentage of the average request cost
    pub pct_of_total: f64,
}

/// Effect of scaling one node's cost on the average request cost.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationDelta {
    /// Optimized node
    pub node: NodeId,
    /// Node cost before optimization
    pub old_node_cost: f64,
    /// Node cost after optimization
    pub new_node_cost: f64,
    /// Traffic share used to weight the saving
    pub node_share: f64,
    /// Average request cost before optimization
    pub current_avg: f64,
    /// Average request cost after optimization
    pub new_avg: f64,
    /// Percentage reduction of the average request cost
    pub reduction_pct: f64,
}

impl OptimizationDelta {
    /// Saving per request.
    pub fn savings_per_request(&self) -> f64 {
        self.current_avg - self.new_avg
    }

    /// Annual saving at a monthly request volume.
    pub fn annual_savings(&self, monthly_requests: u64) -> f64 {
        self.savings_per_request() * monthly_requests as f64 * 12.0
    }

    /// Layers a cache on top of the optimized node.
    ///
    /// A hit skips the node entirely; a miss pays the optimized average.
    /// The two outcomes are blended linearly by hit rate, and the blended
    /// cost never drops below zero.
    pub fn with_cache(&self, hit_rate: f64) -> CacheSimulation {
        let hit_rate = hit_rate.clamp(0.0, 1.0);
        let on_hit = self.new_avg - self.old_node_cost;
        let cached_cost = (self.new_avg * (1.0 - hit_rate) + on_hit * hit_rate).max(0.0);
        let cost_reduction = self.current_avg - cached_cost;
        CacheSimulation {
            hit_rate,
            cached_cost,
            cost_reduction,
            reduction_pct: safe_ratio(cost_reduction, self.current_avg) * 100.0,
        }
    }
}

/// Average request cost with a cache in front of the optimized node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheSimulation {
    /// Cache hit rate in [0, 1]
    pub hit_rate: f64,
    /// Blended average request cost
    pub cached_cost: f64,
    /// Saving per request against the unoptimized average
    pub cost_reduction: f64,
    /// Percentage reduction against the unoptimized average
    pub reduction_pct: f64,
}

impl CacheSimulation {
    /// Annual saving at a monthly request volume.
    pub fn annual_savings(&self, monthly_requests: u64) -> f64 {
        self.cost_reduction * monthly_requests as f64 * 12.0
    }
}

/// Cost model over a snapshot of entry-to-exit paths.
///
/// # Example
///
/// ```
/// use flowlens_core::{reference::customer_support_workflow, ContributionStrategy, CostModel, NodeId};
///
/// let graph = customer_support_workflow()?;
/// let model = CostModel::new(&graph)?;
/// let baseline = model.baseline();
/// assert_eq!(baseline.path_count, 3);
///
/// let delta = model.optimization_delta(
///     &NodeId::new("technical_agent"),
///     0.5,
///     ContributionStrategy::PathFraction,
/// )?;
/// assert!(delta.new_avg < baseline.avg);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
#[derive(Clone, Debug)]
pub struct CostModel<'g> {
    graph: &'g WorkflowGraph,
    paths: Vec<PathMetrics>,
}

impl<'g> CostModel<'g> {
    /// Enumerates entry-to-exit paths sequentially and builds the model.
    pub fn new(graph: &'g WorkflowGraph) -> Result<Self> {
        Self::with_parallel(graph, false)
    }

    /// Enumerates entry-to-exit paths and builds the model.
    ///
    /// An unreachable exit yields an empty model. A graph without a single
    /// entry and exit is still an error.
    pub fn with_parallel(graph: &'g WorkflowGraph, parallel: bool) -> Result<Self> {
        let entry = graph.entry()?;
        let exit = graph.exit()?;
        let paths = match PathQuery::new(graph, entry, exit)
            .with_parallel(parallel)
            .execute()
        {
            Ok(paths) => paths,
            Err(FlowError::NoPath { from, to }) => {
                tracing::info!(%from, %to, "no entry-to-exit path, cost model is empty");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Self::from_paths(graph, paths)
    }

    /// Builds the model from already enumerated paths.
    pub fn from_paths(graph: &'g WorkflowGraph, paths: Vec<Path>) -> Result<Self> {
        let paths = paths
            .into_iter()
            .map(|path| {
                Ok(PathMetrics {
                    id: path.id(),
                    cost: path_cost(graph, &path)?,
                    time_ms: path_time(graph, &path)?,
                    probability: path_probability(graph, &path),
                    path,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { graph, paths })
    }

    /// The graph this model was built from.
    pub fn graph(&self) -> &'g WorkflowGraph {
        self.graph
    }

    /// Paths in enumeration order.
    pub fn paths(&self) -> &[PathMetrics] {
        &self.paths
    }

    /// Number of enumerated paths.
    pub fn total_paths(&self) -> usize {
        self.paths.len()
    }

    /// Cost statistics across all paths.
    pub fn baseline(&self) -> BaselineStats {
        let costs: Vec<f64> = self.paths.iter().map(|p| p.cost).collect();
        BaselineStats::from_costs(&costs)
    }

    /// Unweighted mean path time in milliseconds.
    pub fn average_time_ms(&self) -> f64 {
        let total: f64 = self.paths.iter().map(|p| p.time_ms).sum();
        safe_ratio(total, self.paths.len() as f64)
    }

    /// Number of paths visiting `node`.
    pub fn paths_through(&self, node: &NodeId) -> usize {
        self.paths.iter().filter(|p| p.path.contains(node)).count()
    }

    /// The node's traffic share under `strategy`, in [0, 1].
    pub fn node_share(&self, node: &NodeId, strategy: ContributionStrategy) -> Result<f64> {
        if !self.graph.contains(node) {
            return Err(FlowError::UnknownNode(node.clone()));
        }
        let share = match strategy {
            ContributionStrategy::PathFraction => {
                safe_ratio(self.paths_through(node) as f64, self.paths.len() as f64)
            }
            ContributionStrategy::TrafficWeighted => {
                let total: f64 = self.paths.iter().map(|p| p.probability).sum();
                let through: f64 = self
                    .paths
                    .iter()
                    .filter(|p| p.path.contains(node))
                    .map(|p| p.probability)
                    .sum();
                safe_ratio(through, total)
            }
        };
        Ok(share)
    }

    /// `cost_per_call(node) * share(node)`.
    pub fn node_contribution(&self, node: &NodeId, strategy: ContributionStrategy) -> Result<f64> {
        let cost = self.graph.node_attr(node)?.cost_per_call;
        Ok(cost * self.node_share(node, strategy)?)
    }

    /// Contributions of every positively costed node, largest first.
    ///
    /// Equal contributions keep node insertion order.
    pub fn contributions(&self, strategy: ContributionStrategy) -> Result<Vec<NodeContribution>> {
        let avg = self.baseline().avg;
        let mut rows = Vec::new();
        for (id, attrs) in self.graph.nodes() {
            if attrs.cost_per_call <= 0.0 {
                continue;
            }
            let share = self.node_share(id, strategy)?;
            let contribution = attrs.cost_per_call * share;
            rows.push(NodeContribution {
                node: id.clone(),
                cost_per_call: attrs.cost_per_call,
                paths_through: self.paths_through(id),
                share,
                contribution,
                pct_of_total: safe_ratio(contribution, avg) * 100.0,
            });
        }
        rows.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
        Ok(rows)
    }

    /// Average request cost after multiplying one node's cost.
    ///
    /// The per-call saving is weighted by the node's traffic share.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidAttribute`] if `cost_multiplier` is negative or
    ///   not finite
    pub fn optimization_delta(
        &self,
        node: &NodeId,
        cost_multiplier: f64,
        strategy: ContributionStrategy,
    ) -> Result<OptimizationDelta> {
        let old_node_cost = self.graph.node_attr(node)?.cost_per_call;
        check_attribute(node, "cost_multiplier", cost_multiplier)?;
        let new_node_cost = old_node_cost * cost_multiplier;
        let node_share = self.node_share(node, strategy)?;
        let current_avg = self.baseline().avg;
        let new_avg = current_avg - (old_node_cost - new_node_cost) * node_share;

        Ok(OptimizationDelta {
            node: node.clone(),
            old_node_cost,
            new_node_cost,
            node_share,
            current_avg,
            new_avg,
            reduction_pct: safe_ratio(current_avg - new_avg, current_avg) * 100.0,
        })
    }

    /// Projects the baseline average onto a tier.
    pub fn project(&self, tier: &ScaleTier) -> ScaleProjection {
        ScaleProjection::for_tier(tier, self.baseline().avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::reference::customer_support_workflow;
    use crate::types::{NodeAttrs, NodeKind};

    const EPS: f64 = 1e-9;

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    fn unreachable_exit() -> WorkflowGraph {
        GraphBuilder::new()
            .node("input", NodeAttrs::new(NodeKind::Entry))
            .node("agent", NodeAttrs::new(NodeKind::Specialist).with_cost(0.01))
            .node("output", NodeAttrs::new(NodeKind::Exit))
            .edge("input", "agent", 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_safe_ratio() {
        assert_eq!(safe_ratio(1.0, 0.0), 0.0);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
        assert_eq!(safe_ratio(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_path_costs_and_times() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        let costs: Vec<f64> = model.paths().iter().map(|p| p.cost).collect();
        let times: Vec<f64> = model.paths().iter().map(|p| p.time_ms).collect();

        assert!((costs[0] - 0.021).abs() < EPS);
        assert!((costs[1] - 0.026).abs() < EPS);
        assert!((costs[2] - 0.018).abs() < EPS);
        assert_eq!(times, vec![3110.0, 3610.0, 2810.0]);
    }

    #[test]
    fn test_baseline_reference() {
        let graph = customer_support_workflow().unwrap();
        let baseline = CostModel::new(&graph).unwrap().baseline();
        assert!((baseline.avg - 0.065 / 3.0).abs() < EPS);
        assert!((baseline.min - 0.018).abs() < EPS);
        assert!((baseline.max - 0.026).abs() < EPS);
        assert!((baseline.variance() - 0.008).abs() < EPS);
        assert!(baseline.min <= baseline.avg && baseline.avg <= baseline.max);
    }

    #[test]
    fn test_path_fraction_contributions() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        let rows = model.contributions(ContributionStrategy::PathFraction).unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].node, id("technical_agent"));
        assert!((rows[0].contribution - 0.02 / 3.0).abs() < EPS);
        assert!((rows[0].pct_of_total - 30.769_230_769).abs() < 1e-6);
        assert_eq!(rows[1].node, id("billing_agent"));
        assert_eq!(rows[2].node, id("account_agent"));

        let classifier = rows.iter().find(|r| r.node == id("intent_classifier")).unwrap();
        assert_eq!(classifier.paths_through, 3);
        assert_eq!(classifier.share, 1.0);

        let sum: f64 = rows.iter().map(|r| r.contribution).sum();
        assert!(sum <= model.baseline().avg + EPS);
    }

    #[test]
    fn test_traffic_weighted_share() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        let share = model
            .node_share(&id("technical_agent"), ContributionStrategy::TrafficWeighted)
            .unwrap();
        assert!((share - 0.35).abs() < EPS);

        let rows = model.contributions(ContributionStrategy::TrafficWeighted).unwrap();
        assert_eq!(rows[0].node, id("technical_agent"));
        assert!((rows[0].contribution - 0.007).abs() < EPS);
        assert_eq!(rows[1].node, id("billing_agent"));
        assert!((rows[1].contribution - 0.006).abs() < EPS);
    }

    #[test]
    fn test_optimization_delta_reference() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        let delta = model
            .optimization_delta(&id("technical_agent"), 0.5, ContributionStrategy::PathFraction)
            .unwrap();

        assert!((delta.new_node_cost - 0.01).abs() < EPS);
        assert!((delta.new_avg - 0.055 / 3.0).abs() < EPS);
        assert!((delta.reduction_pct - 100.0 / 6.5).abs() < 1e-6);
        assert!((delta.annual_savings(1_000_000) - 40_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_optimization_delta_rejects_bad_multiplier() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        for multiplier in [-0.5, f64::NAN, f64::INFINITY] {
            let result = model.optimization_delta(
                &id("technical_agent"),
                multiplier,
                ContributionStrategy::PathFraction,
            );
            assert!(
                matches!(
                    result,
                    Err(FlowError::InvalidAttribute { attribute: "cost_multiplier", .. })
                ),
                "multiplier {}",
                multiplier
            );
        }

        let free = model
            .optimization_delta(&id("technical_agent"), 0.0, ContributionStrategy::PathFraction)
            .unwrap();
        assert_eq!(free.new_node_cost, 0.0);
    }

    #[test]
    fn test_cache_simulation_reference() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        let delta = model
            .optimization_delta(&id("technical_agent"), 0.5, ContributionStrategy::PathFraction)
            .unwrap();

        let expected = [
            (0.3, 0.037 / 3.0, 43.076_923),
            (0.5, 0.025 / 3.0, 61.538_462),
            (0.7, 0.013 / 3.0, 80.0),
            (0.9, 0.001 / 3.0, 98.461_538),
        ];
        for (rate, cost, pct) in expected {
            let sim = delta.with_cache(rate);
            assert!((sim.cached_cost - cost).abs() < EPS, "hit rate {}", rate);
            assert!((sim.reduction_pct - pct).abs() < 1e-4, "hit rate {}", rate);
        }
    }

    #[test]
    fn test_cache_cost_never_negative() {
        let delta = OptimizationDelta {
            node: id("x"),
            old_node_cost: 0.05,
            new_node_cost: 0.025,
            node_share: 1.0,
            current_avg: 0.06,
            new_avg: 0.035,
            reduction_pct: 0.0,
        };
        assert_eq!(delta.with_cache(1.0).cached_cost, 0.0);
        assert_eq!(delta.with_cache(7.0).hit_rate, 1.0);
    }

    #[test]
    fn test_scale_projection() {
        let tier = ScaleTier::new("Large", 1_000_000);
        let projection = ScaleProjection::for_tier(&tier, 0.02);
        assert!((projection.monthly_cost - 20_000.0).abs() < 1e-6);
        assert!((projection.annual_cost - 240_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_paths_yield_zero_stats() {
        let graph = unreachable_exit();
        let model = CostModel::new(&graph).unwrap();
        assert_eq!(model.total_paths(), 0);
        assert_eq!(model.baseline(), BaselineStats::default());
        assert_eq!(model.average_time_ms(), 0.0);

        for strategy in [ContributionStrategy::PathFraction, ContributionStrategy::TrafficWeighted] {
            let rows = model.contributions(strategy).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].share, 0.0);
            assert_eq!(rows[0].contribution, 0.0);
            assert_eq!(rows[0].pct_of_total, 0.0);

            let delta = model.optimization_delta(&id("agent"), 0.5, strategy).unwrap();
            assert_eq!(delta.reduction_pct, 0.0);
            assert_eq!(delta.with_cache(0.9).reduction_pct, 0.0);
        }
        assert_eq!(model.project(&ScaleTier::new("Small", 10_000)).annual_cost, 0.0);
    }

    #[test]
    fn test_unknown_node_in_contribution() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        assert!(matches!(
            model.node_contribution(&id("ghost"), ContributionStrategy::PathFraction),
            Err(FlowError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_missing_entry_is_still_an_error() {
        let graph = WorkflowGraph::new();
        assert!(matches!(
            CostModel::new(&graph),
            Err(FlowError::EntryExitCardinality { .. })
        ));
    }

    #[test]
    fn test_path_probability() {
        let graph = customer_support_workflow().unwrap();
        let model = CostModel::new(&graph).unwrap();
        let probabilities: Vec<f64> = model.paths().iter().map(|p| p.probability).collect();
        assert!((probabilities[0] - 0.38).abs() < EPS);
        assert!((probabilities[1] - 0.3325).abs() < EPS);
        assert!((probabilities[2] - 0.2375).abs() < EPS);
    }
}
