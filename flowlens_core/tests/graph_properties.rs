//! Property tests over seeded random workflow graphs.

use flowlens_core::reference::customer_support_workflow;
use flowlens_core::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const SEEDS: [u64; 8] = [1, 7, 42, 99, 1234, 2024, 31337, 65535];

/// Random layered workflow with a retry edge from the last layer back to
/// the first. Every node keeps at least one forward edge, so the exit is
/// always reachable.
fn random_workflow(seed: u64) -> WorkflowGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let layer_count = rng.gen_range(2..=4);
    let layers: Vec<Vec<String>> = (0..layer_count)
        .map(|layer| {
            (0..rng.gen_range(1..=3))
                .map(|slot| format!("l{}_{}", layer, slot))
                .collect()
        })
        .collect();

    let mut builder = GraphBuilder::new().node("input", NodeAttrs::new(NodeKind::Entry));
    for layer in &layers {
        for name in layer {
            builder = builder.node(
                name.as_str(),
                NodeAttrs::new(NodeKind::Specialist)
                    .with_cost((rng.gen_range(0..50) as f64) / 1000.0)
                    .with_time_ms(rng.gen_range(10..2000) as f64),
            );
        }
    }
    builder = builder.node("output", NodeAttrs::new(NodeKind::Exit));

    let mut adjacency: Vec<(String, Vec<String>)> = Vec::new();
    adjacency.push(("input".to_string(), pick_subset(&mut rng, &layers[0])));
    for pair in layers.windows(2) {
        for name in &pair[0] {
            adjacency.push((name.clone(), pick_subset(&mut rng, &pair[1])));
        }
    }
    for name in &layers[layers.len() - 1] {
        adjacency.push((name.clone(), vec!["output".to_string()]));
    }
    // retry edge
    let retry_source = layers[layers.len() - 1][0].clone();
    let retry_target = layers[0][0].clone();
    if let Some((_, targets)) = adjacency.iter_mut().find(|(s, _)| *s == retry_source) {
        targets.push(retry_target);
    }

    for (source, targets) in adjacency {
        let weight = 1.0 / targets.len() as f64;
        for target in targets {
            builder = builder.edge(source.as_str(), target, weight);
        }
    }
    builder.build().unwrap()
}

fn pick_subset(rng: &mut StdRng, layer: &[String]) -> Vec<String> {
    let mut picked: Vec<String> = layer.iter().filter(|_| rng.gen_bool(0.6)).cloned().collect();
    if picked.is_empty() {
        picked.push(layer[rng.gen_range(0..layer.len())].clone());
    }
    picked
}

#[test]
fn test_paths_are_simple_and_follow_edges() {
    for seed in SEEDS {
        let graph = random_workflow(seed);
        let paths = entry_to_exit_paths(&graph).unwrap();
        assert!(!paths.is_empty(), "seed {}", seed);
        for path in &paths {
            let unique: HashSet<_> = path.iter().collect();
            assert_eq!(unique.len(), path.len(), "seed {}: {}", seed, path);
            for pair in path.nodes().windows(2) {
                assert!(graph.has_edge(&pair[0], &pair[1]), "seed {}", seed);
            }
        }
    }
}

#[test]
fn test_parallel_enumeration_is_deterministic() {
    for seed in SEEDS {
        let graph = random_workflow(seed);
        let entry = graph.entry().unwrap();
        let exit = graph.exit().unwrap();
        let sequential = PathQuery::new(&graph, entry, exit).execute().unwrap();
        let parallel = PathQuery::new(&graph, entry, exit).parallel().execute().unwrap();
        assert_eq!(sequential, parallel, "seed {}", seed);
    }
}

#[test]
fn test_betweenness_bounds_and_endpoints() {
    for seed in SEEDS {
        let graph = random_workflow(seed);
        let scores = betweenness_centrality(&graph);
        assert_eq!(scores.len(), graph.node_count());
        for (node, score) in scores.iter() {
            assert!((0.0..=1.0).contains(&score), "seed {}: {} = {}", seed, node, score);
        }
        assert_eq!(scores.get(graph.entry().unwrap()), Some(0.0));
        assert_eq!(scores.get(graph.exit().unwrap()), Some(0.0));
    }
}

#[test]
fn test_betweenness_is_bit_identical_across_runs() {
    for seed in SEEDS {
        let first = betweenness_centrality(&random_workflow(seed));
        let second = betweenness_centrality(&random_workflow(seed));
        let a: Vec<(String, u64)> = first
            .iter()
            .map(|(id, s)| (id.to_string(), s.to_bits()))
            .collect();
        let b: Vec<(String, u64)> = second
            .iter()
            .map(|(id, s)| (id.to_string(), s.to_bits()))
            .collect();
        assert_eq!(a, b, "seed {}", seed);
    }
}

#[test]
fn test_baseline_is_unweighted_mean() {
    for seed in SEEDS {
        let graph = random_workflow(seed);
        let model = CostModel::new(&graph).unwrap();
        let baseline = model.baseline();

        let costs: Vec<f64> = model.paths().iter().map(|p| p.cost).collect();
        let mean = costs.iter().sum::<f64>() / costs.len() as f64;
        assert!((baseline.avg - mean).abs() < 1e-12, "seed {}", seed);
        assert!(baseline.min <= baseline.avg + 1e-12, "seed {}", seed);
        assert!(baseline.avg <= baseline.max + 1e-12, "seed {}", seed);
        assert_eq!(baseline.path_count, costs.len());
    }
}

#[test]
fn test_contributions_do_not_exceed_average() {
    for seed in SEEDS {
        let graph = random_workflow(seed);
        let model = CostModel::new(&graph).unwrap();
        let total: f64 = model
            .contributions(ContributionStrategy::PathFraction)
            .unwrap()
            .iter()
            .map(|row| row.contribution)
            .sum();
        assert!(total <= model.baseline().avg + 1e-9, "seed {}", seed);
    }
}

#[test]
fn test_traffic_shares_are_fractions() {
    for seed in SEEDS {
        let graph = random_workflow(seed);
        let model = CostModel::new(&graph).unwrap();
        for id in graph.node_ids() {
            let share = model
                .node_share(id, ContributionStrategy::TrafficWeighted)
                .unwrap();
            assert!((0.0..=1.0 + 1e-12).contains(&share), "seed {}: {}", seed, id);
        }
        let entry_share = model
            .node_share(graph.entry().unwrap(), ContributionStrategy::TrafficWeighted)
            .unwrap();
        assert!((entry_share - 1.0).abs() < 1e-12, "seed {}", seed);
    }
}

#[test]
fn test_unbalanced_branch_fails_construction() {
    let result = GraphBuilder::new()
        .node("input", NodeAttrs::new(NodeKind::Entry))
        .node("a", NodeAttrs::new(NodeKind::Specialist))
        .node("b", NodeAttrs::new(NodeKind::Specialist))
        .node("output", NodeAttrs::new(NodeKind::Exit))
        .edge("input", "a", 0.7)
        .edge("input", "b", 0.2)
        .edge("a", "output", 1.0)
        .edge("b", "output", 1.0)
        .build();
    assert!(matches!(result, Err(FlowError::BranchWeightMismatch { .. })));
}

#[test]
fn test_reference_workflow_properties() {
    let graph = customer_support_workflow().unwrap();
    assert_eq!(entry_to_exit_paths(&graph).unwrap().len(), 3);

    let scores = betweenness_centrality(&graph);
    let top = scores.primary_bottleneck().unwrap();
    assert_eq!(top.node.as_str(), "quality_check");
    assert!((top.score - 0.446_428_571_428_571_45).abs() < 1e-12);
}

#[test]
fn test_exit_unreachable_gives_zero_stats() {
    // The only forward edge leaves from the exit, so nothing reaches it
    let graph = GraphBuilder::new()
        .node("input", NodeAttrs::new(NodeKind::Entry))
        .node("agent", NodeAttrs::new(NodeKind::Specialist).with_cost(0.02))
        .node("output", NodeAttrs::new(NodeKind::Exit))
        .edge("input", "agent", 1.0)
        .edge("output", "input", 1.0)
        .build()
        .unwrap();

    assert!(matches!(
        entry_to_exit_paths(&graph),
        Err(FlowError::NoPath { .. })
    ));

    let report = project_costs(&graph, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.baseline, BaselineStats::default());
    assert!(report.node_costs.iter().all(|row| row.contribution == 0.0));
}
