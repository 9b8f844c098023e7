//! FlowLens - Workflow Graph Analysis
//!
//! This crate models a multi-step agent workflow as a weighted directed
//! graph and analyzes it for structural bottlenecks and cost drivers.
//!
//! # Overview
//!
//! - **Graph Model**: typed nodes, probability-weighted edges, retry cycles
//! - **Path Enumeration**: all simple entry-to-exit paths, optionally on rayon
//! - **Centrality**: betweenness and degree ranking, primary bottleneck
//! - **Cost Aggregation**: baseline, contributions, projections, what-if deltas
//!
//! The graph is built once and read by every analyzer. Nothing here mutates
//! a graph after construction; what-if scenarios work on copies.
//!
//! # Quick Start
//!
//! ```rust
//! use flowlens_core::{analyze, project_costs, reference::customer_support_workflow, AnalysisConfig};
//!
//! let graph = customer_support_workflow()?;
//! let config = AnalysisConfig::default();
//!
//! let report = analyze(&graph, &config)?;
//! let costs = project_costs(&graph, &config)?;
//! assert_eq!(report.critical_paths.len(), costs.paths.len());
//! # Ok::<(), flowlens_core::FlowError>(())
//! ```
//!
//! # Modules
//!
//! - [`types`]: Node, edge and path types
//! - [`error`]: Error types for all operations
//! - [`graph`]: Graph model and builder
//! - [`paths`]: Simple path enumeration
//! - [`centrality`]: Betweenness and degree centrality
//! - [`cost`]: Cost and latency aggregation
//! - [`analysis`]: Bottleneck and cost reports
//! - [`config`]: Analysis configuration
//! - [`definition`]: YAML and JSON workflow definitions
//! - [`reference`]: Built-in customer support workflow

pub mod error;
pub mod types;

pub mod graph;
pub mod paths;
pub mod centrality;
pub mod cost;
pub mod analysis;

pub mod config;
pub mod definition;
pub mod reference;

// Re-export commonly used types
pub use error::{FlowError, Result};
pub use types::{AttrValue, EdgeAttrs, NodeAttrs, NodeId, NodeKind, Path, PathId};

pub use analysis::{analyze, project_costs, BottleneckReport, CostReport};
pub use centrality::{betweenness_centrality, degree_connectivity, BetweennessScores, Severity};
pub use config::{AnalysisConfig, ScaleTier, Scenario, SeverityThresholds};
pub use cost::{BaselineStats, ContributionStrategy, CostModel, OptimizationDelta};
pub use definition::{load_workflow_from_file, load_workflow_from_string, WorkflowDefinition};
pub use graph::{build_graph, GraphBuilder, WorkflowGraph};
pub use paths::{all_simple_paths, entry_to_exit_paths, PathQuery};

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
