//! YAML and JSON workflow definitions.
//!
//! A definition is the serialized form of a [`WorkflowGraph`]: a node list
//! followed by an edge list, both in insertion order.

use crate::error::{FlowError, Result};
use crate::graph::{build_graph, WorkflowGraph};
use crate::types::{NodeAttrs, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Workflow definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nodes in insertion order
    pub nodes: Vec<NodeDefinition>,
    /// Edges in insertion order
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

/// Node entry of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique node identifier
    pub id: NodeId,
    /// Node attributes
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

/// Edge entry of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Traffic probability
    #[serde(alias = "probability")]
    pub weight: f64,
}

impl WorkflowDefinition {
    /// Parses a definition from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses a definition from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the definition to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serializes the definition to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TryFrom<WorkflowDefinition> for WorkflowGraph {
    type Error = FlowError;

    fn try_from(definition: WorkflowDefinition) -> Result<Self> {
        if definition.nodes.is_empty() {
            return Err(FlowError::Definition(format!(
                "Workflow '{}' has no nodes",
                definition.name
            )));
        }

        let graph = build_graph(
            definition.nodes.into_iter().map(|n| (n.id, n.attrs)),
            definition
                .edges
                .into_iter()
                .map(|e| (e.source, e.target, e.weight)),
        )?;

        tracing::debug!(name = %definition.name, "workflow definition loaded");
        Ok(graph)
    }
}

impl WorkflowGraph {
    /// Converts the graph back into a definition document.
    pub fn to_definition(&self, name: impl Into<String>) -> WorkflowDefinition {
        WorkflowDefinition {
            name: name.into(),
            description: None,
            nodes: self
                .nodes()
                .map(|(id, attrs)| NodeDefinition {
                    id: id.clone(),
                    attrs: attrs.clone(),
                })
                .collect(),
            edges: self
                .edges()
                .into_iter()
                .map(|edge| EdgeDefinition {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    weight: edge.attrs.weight,
                })
                .collect(),
        }
    }
}

/// Loads and builds a workflow graph from a YAML string.
///
/// # Example
///
/// ```
/// use flowlens_core::load_workflow_from_string;
///
/// let yaml = r#"
/// name: minimal
/// nodes:
///   - id: input
///     type: entry
///   - id: answer
///     type: specialist
///     cost_per_call: 0.01
///     avg_time_ms: 900
///   - id: output
///     type: exit
/// edges:
///   - { source: input, target: answer, weight: 1.0 }
///   - { source: answer, target: output, weight: 1.0 }
/// "#;
///
/// let graph = load_workflow_from_string(yaml)?;
/// assert_eq!(graph.node_count(), 3);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
pub fn load_workflow_from_string(yaml: &str) -> Result<WorkflowGraph> {
    WorkflowDefinition::from_yaml_str(yaml)?.try_into()
}

/// Loads and builds a workflow graph from a file.
///
/// Files ending in `.json` are parsed as JSON, anything else as YAML.
///
/// # Returns
///
/// - `Ok(WorkflowGraph)` - If the file was read and the graph is valid
/// - `Err(FlowError)` - If the file cannot be read, parsed or built
pub async fn load_workflow_from_file(path: impl AsRef<Path>) -> Result<WorkflowGraph> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let definition = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => WorkflowDefinition::from_json_str(&content)?,
        _ => WorkflowDefinition::from_yaml_str(&content)?,
    };
    definition.try_into()
}
