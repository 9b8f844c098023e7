//! Core types for FlowLens.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a workflow node.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new NodeId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the NodeId and returns the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

/// Role a node plays in the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Request entry point
    Entry,
    /// Intent classification
    Classifier,
    /// Context enrichment (database lookups, history)
    Enricher,
    /// Intent-specific handler
    Specialist,
    /// Final response formatting
    Formatter,
    /// Response quality validation
    Validator,
    /// Response exit point
    Exit,
}

impl NodeKind {
    /// All node kinds, in workflow order.
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Entry,
        NodeKind::Classifier,
        NodeKind::Enricher,
        NodeKind::Specialist,
        NodeKind::Formatter,
        NodeKind::Validator,
        NodeKind::Exit,
    ];

    /// Returns the lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Entry => "entry",
            NodeKind::Classifier => "classifier",
            NodeKind::Enricher => "enricher",
            NodeKind::Specialist => "specialist",
            NodeKind::Formatter => "formatter",
            NodeKind::Validator => "validator",
            NodeKind::Exit => "exit",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value for node extension attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Free-form text
    Text(String),
}

impl AttrValue {
    /// Returns the value as f64 if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as bool if it is a flag.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Attributes attached to a workflow node.
///
/// Named fields cover everything the analyzers read; anything else goes
/// into the ordered `extensions` map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
    /// Node role
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Monetary cost of one call
    #[serde(default)]
    pub cost_per_call: f64,
    /// Average processing time in milliseconds
    #[serde(default)]
    pub avg_time_ms: f64,
    /// LLM model backing this node, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Tokens consumed per call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    /// Additional typed attributes
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, AttrValue>,
}

impl NodeAttrs {
    /// Creates attributes with zero cost and time.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            description: None,
            cost_per_call: 0.0,
            avg_time_ms: 0.0,
            model_name: None,
            token_count: None,
            extensions: IndexMap::new(),
        }
    }

    /// Sets the per-call cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost_per_call = cost;
        self
    }

    /// Sets the average processing time in milliseconds.
    pub fn with_time_ms(mut self, time_ms: f64) -> Self {
        self.avg_time_ms = time_ms;
        self
    }

    /// Sets the backing model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    /// Sets the token count.
    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.token_count = Some(tokens);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an extension attribute.
    pub fn with_extension(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Looks up an extension attribute.
    pub fn extension(&self, key: &str) -> Option<&AttrValue> {
        self.extensions.get(key)
    }
}

/// Attributes attached to a workflow edge.
///
/// `weight` is the traffic probability of taking this edge. The source
/// format duplicated it as `probability`; here it is a single field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    /// Traffic probability in [0, 1]
    #[serde(alias = "probability")]
    pub weight: f64,
}

impl EdgeAttrs {
    /// Creates edge attributes with the given weight.
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

/// Stable identifier for a workflow path.
///
/// This is a BLAKE3 hash of the path's node sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathId(pub [u8; 16]);

impl PathId {
    fn of(nodes: &[NodeId]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for node in nodes {
            hasher.update(node.as_str().as_bytes());
            hasher.update(&[0]);
        }
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for PathId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An ordered sequence of node identifiers from entry to exit.
///
/// Paths are derived from the graph and never stored in it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Path {
    nodes: Vec<NodeId>,
}

impl Path {
    /// Creates a path from a node sequence.
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    /// Returns the stable identifier of this path.
    pub fn id(&self) -> PathId {
        PathId::of(&self.nodes)
    }

    /// Returns the nodes in order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of nodes on the path.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if the path visits the node.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    /// Iterates over the nodes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeId> {
        self.nodes.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " → ")?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
