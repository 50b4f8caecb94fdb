use serde::{Deserialize, Serialize};

/// Weights for the display size of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub centrality_weight: f64,
    pub occurrence_weight: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            centrality_weight: 50.0,
            occurrence_weight: 2.0,
        }
    }
}

impl DisplayConfig {
    pub fn size(&self, centrality: f64, occurrences: usize) -> f64 {
        centrality * self.centrality_weight + occurrences as f64 * self.occurrence_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// The node/edge payload returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub node_count: usize,
    pub edge_count: usize,
}

impl GraphView {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
