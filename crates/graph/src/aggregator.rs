//! The canonical in-memory knowledge graph of one build.
//!
//! Nodes are keyed by exact label. There is at most one edge per ordered
//! `(source, target)` pair: repeated relations raise its weight and keep the
//! first label. All counts are sums, so merge order does not matter.

use extract::ExtractionResult;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::HashMap;

use crate::view::{DisplayConfig, EdgeView, GraphView, NodeView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub label: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub relation: String,
    pub weight: usize,
}

#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, label: &str) -> Option<&GraphNode> {
        self.index.get(label).map(|&idx| &self.graph[idx])
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&GraphEdge> {
        let (&s, &t) = (self.index.get(source)?, self.index.get(target)?);
        self.graph.find_edge(s, t).map(|e| &self.graph[e])
    }

    /// In-degree plus out-degree. A self-loop counts twice.
    pub fn degree(&self, label: &str) -> Option<usize> {
        self.index.get(label).map(|&idx| self.degree_of(idx))
    }

    fn degree_of(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
            + self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Fold one extraction result into the graph.
    pub fn merge(&mut self, result: &ExtractionResult) {
        for entity in &result.entities {
            if entity.trim().is_empty() {
                continue;
            }
            match self.index.get(entity) {
                Some(&idx) => self.graph[idx].occurrences += 1,
                None => {
                    self.insert_node(entity);
                }
            }
        }

        for relation in &result.relations {
            if relation.source.trim().is_empty() || relation.target.trim().is_empty() {
                continue;
            }
            let source = self.ensure_node(&relation.source);
            let target = self.ensure_node(&relation.target);

            match self.graph.find_edge(source, target) {
                Some(edge) => self.graph[edge].weight += 1,
                None => {
                    self.graph.add_edge(
                        source,
                        target,
                        GraphEdge {
                            relation: relation.relation.clone(),
                            weight: 1,
                        },
                    );
                }
            }
        }
    }

    fn ensure_node(&mut self, label: &str) -> NodeIndex {
        match self.index.get(label) {
            Some(&idx) => idx,
            None => self.insert_node(label),
        }
    }

    fn insert_node(&mut self, label: &str) -> NodeIndex {
        let idx = self.graph.add_node(GraphNode {
            label: label.to_string(),
            occurrences: 1,
        });
        self.index.insert(label.to_string(), idx);
        idx
    }

    /// Drop isolates mentioned fewer than twice. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let doomed: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.degree_of(idx) == 0 && self.graph[idx].occurrences < 2)
            .collect();

        for &idx in &doomed {
            if let Some(node) = self.graph.remove_node(idx) {
                self.index.remove(&node.label);
            }
        }

        doomed.len()
    }

    /// Degree centrality, `degree / (n - 1)`. A lone node scores 1.0.
    pub fn centrality(&self) -> HashMap<String, f64> {
        let n = self.graph.node_count();
        if n <= 1 {
            return self
                .graph
                .node_indices()
                .map(|idx| (self.graph[idx].label.clone(), 1.0))
                .collect();
        }

        let scale = 1.0 / (n - 1) as f64;
        self.graph
            .node_indices()
            .map(|idx| {
                let label = self.graph[idx].label.clone();
                (label, self.degree_of(idx) as f64 * scale)
            })
            .collect()
    }

    pub fn export(&self, display: &DisplayConfig) -> GraphView {
        if self.graph.node_count() == 0 {
            return GraphView::empty();
        }

        let centrality = self.centrality();

        let nodes: Vec<NodeView> = self
            .graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .map(|node| {
                let score = centrality.get(&node.label).copied().unwrap_or(0.0);
                NodeView {
                    id: node.label.clone(),
                    label: node.label.clone(),
                    size: display.size(score, node.occurrences),
                }
            })
            .collect();

        let edges: Vec<EdgeView> = self
            .graph
            .edge_references()
            .map(|edge| EdgeView {
                source: self.graph[edge.source()].label.clone(),
                target: self.graph[edge.target()].label.clone(),
                label: edge.weight().relation.clone(),
            })
            .collect();

        GraphView {
            node_count: nodes.len(),
            edge_count: edges.len(),
            nodes,
            edges,
        }
    }
}
