use anyhow::Result;
use extract::{ChunkState, ExtractionScheduler, Extractor, SchedulerConfig};
use ingest::{Chunker, ChunkerConfig, DocumentScope, DocumentSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::aggregator::KnowledgeGraph;
use crate::render::{GraphRenderer, ImageExport, render_image};
use crate::view::{DisplayConfig, GraphView};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub chunking: ChunkerConfig,
    pub scheduler: SchedulerConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub documents: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub nodes_pruned: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub elapsed_ms: u128,
}

/// Runs the whole pipeline: fetch, chunk, extract, merge, prune.
///
/// Every call starts from an empty graph; nothing is shared between builds.
pub struct GraphBuilder {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn Extractor>,
    chunker: Chunker,
    scheduler: ExtractionScheduler,
    display: DisplayConfig,
}

impl GraphBuilder {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: Arc<dyn Extractor>,
        config: BuildConfig,
    ) -> Self {
        Self {
            source,
            extractor,
            chunker: Chunker::new(config.chunking),
            scheduler: ExtractionScheduler::new(config.scheduler),
            display: config.display,
        }
    }

    pub async fn build(&self, scope: &DocumentScope) -> Result<GraphView> {
        Ok(self.build_with_stats(scope).await?.0)
    }

    pub async fn build_with_stats(&self, scope: &DocumentScope) -> Result<(GraphView, BuildStats)> {
        let (graph, stats) = self.build_graph(scope).await?;
        Ok((graph.export(&self.display), stats))
    }

    /// Build and render. Rendering problems leave `graph_image` empty.
    pub async fn visualize(
        &self,
        scope: &DocumentScope,
        renderer: Arc<dyn GraphRenderer>,
    ) -> Result<ImageExport> {
        let view = self.build(scope).await?;
        if view.is_empty() {
            return Ok(ImageExport::default());
        }

        let rendered = tokio::task::spawn_blocking(move || render_image(&view, renderer.as_ref())).await;
        Ok(rendered.unwrap_or_else(|e| {
            warn!(error = %e, "Render task failed");
            ImageExport::default()
        }))
    }

    /// Build the pruned graph without exporting it.
    pub async fn build_graph(&self, scope: &DocumentScope) -> Result<(KnowledgeGraph, BuildStats)> {
        let span = info_span!("build_graph", build_id = %Uuid::new_v4());
        self.run(scope).instrument(span).await
    }

    async fn run(&self, scope: &DocumentScope) -> Result<(KnowledgeGraph, BuildStats)> {
        let started = Instant::now();
        let mut graph = KnowledgeGraph::new();
        let mut stats = BuildStats::default();

        let documents = self.source.fetch_scope(scope).await?;
        stats.documents = documents.len();

        if documents.is_empty() {
            info!(?scope, "No documents in scope, returning empty graph");
            stats.elapsed_ms = started.elapsed().as_millis();
            return Ok((graph, stats));
        }

        let chunks = ingest::chunk_documents(&self.chunker, &documents);
        stats.chunks = chunks.len();

        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            extractor = self.extractor.name(),
            "Extracting knowledge graph"
        );

        // Outcomes arrive in completion order; merging them one at a time is
        // the only mutation of the graph.
        let mut outcomes = self.scheduler.dispatch(chunks, Arc::clone(&self.extractor));
        while let Some(outcome) = outcomes.recv().await {
            if outcome.state == ChunkState::Failed {
                stats.failed_chunks += 1;
            }
            graph.merge(&outcome.result);
        }

        stats.nodes_pruned = graph.prune();
        stats.node_count = graph.node_count();
        stats.edge_count = graph.edge_count();
        stats.elapsed_ms = started.elapsed().as_millis();

        info!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            pruned = stats.nodes_pruned,
            failed_chunks = stats.failed_chunks,
            elapsed_ms = stats.elapsed_ms as u64,
            "Knowledge graph built"
        );

        Ok((graph, stats))
    }
}
