//! Bounded, staggered fan-out of extraction calls over chunks.
//!
//! Every chunk yields exactly one [`ChunkOutcome`]. A failing or panicking
//! extraction becomes a `Failed` outcome with an empty result; it never
//! affects sibling chunks.

use futures::FutureExt;
use ingest::Chunk;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::schema::ExtractionResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub concurrency: usize,
    /// Fixed delay between successive dispatches.
    pub stagger_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            stagger_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkState {
    Pending,
    Submitted,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub doc_id: String,
    pub chunk_id: String,
    pub state: ChunkState,
    /// Empty when the chunk failed.
    pub result: ExtractionResult,
    pub error: Option<String>,
}

impl ChunkOutcome {
    pub fn is_failed(&self) -> bool {
        self.state == ChunkState::Failed
    }
}

pub struct ExtractionScheduler {
    concurrency: usize,
    stagger: Duration,
}

impl ExtractionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            stagger: Duration::from_millis(config.stagger_ms),
        }
    }

    /// Start extracting and stream outcomes in completion order. The
    /// receiver closes once every chunk has reported.
    pub fn dispatch(
        &self,
        chunks: Vec<Chunk>,
        extractor: Arc<dyn Extractor>,
    ) -> mpsc::UnboundedReceiver<ChunkOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let stagger = self.stagger;

        debug!(
            chunks = chunks.len(),
            state = ?ChunkState::Pending,
            extractor = extractor.name(),
            "Queued chunks for extraction"
        );

        tokio::spawn(async move {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if i > 0 && !stagger.is_zero() {
                    tokio::time::sleep(stagger).await;
                }

                debug!(chunk_id = %chunk.chunk_id, state = ?ChunkState::Submitted, "Submitting chunk");

                let tx = tx.clone();
                let permits = Arc::clone(&permits);
                let extractor = Arc::clone(&extractor);

                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let outcome = run_chunk(chunk, extractor.as_ref()).await;
                    // The receiver may have been dropped by the caller.
                    let _ = tx.send(outcome);
                });
            }
        });

        rx
    }

    /// Extract every chunk and collect the outcomes.
    pub async fn run(&self, chunks: Vec<Chunk>, extractor: Arc<dyn Extractor>) -> Vec<ChunkOutcome> {
        let mut rx = self.dispatch(chunks, extractor);
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn run_chunk(chunk: Chunk, extractor: &dyn Extractor) -> ChunkOutcome {
    let attempt = AssertUnwindSafe(extractor.extract(&chunk.text))
        .catch_unwind()
        .await;

    let failure = match attempt {
        Ok(Ok(result)) => {
            debug!(
                chunk_id = %chunk.chunk_id,
                state = ?ChunkState::Completed,
                entities = result.entities.len(),
                relations = result.relations.len(),
                "Chunk extracted"
            );
            return ChunkOutcome {
                doc_id: chunk.doc_id,
                chunk_id: chunk.chunk_id,
                state: ChunkState::Completed,
                result,
                error: None,
            };
        }
        Ok(Err(e)) => e,
        Err(panic) => ExtractError::Panicked(panic_message(&*panic)),
    };

    warn!(
        doc_id = %chunk.doc_id,
        chunk_id = %chunk.chunk_id,
        error = %failure,
        "Chunk extraction failed, contributing nothing"
    );

    ChunkOutcome {
        doc_id: chunk.doc_id,
        chunk_id: chunk.chunk_id,
        state: ChunkState::Failed,
        result: ExtractionResult::empty(),
        error: Some(failure.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
