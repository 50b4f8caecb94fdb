use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::Chunk;
use crate::document::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    /// Chunks past this cap are dropped to bound the number of extraction calls.
    pub max_chunks_per_document: Option<usize>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap_chars: 100,
            max_chunks_per_document: Some(20),
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split text into trimmed segments of at most `max_chars` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.windows(text).map(|(_, segment)| segment).collect()
    }

    /// Chunk a whole document, honouring the per-document cap. Windows past
    /// the cap are never built.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let limit = self.config.max_chunks_per_document.unwrap_or(usize::MAX);

        let mut chunks: Vec<Chunk> = self
            .windows(&document.text)
            .take(limit.saturating_add(1))
            .map(|(offset, text)| Chunk::new(document.id.clone(), text, offset))
            .collect();

        if chunks.len() > limit {
            chunks.truncate(limit);
            debug!(
                doc_id = %document.id,
                kept = limit,
                "Dropping chunks beyond per-document cap"
            );
        }

        chunks
    }

    /// Lazily yield `((start, end), segment)` windows, offsets in chars.
    pub fn windows(&self, text: &str) -> impl Iterator<Item = ((usize, usize), String)> + use<> {
        let chars: Vec<char> = text.chars().collect();
        let max = self.config.max_chars.max(1);
        let overlap = self.config.overlap_chars.min(max - 1);
        let mut start = 0;

        std::iter::from_fn(move || {
            while start < chars.len() {
                let hard_end = (start + max).min(chars.len());
                let end = if hard_end < chars.len() {
                    soft_boundary(&chars, start, hard_end)
                } else {
                    hard_end
                };

                let window = (start, end);
                let segment: String = chars[start..end].iter().collect();

                start = if end >= chars.len() {
                    chars.len()
                } else {
                    // Step back by the overlap, but always move forward.
                    end.saturating_sub(overlap).max(start + 1)
                };

                let trimmed = segment.trim();
                if !trimmed.is_empty() {
                    return Some((window, trimmed.to_string()));
                }
            }
            None
        })
    }
}

/// Prefer cutting after whitespace or a sentence terminator in the back half
/// of the window; otherwise cut hard.
fn soft_boundary(chars: &[char], start: usize, hard_end: usize) -> usize {
    let midpoint = start + (hard_end - start) / 2;

    (midpoint..hard_end)
        .rev()
        .find(|&i| is_boundary(chars[i]))
        .map(|i| i + 1)
        .unwrap_or(hard_end)
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '；' | ';')
}

/// Split `text` with an ad-hoc chunker.
pub fn chunk(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    Chunker::new(ChunkerConfig {
        max_chars,
        overlap_chars,
        max_chunks_per_document: None,
    })
    .split(text)
}
