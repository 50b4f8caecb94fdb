use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use crate::llm::LanguageModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10000,
        }
    }
}

/// Raw model responses keyed by prompt hash.
pub struct ResponseCache {
    responses: DashMap<String, String>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            responses: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        let key = hash_text(prompt);
        self.responses.get(&key).map(|r| r.value().clone())
    }

    pub fn insert(&self, prompt: &str, response: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.responses.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .responses
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.responses.remove(&key);
            }
        }
        self.responses.insert(hash_text(prompt), response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// A language model fronted by a [`ResponseCache`]. Failures, and responses
/// the validator rejects, are not cached.
pub struct CachedModel {
    inner: Arc<dyn LanguageModel>,
    cache: ResponseCache,
    validator: fn(&str) -> bool,
}

impl CachedModel {
    pub fn new(inner: Arc<dyn LanguageModel>, max_entries: usize) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(max_entries),
            validator: |_| true,
        }
    }

    /// Only cache responses for which `validator` returns true.
    pub fn with_validator(mut self, validator: fn(&str) -> bool) -> Self {
        self.validator = validator;
        self
    }
}

#[async_trait]
impl LanguageModel for CachedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Some(hit) = self.cache.get(prompt) {
            debug!("Model response cache hit");
            return Ok(hit);
        }

        let response = self.inner.complete(prompt).await?;
        if (self.validator)(&response) {
            self.cache.insert(prompt, response.clone());
        } else {
            debug!("Model response rejected by validator, not cached");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(format!("echo: {}", prompt))
        }
    }

    #[tokio::test]
    async fn test_repeated_prompt_hits_cache() {
        let inner = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedModel::new(inner.clone(), 10);

        assert_eq!(cached.complete("a").await.unwrap(), "echo: a");
        assert_eq!(cached.complete("a").await.unwrap(), "echo: a");
        cached.complete("b").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedModel::new(inner.clone(), 10);

        assert!(cached.complete("a").await.is_err());
        assert!(cached.complete("a").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_responses_are_not_cached() {
        let inner = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedModel::new(inner.clone(), 10).with_validator(|raw| raw.starts_with('{'));

        cached.complete("a").await.unwrap();
        cached.complete("a").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cached.cache.is_empty());
    }

    #[test]
    fn test_eviction_keeps_cache_bounded() {
        let cache = ResponseCache::new(4);
        for i in 0..20 {
            cache.insert(&format!("prompt {}", i), i.to_string());
        }
        assert!(cache.len() <= 4);
        assert_eq!(cache.get("prompt 19"), Some("19".to_string()));
    }
}
