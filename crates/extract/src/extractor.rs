use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{CacheConfig, CachedModel};
use crate::error::Result;
use crate::llm::{LanguageModel, ModelConfig};
use crate::model::{ModelExtractor, is_well_formed};
use crate::rule_based::RuleBasedExtractor;
use crate::schema::ExtractionResult;

/// Turns one text segment into candidate entities and relations.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractionResult>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    #[default]
    Rule,
    Model,
}

impl std::str::FromStr for ExtractorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rule" | "rules" | "rule-based" => Ok(Self::Rule),
            "model" | "llm" => Ok(Self::Model),
            other => anyhow::bail!("Unknown extractor kind: {}", other),
        }
    }
}

/// Pick the extractor implementation once, from configuration.
pub fn build_extractor(
    kind: ExtractorKind,
    model: &ModelConfig,
    cache: &CacheConfig,
) -> Arc<dyn Extractor> {
    match kind {
        ExtractorKind::Rule => Arc::new(RuleBasedExtractor::new()),
        ExtractorKind::Model => {
            let mut client: Arc<dyn LanguageModel> = model.client();
            if cache.enabled {
                client = Arc::new(
                    CachedModel::new(client, cache.max_entries).with_validator(is_well_formed),
                );
            }
            Arc::new(ModelExtractor::new(client, model.timeout()))
        }
    }
}
