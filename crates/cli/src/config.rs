use anyhow::{Context, Result};
use extract::{CacheConfig, ExtractorKind, ModelConfig, SchedulerConfig};
use graph::{BuildConfig, RenderConfig};
use ingest::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the binary needs; each section falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorKind,
    #[serde(flatten)]
    pub build: BuildConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Rule-based extraction over every chunk; no model calls.
    pub fn fast_mode() -> Self {
        let mut config = Self::default();
        config.extractor = ExtractorKind::Rule;
        config.build.chunking = ChunkerConfig {
            max_chunks_per_document: None,
            ..ChunkerConfig::default()
        };
        config.build.scheduler = SchedulerConfig {
            concurrency: 4,
            stagger_ms: 0,
        };
        config
    }

    /// Model-based extraction with a patient timeout.
    pub fn accurate_mode() -> Self {
        let mut config = Self::default();
        config.extractor = ExtractorKind::Model;
        config.build.scheduler = SchedulerConfig {
            concurrency: 2,
            stagger_ms: 500,
        };
        config.model.timeout_secs = 120;
        config
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.extractor, ExtractorKind::Rule);
        assert_eq!(config.build.scheduler.concurrency, 2);
        assert_eq!(config.build.scheduler.stagger_ms, 500);
        assert_eq!(config.build.chunking.max_chars, 1000);
        assert_eq!(config.build.display.centrality_weight, 50.0);
        assert_eq!(config.model.timeout_secs, 60);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_sections_override_defaults() {
        let raw = r#"
            extractor = "model"

            [chunking]
            max_chars = 500
            max_chunks_per_document = 3

            [scheduler]
            concurrency = 1

            [model]
            provider = "openai"
            base_url = "https://open.bigmodel.cn/api/paas/v4"
            model = "glm-4-flash"
        "#;
        let config = AppConfig::from_toml_str(raw).unwrap();

        assert_eq!(config.extractor, ExtractorKind::Model);
        assert_eq!(config.build.chunking.max_chars, 500);
        assert_eq!(config.build.chunking.overlap_chars, 100);
        assert_eq!(config.build.chunking.max_chunks_per_document, Some(3));
        assert_eq!(config.build.scheduler.concurrency, 1);
        assert_eq!(config.build.scheduler.stagger_ms, 500);
        assert_eq!(config.model.model, "glm-4-flash");
    }

    #[test]
    fn test_unknown_extractor_is_rejected() {
        assert!(AppConfig::from_toml_str(r#"extractor = "magic""#).is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(AppConfig::fast_mode().extractor, ExtractorKind::Rule);
        assert_eq!(AppConfig::fast_mode().build.chunking.max_chunks_per_document, None);
        assert_eq!(AppConfig::accurate_mode().extractor, ExtractorKind::Model);
        assert_eq!(AppConfig::accurate_mode().model.timeout_secs, 120);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.toml");
        std::fs::write(&path, "[display]\noccurrence_weight = 3.0\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.build.display.occurrence_weight, 3.0);
    }
}
