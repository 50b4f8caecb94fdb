use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::extractor::Extractor;
use crate::llm::LanguageModel;
use crate::prompt::build_extraction_prompt;
use crate::schema::ExtractionResult;

/// Prompts a language model for strict JSON and parses its answer.
pub struct ModelExtractor {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl ModelExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }
}

#[async_trait]
impl Extractor for ModelExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractionResult> {
        let prompt = build_extraction_prompt(text);

        let raw = tokio::time::timeout(self.timeout, self.model.complete(&prompt))
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout))??;

        match parse_response(&raw) {
            Ok(result) => {
                debug!(
                    entities = result.entities.len(),
                    relations = result.relations.len(),
                    "Parsed model extraction"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed model output");
                Ok(ExtractionResult::empty())
            }
        }
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

/// Remove a surrounding ``` or ```json fence if the model added one.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

pub fn parse_response(raw: &str) -> Result<ExtractionResult> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| ExtractError::MalformedOutput(e.to_string()))
}

/// Whether a raw response would parse into an [`ExtractionResult`].
pub fn is_well_formed(raw: &str) -> bool {
    parse_response(raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedModel;
    use crate::schema::Relation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".to_string())
        }
    }

    /// Answers each call with the next scripted response, repeating the last.
    struct ScriptedModel {
        responses: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            let last = self.responses.len() - 1;
            Ok(self.responses[i.min(last)].to_string())
        }
    }

    fn extractor(model: impl LanguageModel + 'static) -> ModelExtractor {
        ModelExtractor::new(Arc::new(model), Duration::from_secs(1))
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[tokio::test]
    async fn test_fenced_json_is_parsed() {
        let raw = "```json\n{\"entities\": [\"A\", \"B\"], \"relations\": [{\"source\": \"A\", \"target\": \"B\", \"relation\": \"uses\"}]}\n```";
        let result = extractor(FixedModel(raw)).extract("text").await.unwrap();

        assert_eq!(result.entities, vec!["A", "B"]);
        assert_eq!(result.relations, vec![Relation::new("A", "B", "uses")]);
    }

    #[tokio::test]
    async fn test_not_json_yields_empty_result() {
        let result = extractor(FixedModel("not json")).extract("text").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_yields_empty_result() {
        let raw = r#"{"entities": "A", "relations": []}"#;
        let result = extractor(FixedModel(raw)).extract("text").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_yields_empty_result() {
        let result = extractor(FixedModel(r#"{"entities": ["A"]}"#))
            .extract("text")
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_answer_is_not_cached() {
        let model = Arc::new(ScriptedModel {
            responses: vec![
                "not json",
                r#"{"entities": ["A", "B"], "relations": []}"#,
            ],
            calls: AtomicUsize::new(0),
        });
        let cached = CachedModel::new(model.clone(), 10).with_validator(is_well_formed);
        let extractor = ModelExtractor::new(Arc::new(cached), Duration::from_secs(1));

        assert!(extractor.extract("text").await.unwrap().is_empty());
        let second = extractor.extract("text").await.unwrap();
        assert_eq!(second.entities, vec!["A", "B"]);

        let third = extractor.extract("text").await.unwrap();
        assert_eq!(third, second);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let err = extractor(FailingModel).extract("text").await.unwrap_err();
        assert!(matches!(err, ExtractError::Transport(_)));
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let extractor = ModelExtractor::new(Arc::new(SlowModel), Duration::from_millis(20));
        let err = extractor.extract("text").await.unwrap_err();
        assert!(matches!(err, ExtractError::Timeout(_)));
    }
}
