pub mod cache;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod model;
pub mod prompt;
pub mod rule_based;
pub mod scheduler;
pub mod schema;

pub use cache::{CacheConfig, CachedModel, ResponseCache};
pub use error::ExtractError;
pub use extractor::{build_extractor, Extractor, ExtractorKind};
pub use llm::{LanguageModel, ModelConfig, ModelProvider, OllamaClient, OpenAiClient};
pub use model::ModelExtractor;
pub use rule_based::{JiebaTagger, RuleBasedExtractor, Tagger, Token};
pub use scheduler::{ChunkOutcome, ChunkState, ExtractionScheduler, SchedulerConfig};
pub use schema::{ExtractionResult, Relation};
