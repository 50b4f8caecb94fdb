//! Part-of-speech heuristic extractor.
//!
//! Sentences are tagged word by word; nouns become entities, and strictly
//! adjacent `entity verb entity` or `entity 的 entity` triples become
//! relations. There is no dependency parse.

use async_trait::async_trait;
use jieba_rs::Jieba;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::error::Result;
use crate::extractor::Extractor;
use crate::schema::{ExtractionResult, Relation};

/// Sentences shorter than this (in characters) are skipped.
pub const MIN_SENTENCE_CHARS: usize = 5;

pub const POSSESSION_LABEL: &str = "owns";

const POSSESSIVE_PARTICLE: &str = "的";

const ENTITY_TAGS: &[&str] = &["n", "nr", "ns", "nt", "nz", "eng"];

const STOP_WORDS: &[&str] = &[
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这",
];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。！？\n]").expect("sentence pattern is valid"));

static JIEBA: LazyLock<Jieba> = LazyLock::new(Jieba::new);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub tag: String,
}

impl Token {
    pub fn new(word: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            tag: tag.into(),
        }
    }
}

/// Splits a sentence into words with part-of-speech tags.
pub trait Tagger: Send + Sync {
    fn tag(&self, sentence: &str) -> Vec<Token>;
}

/// Jieba segmentation with HMM; the dictionary loads once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiebaTagger;

impl Tagger for JiebaTagger {
    fn tag(&self, sentence: &str) -> Vec<Token> {
        JIEBA
            .tag(sentence, true)
            .into_iter()
            .map(|t| Token::new(t.word, t.tag))
            .collect()
    }
}

#[derive(Clone)]
pub struct RuleBasedExtractor {
    tagger: Arc<dyn Tagger>,
    stop_words: HashSet<&'static str>,
}

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self::with_tagger(Arc::new(JiebaTagger))
    }

    pub fn with_tagger(tagger: Arc<dyn Tagger>) -> Self {
        Self {
            tagger,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    pub fn extract_text(&self, text: &str) -> ExtractionResult {
        let mut result = ExtractionResult::empty();

        for sentence in split_sentences(text) {
            let tokens: Vec<Token> = self
                .tagger
                .tag(&sentence)
                .into_iter()
                .filter(|t| !t.word.is_empty())
                .collect();

            result.entities.extend(self.entities(&tokens));
            result.relations.extend(self.relations(&tokens));
        }

        result
    }

    fn is_entity(&self, token: &Token) -> bool {
        ENTITY_TAGS.contains(&token.tag.as_str())
            && token.word.chars().count() > 1
            && !self.stop_words.contains(token.word.as_str())
    }

    fn is_verb(token: &Token) -> bool {
        token.tag.starts_with('v') && !token.word.is_empty()
    }

    /// Entity candidates of one sentence, first occurrence wins.
    fn entities(&self, tokens: &[Token]) -> Vec<String> {
        let mut seen = HashSet::new();
        tokens
            .iter()
            .filter(|t| self.is_entity(t))
            .filter(|t| seen.insert(t.word.as_str()))
            .map(|t| t.word.clone())
            .collect()
    }

    fn relations(&self, tokens: &[Token]) -> Vec<Relation> {
        let mut relations = Vec::new();

        for window in tokens.windows(3) {
            let (head, middle, tail) = (&window[0], &window[1], &window[2]);
            if !self.is_entity(head) || !self.is_entity(tail) {
                continue;
            }

            if Self::is_verb(middle) {
                relations.push(Relation::new(&head.word, &tail.word, &middle.word));
            }
            if middle.word == POSSESSIVE_PARTICLE {
                relations.push(Relation::new(&head.word, &tail.word, POSSESSION_LABEL));
            }
        }

        relations
    }
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for RuleBasedExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractionResult> {
        let extractor = self.clone();
        let text = text.to_owned();

        let result = tokio::task::spawn_blocking(move || extractor.extract_text(&text)).await?;
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "rule"
    }
}

/// Collapse whitespace, split on Latin and CJK terminators, drop short pieces.
pub fn split_sentences(text: &str) -> Vec<String> {
    let collapsed = WHITESPACE.replace_all(text, " ");

    SENTENCE_END
        .split(&collapsed)
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}
