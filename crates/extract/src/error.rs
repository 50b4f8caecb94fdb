//! Extraction error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("extractor panicked: {0}")]
    Panicked(String),

    #[error("tagging task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
