//! Knowledge source error types

use crate::llm::LlmError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single source lookup. Always recovered by advancing to the
/// next source, never propagated out of a turn.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("source returned no content")]
    Empty,
    #[error("source timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl SourceError {
    pub fn unavailable(cause: impl std::fmt::Display) -> Self {
        Self::Unavailable(cause.to_string())
    }

    /// Whether the source answered but had nothing for this query
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(format!("request failed: {e}"))
    }
}

/// Failure of a language-model call made for parametric answering or
/// grounded generation
#[derive(Debug, Error)]
#[error("generation failed: {cause}")]
pub struct GenerationFailure {
    pub cause: String,
}

impl GenerationFailure {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl From<LlmError> for GenerationFailure {
    fn from(e: LlmError) -> Self {
        Self::new(e.message)
    }
}
