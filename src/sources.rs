//! Knowledge sources consulted during a turn
//!
//! Each source sits behind a trait so the orchestrator stays agnostic of how
//! retrieval happens. Adapters bound every external call with a timeout and
//! never retry internally.

mod documents;
mod duckduckgo;
mod error;
mod parametric;
mod wikipedia;

pub use documents::IndexedDocuments;
pub use duckduckgo::DuckDuckGo;
pub use error::{GenerationFailure, SourceError};
pub use parametric::{LlmAdvisor, NoModel};
pub use wikipedia::Wikipedia;

use crate::state_machine::Passage;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// A lookup source that returns supporting passages for a query
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    async fn fetch(&self, query: &str) -> Result<Vec<Passage>, SourceError>;
}

/// A source that answers directly from model knowledge
#[async_trait]
pub trait ParametricSource: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String, GenerationFailure>;
}

/// Produces the final answer from a fully built prompt
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationFailure>;
}

/// Await `fut`, mapping an elapsed deadline to [`SourceError::Timeout`]
pub(crate) async fn within<T, F>(limit: Duration, fut: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(SourceError::Timeout(limit)))
}

/// Truncate to at most `max_chars` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text.get(..idx).unwrap_or(text),
        None => text,
    }
}
