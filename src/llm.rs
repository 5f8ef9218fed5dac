//! Chat-completion backends
//!
//! A turn calls a model at most twice: once to answer from its own knowledge
//! and once to write an answer grounded in retrieved passages. Both calls go
//! through [`LlmService`], so the Groq, OpenAI and Anthropic clients are
//! interchangeable behind the registry.

mod anthropic;
mod error;
mod models;
mod openai;
mod registry;
mod types;

#[cfg(test)]
mod proptests;

pub use anthropic::AnthropicService;
pub use error::{LlmError, LlmErrorKind};
pub use models::{all_models, ModelDef, Provider};
pub use openai::OpenAIService;
pub use registry::{LlmConfig, ModelRegistry};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Registry id, also used as the `model` field in logs
    fn model_id(&self) -> &str;
}

/// Emits one structured event per completion with latency and token usage
pub struct Instrumented {
    inner: Arc<dyn LlmService>,
}

impl Instrumented {
    pub fn wrap(inner: Arc<dyn LlmService>) -> Arc<dyn LlmService> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl LlmService for Instrumented {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let started = Instant::now();
        let outcome = self.inner.complete(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let model = self.inner.model_id();

        match &outcome {
            Ok(response) => tracing::info!(
                model,
                elapsed_ms,
                prompt_chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Completion returned"
            ),
            Err(e) => tracing::warn!(
                model,
                elapsed_ms,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                error = %e.message,
                "Completion failed"
            ),
        }

        outcome
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
