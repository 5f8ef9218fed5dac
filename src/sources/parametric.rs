//! Language-model backed parametric source and answer generator

use super::{AnswerGenerator, GenerationFailure, ParametricSource};
use crate::llm::{LlmError, LlmRequest, LlmService, Sampling};
use crate::prompt;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Asks a chat model as a doctor, either from its own knowledge or from a
/// grounded prompt. One instance usually serves both roles.
pub struct LlmAdvisor {
    llm: Arc<dyn LlmService>,
    sampling: Sampling,
    timeout: Duration,
}

impl LlmAdvisor {
    pub fn new(llm: Arc<dyn LlmService>, sampling: Sampling, timeout: Duration) -> Self {
        Self {
            llm,
            sampling,
            timeout,
        }
    }

    async fn ask(&self, prompt: String) -> Result<String, GenerationFailure> {
        let request = LlmRequest::prompt(prompt).with_sampling(self.sampling);

        let response = tokio::time::timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| LlmError::timeout(self.timeout))??;

        response
            .answer()
            .map(str::to_string)
            .ok_or_else(|| LlmError::empty_response().into())
    }
}

#[async_trait]
impl ParametricSource for LlmAdvisor {
    async fn answer(&self, question: &str, context: &str) -> Result<String, GenerationFailure> {
        self.ask(prompt::parametric_prompt(context, question)).await
    }
}

#[async_trait]
impl AnswerGenerator for LlmAdvisor {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationFailure> {
        self.ask(prompt.to_string()).await
    }
}

/// Stand-in when no model API key is configured: every call fails, so turns
/// fall through to the lookup sources and end with the fixed error text
pub struct NoModel;

#[async_trait]
impl ParametricSource for NoModel {
    async fn answer(&self, _question: &str, _context: &str) -> Result<String, GenerationFailure> {
        Err(GenerationFailure::new("no language model configured"))
    }
}

#[async_trait]
impl AnswerGenerator for NoModel {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationFailure> {
        Err(GenerationFailure::new("no language model configured"))
    }
}
