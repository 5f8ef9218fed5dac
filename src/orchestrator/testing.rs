//! Mock implementations for testing
//!
//! These mocks let the orchestrator and adapters run without network access.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::sources::{AnswerGenerator, GenerationFailure, KnowledgeSource, ParametricSource, SourceError};
use crate::state_machine::Passage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock knowledge sources
// ============================================================================

/// Canned reply for a mock source
#[derive(Debug, Clone)]
pub enum Reply {
    Passages(Vec<String>),
    Empty,
    Fail(String),
    /// Reports the lookup as having run past its deadline
    Timeout,
}

impl Reply {
    pub fn passages(texts: &[&str]) -> Self {
        Reply::Passages(texts.iter().map(|t| (*t).to_string()).collect())
    }

    pub fn fail(cause: &str) -> Self {
        Reply::Fail(cause.to_string())
    }
}

/// Knowledge source that always gives the same reply and records queries
pub struct MockSource {
    name: &'static str,
    reply: Reply,
    queries: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new(name: &'static str, reply: Reply) -> Self {
        Self {
            name,
            reply,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Passage>, SourceError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.reply {
            Reply::Passages(texts) => Ok(texts.iter().map(Passage::new).collect()),
            Reply::Empty => Err(SourceError::Empty),
            Reply::Fail(cause) => Err(SourceError::unavailable(cause)),
            Reply::Timeout => Err(SourceError::Timeout(Duration::from_secs(20))),
        }
    }
}

// ============================================================================
// Mock parametric source and generator
// ============================================================================

/// Model stand-in for both parametric answering and generation. `None`
/// replies fail.
pub struct MockModel {
    reply: Option<String>,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn answering(text: &str) -> Self {
        Self::replying(Some(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::replying(None)
    }

    pub fn replying(reply: Option<String>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Contexts (parametric) or prompts (generation) received, in order
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    fn respond(&self, input: &str) -> Result<String, GenerationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.to_string());
        self.reply
            .clone()
            .ok_or_else(|| GenerationFailure::new("mock model failure"))
    }
}

#[async_trait]
impl ParametricSource for MockModel {
    async fn answer(&self, _question: &str, context: &str) -> Result<String, GenerationFailure> {
        self.respond(context)
    }
}

#[async_trait]
impl AnswerGenerator for MockModel {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationFailure> {
        self.respond(prompt)
    }
}
