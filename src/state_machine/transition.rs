//! Pure step routing and outcome functions
//!
//! Every function here is a pure function of the state and the result of an
//! external call. The orchestrator performs the I/O and merges the patches.

use super::state::{ConversationState, Passage, Source, StatePatch};
use crate::prompt;
use crate::sources::{GenerationFailure, SourceError};
use serde::Serialize;

pub const NOT_FOUND_MESSAGE: &str = "I couldn't find enough information to answer your question right now. Please consult a licensed medical professional.";
pub const GENERATION_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

const PARAMETRIC_UNAVAILABLE_LINE: &str =
    "AI: Model knowledge unavailable, consulting other sources...";
const NOT_FOUND_LINE: &str = "Doctor: I couldn't find enough information to answer your question.";
const GENERATION_ERROR_LINE: &str = "Doctor: An error occurred.";

/// Number of transcript lines carried into a grounded prompt
pub const GROUNDED_CONTEXT_LINES: usize = 3;

/// A node of the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    QueryParametric,
    QueryIndexed,
    QueryEncyclopedia,
    QueryWeb,
    Generate,
    Done,
}

impl Step {
    /// Every turn enters here
    pub const ENTRY: Step = Step::QueryParametric;

    pub fn is_terminal(self) -> bool {
        matches!(self, Step::Done)
    }
}

// ============================================================================
// Routing
// ============================================================================

pub fn route_after_parametric(state: &ConversationState) -> Step {
    if state.has_generation() {
        Step::Generate
    } else {
        Step::QueryIndexed
    }
}

pub fn route_after_indexed(state: &ConversationState) -> Step {
    if state.has_documents() {
        Step::Generate
    } else {
        Step::QueryEncyclopedia
    }
}

pub fn route_after_encyclopedia(state: &ConversationState) -> Step {
    if state.has_documents() {
        Step::Generate
    } else {
        Step::QueryWeb
    }
}

/// Step that follows `step`, given the state after `step`'s patch was merged
pub fn next_step(step: Step, state: &ConversationState) -> Step {
    match step {
        Step::QueryParametric => route_after_parametric(state),
        Step::QueryIndexed => route_after_indexed(state),
        Step::QueryEncyclopedia => route_after_encyclopedia(state),
        Step::QueryWeb => Step::Generate,
        Step::Generate | Step::Done => Step::Done,
    }
}

// ============================================================================
// Source outcomes
// ============================================================================

/// Context text handed to the parametric source: the whole transcript
pub fn parametric_context(state: &ConversationState) -> String {
    state.transcript.join("\n")
}

pub fn parametric_outcome(
    state: &ConversationState,
    result: Result<String, GenerationFailure>,
) -> StatePatch {
    let attempted = state.attempted.with(Source::Parametric);
    let user_line = format!("User: {}", state.question);

    match result.as_deref().map(str::trim) {
        Ok(answer) if !answer.is_empty() => StatePatch::new()
            .generation(answer)
            .source(Source::Parametric)
            .attempted(attempted)
            .transcript(state.transcript_with([user_line, format!("Doctor: {answer}")])),
        _ => StatePatch::new().attempted(attempted).transcript(
            state.transcript_with([user_line, PARAMETRIC_UNAVAILABLE_LINE.to_string()]),
        ),
    }
}

/// Query for the document index, augmented with the earlier turns when
/// present. Lines written during this turn stay out of the query.
pub fn indexed_query(state: &ConversationState) -> String {
    let prior = state.prior_transcript();
    if prior.is_empty() {
        state.question.clone()
    } else {
        format!("Context: {}\nQuestion: {}", prior.join("\n"), state.question)
    }
}

pub fn indexed_outcome(
    state: &ConversationState,
    query: String,
    result: Result<Vec<Passage>, SourceError>,
) -> StatePatch {
    let patch = StatePatch::new()
        .search_query(Some(query))
        .attempted(state.attempted.with(Source::Indexed));

    match usable(result) {
        Ok(passages) => patch
            .documents(passages)
            .source(Source::Indexed)
            .transcript(state.transcript_with(["AI: Searching medical documents...".to_string()])),
        Err(e) => {
            let line = if e.is_empty() {
                "AI: No matching medical documents found."
            } else {
                "AI: Document retrieval failed."
            };
            patch
                .documents(Vec::new())
                .transcript(state.transcript_with([line.to_string()]))
        }
    }
}

pub fn encyclopedia_outcome(
    state: &ConversationState,
    result: Result<Vec<Passage>, SourceError>,
) -> StatePatch {
    let patch = StatePatch::new().attempted(state.attempted.with(Source::Encyclopedia));

    match usable(result) {
        Ok(passages) => patch
            .documents(passages)
            .source(Source::Encyclopedia)
            .transcript(state.transcript_with(["AI: Searching the encyclopedia...".to_string()])),
        Err(e) => {
            let line = if e.is_empty() {
                "AI: No encyclopedia entry found."
            } else {
                "AI: Encyclopedia retrieval failed."
            };
            patch
                .documents(Vec::new())
                .transcript(state.transcript_with([line.to_string()]))
        }
    }
}

/// Web search is the last resort: whatever it returns goes to generation
pub fn web_outcome(
    state: &ConversationState,
    result: Result<Vec<Passage>, SourceError>,
) -> StatePatch {
    let (documents, line) = match usable(result) {
        Ok(passages) => (passages, "AI: Searching the web..."),
        Err(e) if e.is_empty() => (Vec::new(), "AI: No web results found."),
        Err(_) => (Vec::new(), "AI: Web search failed."),
    };

    StatePatch::new()
        .documents(documents)
        .source(Source::Web)
        .attempted(state.attempted.with(Source::Web))
        .transcript(state.transcript_with([line.to_string()]))
}

/// Drop blank passages; an empty remainder counts as no content
fn usable(result: Result<Vec<Passage>, SourceError>) -> Result<Vec<Passage>, SourceError> {
    let passages: Vec<Passage> = result?.into_iter().filter(|p| !p.is_blank()).collect();
    if passages.is_empty() {
        Err(SourceError::Empty)
    } else {
        Ok(passages)
    }
}

// ============================================================================
// Generation
// ============================================================================

/// What the generate step has to do for the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratePlan {
    /// The parametric answer stands as is
    PassThrough,
    /// Nothing was found anywhere
    NotFound,
    /// Ask the generator to answer from the retrieved passages
    Grounded { prompt: String },
}

pub fn plan_generation(state: &ConversationState) -> GeneratePlan {
    if state.source == Source::Parametric {
        return GeneratePlan::PassThrough;
    }
    if !state.has_documents() {
        return GeneratePlan::NotFound;
    }

    let content = state
        .documents
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let context = state.recent_transcript(GROUNDED_CONTEXT_LINES).join("\n");

    GeneratePlan::Grounded {
        prompt: prompt::grounded_prompt(&context, &state.question, &content),
    }
}

pub fn not_found_outcome(state: &ConversationState) -> StatePatch {
    StatePatch::new()
        .generation(NOT_FOUND_MESSAGE)
        .source(Source::None)
        .transcript(state.transcript_with([NOT_FOUND_LINE.to_string()]))
}

/// Grounded generation result. `source` is kept on success.
pub fn generation_outcome(
    state: &ConversationState,
    result: Result<String, GenerationFailure>,
) -> StatePatch {
    match result.as_deref().map(str::trim) {
        Ok(answer) if !answer.is_empty() => StatePatch::new()
            .generation(answer)
            .transcript(state.transcript_with([format!("Doctor: {answer}")])),
        _ => StatePatch::new()
            .generation(GENERATION_ERROR_MESSAGE)
            .source(Source::None)
            .transcript(state.transcript_with([GENERATION_ERROR_LINE.to_string()])),
    }
}
