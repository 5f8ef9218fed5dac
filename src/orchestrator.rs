//! Fallback orchestrator
//!
//! Walks the source chain for one turn: parametric knowledge, then the
//! document index, then the encyclopedia, then the web, then generation.
//! Each step's I/O result is folded into a state patch by the pure functions
//! in `state_machine::transition`; nothing here can fail a turn.

#[cfg(test)]
pub mod testing;

use crate::sources::{AnswerGenerator, KnowledgeSource, ParametricSource};
use crate::state_machine::transition::{
    encyclopedia_outcome, generation_outcome, indexed_outcome, indexed_query, next_step,
    not_found_outcome, parametric_context, parametric_outcome, plan_generation, web_outcome,
};
use crate::state_machine::{ConversationState, GeneratePlan, StatePatch, Step};
use std::sync::Arc;
use std::time::Instant;

/// The knowledge sources and generator a turn can draw on
#[derive(Clone)]
pub struct FallbackOrchestrator {
    parametric: Arc<dyn ParametricSource>,
    indexed: Arc<dyn KnowledgeSource>,
    encyclopedia: Arc<dyn KnowledgeSource>,
    web: Arc<dyn KnowledgeSource>,
    generator: Arc<dyn AnswerGenerator>,
}

impl FallbackOrchestrator {
    pub fn new(
        parametric: Arc<dyn ParametricSource>,
        indexed: Arc<dyn KnowledgeSource>,
        encyclopedia: Arc<dyn KnowledgeSource>,
        web: Arc<dyn KnowledgeSource>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            parametric,
            indexed,
            encyclopedia,
            web,
            generator,
        }
    }

    /// Run one full turn for `question`. The caller must hold exclusive access
    /// to `state` for the duration. Returns the steps visited, in order.
    pub async fn start_turn(&self, state: &mut ConversationState, question: &str) -> Vec<Step> {
        let started = Instant::now();
        state.begin_turn(question);

        let mut step = Step::ENTRY;
        let mut visited = Vec::with_capacity(5);

        while !step.is_terminal() {
            visited.push(step);
            let patch = self.run_step(step, state).await;
            if !patch.is_empty() {
                state.merge(patch);
            }
            step = next_step(step, state);
            tracing::debug!(?step, source = %state.source, "Step complete");
        }

        tracing::info!(
            source = %state.source,
            steps = visited.len(),
            sources_tried = state.attempted.count(),
            duration_ms = %started.elapsed().as_millis(),
            transcript_len = state.transcript.len(),
            "Turn complete"
        );
        visited
    }

    /// Clear the transcript and every per-turn field
    pub fn reset_conversation(&self, state: &mut ConversationState) {
        state.reset();
        tracing::info!("Conversation reset");
    }

    async fn run_step(&self, step: Step, state: &ConversationState) -> StatePatch {
        match step {
            Step::QueryParametric => {
                let context = parametric_context(state);
                let result = self.parametric.answer(&state.question, &context).await;
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Parametric answer unavailable");
                }
                parametric_outcome(state, result)
            }
            Step::QueryIndexed => {
                let query = indexed_query(state);
                let result = self.indexed.fetch(&query).await;
                log_lookup(self.indexed.as_ref(), &result);
                indexed_outcome(state, query, result)
            }
            Step::QueryEncyclopedia => {
                let result = self.encyclopedia.fetch(&state.question).await;
                log_lookup(self.encyclopedia.as_ref(), &result);
                encyclopedia_outcome(state, result)
            }
            Step::QueryWeb => {
                let result = self.web.fetch(&state.question).await;
                log_lookup(self.web.as_ref(), &result);
                web_outcome(state, result)
            }
            Step::Generate => match plan_generation(state) {
                GeneratePlan::PassThrough => StatePatch::new(),
                GeneratePlan::NotFound => {
                    tracing::info!("No source produced content");
                    not_found_outcome(state)
                }
                GeneratePlan::Grounded { prompt } => {
                    let result = self.generator.complete(&prompt).await;
                    if let Err(e) = &result {
                        tracing::error!(error = %e, source = %state.source, "Grounded generation failed");
                    }
                    generation_outcome(state, result)
                }
            },
            Step::Done => StatePatch::new(),
        }
    }
}

fn log_lookup<T>(
    source: &dyn KnowledgeSource,
    result: &Result<Vec<T>, crate::sources::SourceError>,
) {
    match result {
        Ok(passages) => {
            tracing::info!(source = source.name(), passages = passages.len(), "Lookup returned");
        }
        Err(e) => tracing::info!(source = source.name(), error = %e, "Lookup found nothing"),
    }
}
