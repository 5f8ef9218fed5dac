//! Property-based tests for the fallback chain
//!
//! Each case builds a `FallbackOrchestrator` over mock sources that give the
//! generated outcomes, runs real turns on a current-thread runtime, and checks
//! the turn-level invariants against both the state and the recorded calls.

use super::state::*;
use super::transition::*;
use crate::orchestrator::testing::{MockModel, MockSource, Reply};
use crate::orchestrator::FallbackOrchestrator;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Fetch {
    Hit(Vec<String>),
    Empty,
    Unavailable,
    TimedOut,
}

impl Fetch {
    fn reply(&self) -> Reply {
        match self {
            Fetch::Hit(texts) => Reply::Passages(texts.clone()),
            Fetch::Empty => Reply::Empty,
            Fetch::Unavailable => Reply::fail("backend down"),
            Fetch::TimedOut => Reply::Timeout,
        }
    }

    fn has_content(&self) -> bool {
        matches!(self, Fetch::Hit(texts) if texts.iter().any(|t| !t.trim().is_empty()))
    }
}

#[derive(Debug, Clone)]
struct Outcomes {
    parametric: Option<String>,
    indexed: Fetch,
    encyclopedia: Fetch,
    web: Fetch,
    generation: Option<String>,
}

impl Outcomes {
    fn parametric_answers(&self) -> bool {
        self.parametric.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

fn arb_fetch() -> impl Strategy<Value = Fetch> {
    prop_oneof![
        // Includes blank passages, which must be treated as no content
        proptest::collection::vec("[a-zA-Z .]{0,40}|[ \\t\\n]{1,3}", 0..4).prop_map(Fetch::Hit),
        Just(Fetch::Empty),
        Just(Fetch::Unavailable),
        Just(Fetch::TimedOut),
    ]
}

fn arb_answer() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(prop_oneof!["[a-zA-Z .]{1,60}", Just("  ".to_string())])
}

fn arb_outcomes() -> impl Strategy<Value = Outcomes> {
    (arb_answer(), arb_fetch(), arb_fetch(), arb_fetch(), arb_answer()).prop_map(
        |(parametric, indexed, encyclopedia, web, generation)| Outcomes {
            parametric,
            indexed,
            encyclopedia,
            web,
            generation,
        },
    )
}

fn arb_transcript() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("(User|Doctor|AI): [a-z ]{1,20}", 0..6)
}

// ============================================================================
// Driver
// ============================================================================

/// Mock backends for one turn, kept so their calls can be inspected
struct Chain {
    parametric: Arc<MockModel>,
    indexed: Arc<MockSource>,
    encyclopedia: Arc<MockSource>,
    web: Arc<MockSource>,
    generator: Arc<MockModel>,
}

impl Chain {
    fn new(outcomes: &Outcomes) -> Self {
        Self {
            parametric: Arc::new(MockModel::replying(outcomes.parametric.clone())),
            indexed: Arc::new(MockSource::new("documents", outcomes.indexed.reply())),
            encyclopedia: Arc::new(MockSource::new("wikipedia", outcomes.encyclopedia.reply())),
            web: Arc::new(MockSource::new("duckduckgo", outcomes.web.reply())),
            generator: Arc::new(MockModel::replying(outcomes.generation.clone())),
        }
    }

    fn orchestrator(&self) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            self.parametric.clone(),
            self.indexed.clone(),
            self.encyclopedia.clone(),
            self.web.clone(),
            self.generator.clone(),
        )
    }

    /// Run one turn to completion and return the steps visited
    fn run_turn(&self, state: &mut ConversationState, question: &str) -> Vec<Step> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(self.orchestrator().start_turn(state, question))
    }

    fn lookup_calls(&self) -> [usize; 3] {
        [self.indexed.calls(), self.encyclopedia.calls(), self.web.calls()]
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Every turn ends at Done, through Generate, with a non-empty answer
    #[test]
    fn prop_turn_always_answers(outcomes in arb_outcomes(), transcript in arb_transcript()) {
        let chain = Chain::new(&outcomes);
        let mut state = ConversationState { transcript, ..Default::default() };
        let visited = chain.run_turn(&mut state, "What helps a headache?");

        prop_assert_eq!(visited.first(), Some(&Step::QueryParametric));
        prop_assert_eq!(visited.last(), Some(&Step::Generate));
        prop_assert!(state.has_generation());
        prop_assert_eq!(chain.parametric.calls(), 1);
        prop_assert!(chain.generator.calls() <= 1);
    }

    /// A usable parametric answer short-circuits every lookup
    #[test]
    fn prop_parametric_success_skips_lookups(
        answer in "[a-zA-Z][a-zA-Z .]{0,40}",
        outcomes in arb_outcomes(),
    ) {
        let outcomes = Outcomes { parametric: Some(answer.clone()), ..outcomes };
        let chain = Chain::new(&outcomes);
        let mut state = ConversationState::new();
        let visited = chain.run_turn(&mut state, "q");

        prop_assert_eq!(visited, vec![Step::QueryParametric, Step::Generate]);
        prop_assert_eq!(state.source, Source::Parametric);
        prop_assert_eq!(state.generation, answer.trim());
        prop_assert_eq!(state.attempted.count(), 1);
        prop_assert_eq!(chain.lookup_calls(), [0, 0, 0]);
        prop_assert_eq!(chain.generator.calls(), 0);
    }

    /// Steps are visited in priority order, each source is called at most
    /// once, and exactly the visited lookups are called
    #[test]
    fn prop_priority_order(outcomes in arb_outcomes()) {
        let chain = Chain::new(&outcomes);
        let mut state = ConversationState::new();
        let visited = chain.run_turn(&mut state, "q");

        let order = [
            Step::QueryParametric,
            Step::QueryIndexed,
            Step::QueryEncyclopedia,
            Step::QueryWeb,
        ];
        let lookups: Vec<Step> = visited.iter().copied().filter(|s| *s != Step::Generate).collect();
        prop_assert_eq!(&lookups[..], &order[..lookups.len()]);
        prop_assert_eq!(state.attempted.count(), lookups.len());

        let expected_calls = [
            usize::from(lookups.contains(&Step::QueryIndexed)),
            usize::from(lookups.contains(&Step::QueryEncyclopedia)),
            usize::from(lookups.contains(&Step::QueryWeb)),
        ];
        prop_assert_eq!(chain.lookup_calls(), expected_calls);
    }

    /// Web is called exactly when nothing earlier produced content
    #[test]
    fn prop_web_is_last_resort(outcomes in arb_outcomes()) {
        let chain = Chain::new(&outcomes);
        let mut state = ConversationState::new();
        chain.run_turn(&mut state, "q");

        let expect_web = !outcomes.parametric_answers()
            && !outcomes.indexed.has_content()
            && !outcomes.encyclopedia.has_content();
        prop_assert_eq!(chain.web.calls(), usize::from(expect_web));
    }

    /// The generator runs only to ground an answer in retrieved content
    #[test]
    fn prop_generator_only_for_retrieved_content(outcomes in arb_outcomes()) {
        let chain = Chain::new(&outcomes);
        let mut state = ConversationState::new();
        chain.run_turn(&mut state, "q");

        let retrieved = outcomes.indexed.has_content()
            || outcomes.encyclopedia.has_content()
            || outcomes.web.has_content();
        let expect_generation = !outcomes.parametric_answers() && retrieved;
        prop_assert_eq!(chain.generator.calls(), usize::from(expect_generation));
    }

    /// Without a reset the transcript only grows, and earlier lines are preserved
    #[test]
    fn prop_transcript_monotonic(
        turns in proptest::collection::vec(arb_outcomes(), 1..4),
        transcript in arb_transcript(),
    ) {
        let mut state = ConversationState { transcript, ..Default::default() };
        for outcomes in &turns {
            let before = state.transcript.clone();
            Chain::new(outcomes).run_turn(&mut state, "q");
            prop_assert!(state.transcript.len() > before.len());
            prop_assert_eq!(&state.transcript[..before.len()], &before[..]);
        }
    }

    /// Reset clears everything no matter what preceded it
    #[test]
    fn prop_reset_idempotent(outcomes in arb_outcomes(), transcript in arb_transcript()) {
        let chain = Chain::new(&outcomes);
        let orchestrator = chain.orchestrator();
        let mut state = ConversationState { transcript, ..Default::default() };
        chain.run_turn(&mut state, "q");

        orchestrator.reset_conversation(&mut state);
        let once = state.clone();
        orchestrator.reset_conversation(&mut state);

        prop_assert_eq!(&state, &once);
        prop_assert_eq!(state, ConversationState::default());
    }
}
