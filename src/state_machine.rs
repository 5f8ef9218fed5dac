//! Conversation state and the fallback state machine
//!
//! State is a typed record updated through partial patches; the chain of
//! knowledge sources is an explicit step enum with pure routing.

pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use state::{Attempted, ConversationState, Passage, Source, StatePatch};
pub use transition::{GeneratePlan, Step, GENERATION_ERROR_MESSAGE, NOT_FOUND_MESSAGE};
