//! Conversation state types

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source and Passage
// ============================================================================

/// Which knowledge source produced the current turn's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The model's own parametric knowledge
    Parametric,
    /// The local document index
    Indexed,
    /// Encyclopedia lookup
    Encyclopedia,
    /// Web search
    Web,
    /// Nothing usable was found
    #[default]
    None,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Parametric => "parametric",
            Source::Indexed => "indexed",
            Source::Encyclopedia => "encyclopedia",
            Source::Web => "web",
            Source::None => "none",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of retrieved supporting text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
}

impl Passage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Per-source flags recording which nodes ran in the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attempted {
    pub parametric: bool,
    pub indexed: bool,
    pub encyclopedia: bool,
    pub web: bool,
}

impl Attempted {
    /// Copy of these flags with `source` marked as attempted
    #[must_use]
    pub fn with(mut self, source: Source) -> Self {
        match source {
            Source::Parametric => self.parametric = true,
            Source::Indexed => self.indexed = true,
            Source::Encyclopedia => self.encyclopedia = true,
            Source::Web => self.web = true,
            Source::None => {}
        }
        self
    }

    pub fn count(self) -> usize {
        [self.parametric, self.indexed, self.encyclopedia, self.web]
            .into_iter()
            .filter(|flag| *flag)
            .count()
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// State threaded through every step of a turn, owned by one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Current turn's input
    pub question: String,
    /// Supporting material for the current turn
    pub documents: Vec<Passage>,
    /// Final answer for the current turn
    pub generation: String,
    pub source: Source,
    /// Query actually sent to the document index, kept for diagnostics
    pub search_query: Option<String>,
    /// Append-only log of the conversation and system actions
    pub transcript: Vec<String>,
    pub attempted: Attempted,
    /// Transcript length when the current turn began
    #[serde(default)]
    pub turn_start: usize,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow key-wise overwrite: every field present in `patch` replaces the
    /// stored value outright, absent fields are left untouched.
    pub fn merge(&mut self, patch: StatePatch) {
        let StatePatch {
            question,
            documents,
            generation,
            source,
            search_query,
            transcript,
            attempted,
        } = patch;

        if let Some(question) = question {
            self.question = question;
        }
        if let Some(documents) = documents {
            self.documents = documents;
        }
        if let Some(generation) = generation {
            self.generation = generation;
        }
        if let Some(source) = source {
            self.source = source;
        }
        if let Some(search_query) = search_query {
            self.search_query = search_query;
        }
        if let Some(transcript) = transcript {
            self.transcript = transcript;
        }
        if let Some(attempted) = attempted {
            self.attempted = attempted;
        }
    }

    /// Current state for a reader
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Clear the transcript along with every per-turn field. Idempotent.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clear per-turn fields and install the new question; the transcript is kept
    pub fn begin_turn(&mut self, question: &str) {
        self.merge(StatePatch::new_turn(question));
        self.turn_start = self.transcript.len();
    }

    pub fn has_generation(&self) -> bool {
        !self.generation.trim().is_empty()
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    /// Transcript extended with `lines`, for passing back through a patch
    pub fn transcript_with<I>(&self, lines: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut transcript = self.transcript.clone();
        transcript.extend(lines);
        transcript
    }

    /// Transcript as it stood before the current turn added any lines
    pub fn prior_transcript(&self) -> &[String] {
        self.transcript.get(..self.turn_start).unwrap_or(&self.transcript)
    }

    /// The last `n` transcript lines (fewer if the transcript is shorter)
    pub fn recent_transcript(&self, n: usize) -> &[String] {
        let start = self.transcript.len().saturating_sub(n);
        &self.transcript[start..]
    }
}

/// Partial update to a [`ConversationState`], one optional per field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub question: Option<String>,
    pub documents: Option<Vec<Passage>>,
    pub generation: Option<String>,
    pub source: Option<Source>,
    pub search_query: Option<Option<String>>,
    pub transcript: Option<Vec<String>>,
    pub attempted: Option<Attempted>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-turn reset installing a fresh question
    pub fn new_turn(question: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            documents: Some(Vec::new()),
            generation: Some(String::new()),
            source: Some(Source::None),
            search_query: Some(None),
            transcript: None,
            attempted: Some(Attempted::default()),
        }
    }

    #[must_use]
    pub fn documents(mut self, documents: Vec<Passage>) -> Self {
        self.documents = Some(documents);
        self
    }

    #[must_use]
    pub fn generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = Some(generation.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn search_query(mut self, query: Option<String>) -> Self {
        self.search_query = Some(query);
        self
    }

    #[must_use]
    pub fn transcript(mut self, transcript: Vec<String>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    #[must_use]
    pub fn attempted(mut self, attempted: Attempted) -> Self {
        self.attempted = Some(attempted);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
