//! API request and response types

use crate::index::IndexStats;
use crate::session::{ChatEntry, SessionSummary};
use crate::state_machine::Source;
use serde::{Deserialize, Serialize};

/// Ask on an implicit or named session
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Ask on the session named in the path
#[derive(Debug, Deserialize)]
pub struct SessionAskRequest {
    pub question: String,
}

/// Answer for one turn
#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub session_id: String,
    pub response: String,
    pub source: Source,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// Chat log for display plus the raw transcript
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Vec<ChatEntry>,
    pub transcript: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    #[serde(flatten)]
    pub stats: IndexStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
