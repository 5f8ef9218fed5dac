//! HTTP request handlers

use super::types::{
    AskRequest, AskResponse, ConversationResponse, CreateSessionResponse, ErrorResponse,
    IndexResponse, MessageResponse, SessionAskRequest, SessionListResponse, SuccessResponse,
};
use super::AppState;
use crate::session::{Session, SessionError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Sessions
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", axum::routing::delete(delete_session))
        .route("/api/sessions/:id/ask", post(ask_session))
        .route("/api/sessions/:id/conversation", get(get_conversation))
        .route("/api/sessions/:id/reset", post(reset_session))
        // First-use session creation
        .route("/api/ask", post(ask))
        // Document index
        .route("/api/index", get(index_stats))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session = state.sessions.create().await;
    Json(CreateSessionResponse {
        session_id: session.id.clone(),
    })
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions.list().await,
    })
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.remove(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let session = existing_session(&state, &id).await?;
    let (conversation, chat_log) = session.snapshot().await;
    Ok(Json(ConversationResponse {
        conversation: chat_log,
        transcript: conversation.transcript,
    }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let session = existing_session(&state, &id).await?;
    state.sessions.reset(&session).await;
    Ok(Json(MessageResponse {
        message: "Conversation reset".to_string(),
    }))
}

// ============================================================
// Asking
// ============================================================

async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = validate_question(&req.question)?;
    let session = state.sessions.get_or_create(req.session_id.as_deref()).await;
    run_turn(&state, session, question).await
}

async fn ask_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SessionAskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = validate_question(&req.question)?;
    let session = existing_session(&state, &id).await?;
    run_turn(&state, session, question).await
}

async fn run_turn(
    state: &AppState,
    session: Arc<Session>,
    question: String,
) -> Result<Json<AskResponse>, AppError> {
    let session_id = session.id.clone();
    tracing::info!(session_id = %session_id, question_len = question.len(), "Turn requested");

    let answer = state.sessions.ask(session, question).await?;
    Ok(Json(AskResponse {
        session_id,
        response: answer.response,
        source: answer.source,
    }))
}

fn validate_question(question: &str) -> Result<String, AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("Question must not be empty".to_string()));
    }
    Ok(question.to_string())
}

async fn existing_session(state: &AppState, id: &str) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Index and version
// ============================================================

async fn index_stats(State(state): State<AppState>) -> Result<Json<IndexResponse>, AppError> {
    let index = state.index.clone();
    let stats = tokio::task::spawn_blocking(move || index.stats())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(IndexResponse { stats }))
}

async fn get_version() -> &'static str {
    concat!("medigenius ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub(crate) enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::TurnAborted(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
