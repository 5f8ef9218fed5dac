//! Per-session conversation state
//!
//! Each session owns one `ConversationState` behind an async mutex, so turns
//! on one session run one at a time while separate sessions proceed
//! concurrently. Turns run on spawned tasks and always finish, even if the
//! requesting client goes away. Sessions left idle past the configured TTL
//! are dropped by a background sweep.

use crate::orchestrator::FallbackOrchestrator;
use crate::state_machine::{ConversationState, Source};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Upper bound on the time between idle sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Turn task failed: {0}")]
    TurnAborted(String),
}

/// Who said a chat-log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Front-end friendly record of one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug)]
pub struct SessionData {
    pub conversation: ConversationState,
    pub chat_log: Vec<ChatEntry>,
    /// Last turn, reset, or read
    pub last_active: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            conversation: ConversationState::new(),
            chat_log: Vec::new(),
            last_active: Instant::now(),
        }
    }
}

pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    data: Mutex<SessionData>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            data: Mutex::new(SessionData::new()),
        }
    }

    /// Conversation snapshot plus the chat log, for readers
    pub async fn snapshot(&self) -> (ConversationState, Vec<ChatEntry>) {
        let mut data = self.data.lock().await;
        data.last_active = Instant::now();
        (data.conversation.snapshot(), data.chat_log.clone())
    }
}

/// The answer returned to a caller after one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnAnswer {
    pub response: String,
    pub source: Source,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turns: usize,
}

/// Registry of live sessions
pub struct SessionManager {
    orchestrator: FallbackOrchestrator,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    /// Sessions idle for longer than this are pruned; `None` keeps them forever
    idle_ttl: Option<Duration>,
}

impl SessionManager {
    pub fn new(orchestrator: FallbackOrchestrator) -> Self {
        Self {
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
            idle_ttl: None,
        }
    }

    #[must_use]
    pub fn with_idle_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.idle_ttl = ttl;
        self
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(uuid::Uuid::new_v4().to_string()));
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        tracing::info!(session_id = %session.id, "Session created");
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Existing session for `id`, or a new one (keeping a caller-supplied id)
    pub async fn get_or_create(&self, id: Option<&str>) -> Arc<Session> {
        let Some(id) = id.filter(|id| !id.trim().is_empty()) else {
            return self.create().await;
        };
        if let Some(session) = self.get(id).await {
            return session;
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "Session created on first use");
                Arc::new(Session::new(id.to_string()))
            })
            .clone()
    }

    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| tracing::info!(session_id = %id, "Session ended"))
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let turns = session
                .data
                .lock()
                .await
                .chat_log
                .iter()
                .filter(|entry| entry.role == ChatRole::User)
                .count();
            summaries.push(SessionSummary {
                id: session.id.clone(),
                created_at: session.created_at,
                turns,
            });
        }
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Run one turn on `session`, serialized with any other turn on it
    pub async fn ask(&self, session: Arc<Session>, question: String) -> Result<TurnAnswer, SessionError> {
        let orchestrator = self.orchestrator.clone();

        let handle = tokio::spawn(async move {
            let mut data = session.data.lock().await;
            let data = &mut *data;
            orchestrator
                .start_turn(&mut data.conversation, &question)
                .await;

            data.last_active = Instant::now();
            let answer = TurnAnswer {
                response: data.conversation.generation.clone(),
                source: data.conversation.source,
            };
            data.chat_log.push(ChatEntry {
                role: ChatRole::User,
                content: question,
            });
            data.chat_log.push(ChatEntry {
                role: ChatRole::Assistant,
                content: answer.response.clone(),
            });
            answer
        });

        handle
            .await
            .map_err(|e| SessionError::TurnAborted(e.to_string()))
    }

    /// Clear the session's transcript, per-turn fields, and chat log
    pub async fn reset(&self, session: &Session) {
        let mut data = session.data.lock().await;
        self.orchestrator.reset_conversation(&mut data.conversation);
        data.chat_log.clear();
        data.last_active = Instant::now();
        tracing::info!(session_id = %session.id, "Session reset");
    }

    /// Drop sessions idle for longer than the TTL. A session whose lock is
    /// held has a turn in flight and is kept. Returns how many were dropped.
    pub async fn prune_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let Ok(data) = session.data.try_lock() else {
                return true;
            };
            let live = data.last_active.elapsed() < ttl;
            if !live {
                tracing::info!(session_id = %id, "Session expired");
            }
            live
        });
        before - sessions.len()
    }

    /// Start the background idle sweep, if a TTL is configured
    pub fn spawn_idle_sweep(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let ttl = self.idle_ttl?;
        let period = ttl.min(MAX_SWEEP_INTERVAL);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = self.prune_idle().await;
                if removed > 0 {
                    let remaining = self.sessions.read().await.len();
                    tracing::info!(removed, remaining, "Idle sessions pruned");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::{MockModel, MockSource, Reply};
    use std::time::Duration;

    fn manager(parametric: MockModel) -> SessionManager {
        SessionManager::new(FallbackOrchestrator::new(
            Arc::new(parametric),
            Arc::new(MockSource::new("documents", Reply::Empty)),
            Arc::new(MockSource::new("wikipedia", Reply::Empty)),
            Arc::new(MockSource::new("duckduckgo", Reply::Empty)),
            Arc::new(MockModel::answering("unused")),
        ))
    }

    #[tokio::test]
    async fn test_ask_records_chat_log_and_transcript() {
        let manager = manager(MockModel::answering("Try rest and hydration."));
        let session = manager.create().await;

        let answer = manager
            .ask(session.clone(), "What helps a headache?".to_string())
            .await
            .unwrap();
        assert_eq!(answer.response, "Try rest and hydration.");
        assert_eq!(answer.source, Source::Parametric);

        let (conversation, chat_log) = session.snapshot().await;
        assert_eq!(conversation.transcript.len(), 2);
        assert_eq!(
            chat_log,
            vec![
                ChatEntry {
                    role: ChatRole::User,
                    content: "What helps a headache?".to_string()
                },
                ChatEntry {
                    role: ChatRole::Assistant,
                    content: "Try rest and hydration.".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let manager = manager(MockModel::answering("ok"));
        let a = manager.create().await;
        let b = manager.create().await;
        assert_ne!(a.id, b.id);

        manager.ask(a.clone(), "first".to_string()).await.unwrap();
        manager.ask(a.clone(), "second".to_string()).await.unwrap();
        manager.ask(b.clone(), "other".to_string()).await.unwrap();

        assert_eq!(a.snapshot().await.0.transcript.len(), 4);
        assert_eq!(b.snapshot().await.0.transcript.len(), 2);
        assert_eq!(b.snapshot().await.0.transcript[0], "User: other");
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_session_serialize() {
        let manager = Arc::new(manager(MockModel::answering("ok")));
        let session = manager.create().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let manager = manager.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                manager.ask(session, format!("question {i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let (conversation, chat_log) = session.snapshot().await;
        assert_eq!(conversation.transcript.len(), 16);
        assert_eq!(chat_log.len(), 16);
        // Each turn's user and doctor lines stay adjacent
        for pair in conversation.transcript.chunks(2) {
            assert!(pair[0].starts_with("User: "));
            assert_eq!(pair[1], "Doctor: ok");
        }
    }

    #[tokio::test]
    async fn test_get_or_create() {
        let manager = manager(MockModel::answering("ok"));

        let fresh = manager.get_or_create(None).await;
        assert!(manager.get(&fresh.id).await.is_some());

        let named = manager.get_or_create(Some("abc")).await;
        assert_eq!(named.id, "abc");
        let again = manager.get_or_create(Some("abc")).await;
        assert!(Arc::ptr_eq(&named, &again));

        let blank = manager.get_or_create(Some("  ")).await;
        assert_ne!(blank.id.trim(), "");
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let manager = manager(MockModel::answering("ok")).with_idle_ttl(Some(Duration::from_millis(40)));
        let idle = manager.create().await;
        let active = manager.create().await;
        let busy = manager.create().await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        manager.ask(active.clone(), "still here".to_string()).await.unwrap();
        let guard = busy.data.lock().await;

        assert_eq!(manager.prune_idle().await, 1);
        assert!(manager.get(&idle.id).await.is_none());
        assert!(manager.get(&active.id).await.is_some());
        assert!(manager.get(&busy.id).await.is_some());

        drop(guard);
        assert_eq!(manager.prune_idle().await, 1);
        assert!(manager.get(&busy.id).await.is_none());
    }

    #[tokio::test]
    async fn test_without_ttl_sessions_are_kept() {
        let manager = manager(MockModel::answering("ok"));
        let session = manager.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(manager.prune_idle().await, 0);
        assert!(manager.get(&session.id).await.is_some());
        assert!(Arc::new(manager).spawn_idle_sweep().is_none());
    }

    #[tokio::test]
    async fn test_idle_sweep_runs_in_background() {
        let manager = Arc::new(manager(MockModel::answering("ok")).with_idle_ttl(Some(Duration::from_millis(20))));
        let session = manager.create().await;

        let sweep = manager.clone().spawn_idle_sweep().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        sweep.abort();

        assert!(manager.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_reset_and_remove() {
        let manager = manager(MockModel::answering("ok"));
        let session = manager.create().await;
        manager.ask(session.clone(), "q".to_string()).await.unwrap();

        manager.reset(&session).await;
        manager.reset(&session).await;
        let (conversation, chat_log) = session.snapshot().await;
        assert!(conversation.transcript.is_empty());
        assert!(chat_log.is_empty());

        assert!(manager.remove(&session.id).await.is_ok());
        assert!(matches!(
            manager.remove(&session.id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(manager.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_list_counts_turns() {
        let manager = manager(MockModel::answering("ok"));
        let first = manager.create().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = manager.create().await;
        manager.ask(second.clone(), "q".to_string()).await.unwrap();

        let listed = manager.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[0].turns, 0);
        assert_eq!(listed[1].turns, 1);
    }
}
