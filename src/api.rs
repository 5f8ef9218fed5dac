//! HTTP API for the consultation service

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::index::DocumentIndex;
use crate::session::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub index: DocumentIndex,
}

impl AppState {
    pub fn new(sessions: SessionManager, index: DocumentIndex) -> Self {
        Self {
            sessions: Arc::new(sessions),
            index,
        }
    }
}
