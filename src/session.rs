//! Per-session conversation state.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// Format of session ids, derived from the session's creation time.
pub const SESSION_ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Conversation state of one chat session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    session_id: String,
    user_name: String,
    created_at: DateTime<Utc>,
    turns: Vec<Turn>,
}

impl Session {
    /// Start a session now.
    pub fn new(user_name: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            session_id: now.format(SESSION_ID_FORMAT).to_string(),
            user_name: user_name.into(),
            created_at: now.with_timezone(&Utc),
            turns: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Turns in chronological order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every turn. The session id is kept.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
