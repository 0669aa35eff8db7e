use crate::providers::traits::ChatMessage;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Idle sessions older than this are dropped.
pub const SESSION_IDLE_MINUTES: i64 = 30;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Expands turns into alternating user/assistant messages, oldest first.
pub fn build_chat_history(turns: &[Turn]) -> Vec<ChatMessage> {
    let mut chat_history = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        chat_history.push(ChatMessage::user(turn.question.clone()));
        chat_history.push(ChatMessage::assistant(turn.answer.clone()));
    }
    chat_history
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub turns: Vec<Turn>,
}

impl ConversationSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            start_time: now,
            last_active: now,
            turns: Vec::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_active) >= Duration::minutes(SESSION_IDLE_MINUTES)
    }

    pub fn record(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.last_active = Utc::now();
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session chat histories for the HTTP surface.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ConversationSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session's id and history. Unknown or expired ids get a
    /// fresh, empty session.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Vec<Turn>) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| !session.is_expired(now));

        if let Some(session) = id.and_then(|id| sessions.get_mut(&id)) {
            session.last_active = now;
            return (session.id, session.turns.clone());
        }

        let session = ConversationSession::new();
        let id = session.id;
        log::debug!("Started chat session {}", id);
        sessions.insert(id, session);
        (id, Vec::new())
    }

    pub async fn record(&self, id: Uuid, turn: Turn) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(id).or_insert_with(|| ConversationSession {
            id,
            ..ConversationSession::new()
        }).record(turn);
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, id: Uuid, minutes: i64) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.last_active = session.last_active - Duration::minutes(minutes);
        }
    }
}
