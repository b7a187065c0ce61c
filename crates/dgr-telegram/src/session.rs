//! Session management for Telegram conversations
//!
//! One [`ConversationSession`] per conversation identity, held behind its
//! own async mutex. The handler keeps that mutex locked for the whole of an
//! inbound event, so events for the same identity are applied in order
//! while distinct identities proceed independently.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Conversation identity: the chat plus the user speaking in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat_id: i64,
    pub user_id: u64,
}

impl ConversationKey {
    pub fn new(chat_id: i64, user_id: u64) -> Self {
        Self { chat_id, user_id }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.chat_id)
    }
}

/// Per-conversation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSession {
    /// Set by the UN-CHECK action, cleared by the next text message
    pub awaiting_un_number: bool,
}

impl ConversationSession {
    /// Expect a UN number as the next text message
    pub fn begin_un_check(&mut self) {
        self.awaiting_un_number = true;
    }

    /// Clear the pending-input flag, returning its previous value
    pub fn take_awaiting(&mut self) -> bool {
        std::mem::take(&mut self.awaiting_un_number)
    }
}

/// Shared handle to one conversation's state
pub type SessionSlot = Arc<Mutex<ConversationSession>>;

/// In-memory session store for Telegram conversations
///
/// Sessions are created on first contact and live for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<ConversationKey, SessionSlot>>,
}

impl InMemorySessionStore {
    /// Create a new session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the slot for `key`
    pub fn slot(&self, key: ConversationKey) -> SessionSlot {
        Arc::clone(self.sessions.entry(key).or_default().value())
    }

    /// Snapshot of a session if it exists
    pub async fn get(&self, key: ConversationKey) -> Option<ConversationSession> {
        let slot = self.sessions.get(&key).map(|entry| Arc::clone(entry.value()))?;
        let session = slot.lock().await;
        Some(session.clone())
    }

    /// Whether `key` is waiting for a UN number (false for unknown keys)
    pub async fn is_awaiting(&self, key: ConversationKey) -> bool {
        self.get(key)
            .await
            .is_some_and(|session| session.awaiting_un_number)
    }

    /// Get session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
