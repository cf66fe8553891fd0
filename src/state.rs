//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the connected STOMP clients, each with its outbound channel, its
//! subscriptions, and the username it announced, plus a bounded buffer of the
//! most recent chat messages. Nothing is persisted: the state lives exactly as
//! long as the process.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use frames::{ChatMessage, Frame};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

// =============================================================================
// CONNECTED CLIENT
// =============================================================================

/// Per-connection broker entry, created when the client's CONNECT succeeds.
pub struct ConnectedClient {
    /// Sender for outgoing frames, drained by the connection's socket loop.
    pub tx: mpsc::Sender<Frame>,
    /// Subscription id -> destination.
    pub subscriptions: HashMap<String, String>,
    /// Username announced through `/app/chat.addUser`.
    pub user: Option<String>,
}

impl ConnectedClient {
    #[must_use]
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx, subscriptions: HashMap::new(), user: None }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<RwLock<HashMap<Uuid, ConnectedClient>>>,
    /// Recent chat messages, oldest first, at most `history_limit` long.
    pub history: Arc<RwLock<VecDeque<ChatMessage>>>,
    history_limit: usize,
    message_seq: Arc<AtomicU64>,
    chat_seq: Arc<AtomicU64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_history_limit(crate::config::DEFAULT_HISTORY_LIMIT)
    }
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            clients: Arc::default(),
            history: Arc::new(RwLock::new(VecDeque::with_capacity(history_limit))),
            history_limit,
            message_seq: Arc::default(),
            chat_seq: Arc::default(),
        }
    }

    /// Capacity of the chat history buffer.
    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Next value for the STOMP `message-id` header. Unique per process.
    pub fn next_message_id(&self) -> u64 {
        self.message_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Next chat message id. Starts at 1 and only grows.
    pub fn next_chat_id(&self) -> u64 {
        self.chat_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
