//! Chat history and connection status for the chat page.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::collections::HashSet;

use frames::{ChatMessage, ConnectionState};

/// Placeholder shown in the message input while sending is possible.
pub const PLACEHOLDER_READY: &str = "Escribe tu mensaje...";
/// Placeholder shown while the input is disabled.
pub const PLACEHOLDER_RECONNECTING: &str = "Reconectando...";

/// State for the chat page.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    /// Messages in arrival order. Never reordered or deduplicated.
    pub messages: Vec<ChatMessage>,
    /// Mirror of the session's connection state.
    pub connection: ConnectionState,
}

impl ChatState {
    /// The message form accepts input only on a live connection.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    #[must_use]
    pub fn input_placeholder(&self) -> &'static str {
        if self.input_enabled() { PLACEHOLDER_READY } else { PLACEHOLDER_RECONNECTING }
    }

    /// Put previously stored messages ahead of the live ones.
    ///
    /// Live messages that arrived before the history response and are also
    /// part of it (same server id) are kept only once, at their history
    /// position.
    pub fn seed_history(&mut self, history: Vec<ChatMessage>) {
        let live = std::mem::replace(&mut self.messages, history);
        let seen: HashSet<u64> = self.messages.iter().filter_map(|m| m.id).collect();
        self.messages
            .extend(live.into_iter().filter(|m| m.id.is_none_or(|id| !seen.contains(&id))));
    }
}

/// CSS classes for the connection status indicator.
#[must_use]
pub fn status_class(connection: ConnectionState) -> &'static str {
    match connection {
        ConnectionState::Connected => "connection-status status-connected",
        ConnectionState::Connecting => "connection-status status-connecting",
        ConnectionState::Disconnected => "connection-status status-disconnected",
    }
}

/// Text shown inside the status indicator.
#[must_use]
pub fn status_label(connection: ConnectionState) -> &'static str {
    match connection {
        ConnectionState::Connected => "Conectado",
        ConnectionState::Connecting => "Conectando...",
        ConnectionState::Disconnected => "Desconectado",
    }
}
