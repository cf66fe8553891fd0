//! Bounded in-memory chat history.
//!
//! DESIGN
//! ======
//! Every numbered chat message is appended after it is published. Once the
//! buffer holds `history_limit` messages the oldest one is evicted. JOIN
//! notices are not recorded. The buffer starts empty on every process start.

use frames::ChatMessage;
use tracing::debug;

use crate::state::AppState;

/// Append `message`, evicting the oldest entries beyond the state's limit.
pub async fn record(state: &AppState, message: ChatMessage) {
    let limit = state.history_limit();
    if limit == 0 {
        return;
    }
    let mut history = state.history.write().await;
    while history.len() >= limit {
        history.pop_front();
    }
    history.push_back(message);
    debug!(len = history.len(), "history: message recorded");
}

/// The newest `limit` messages (all of them when `None`), oldest first.
pub async fn recent(state: &AppState, limit: Option<usize>) -> Vec<ChatMessage> {
    let history = state.history.read().await;
    let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));
    history.iter().skip(skip).cloned().collect()
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
