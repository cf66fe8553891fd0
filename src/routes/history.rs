//! Chat history endpoint.
//!
//! `GET /api/history` returns the buffered chat messages, oldest first, as a
//! JSON array of the same objects broadcast on `/topic/public`. The optional
//! `limite` query parameter keeps only the newest N.

use axum::extract::{Query, State};
use axum::response::Json;
use frames::ChatMessage;
use serde::Deserialize;

use crate::services::history;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limite: Option<usize>,
}

pub async fn list_history(State(state): State<AppState>, Query(query): Query<HistoryQuery>) -> Json<Vec<ChatMessage>> {
    Json(history::recent(&state, query.limite).await)
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
