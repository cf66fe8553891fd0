//! Chat history loaded over HTTP when the chat page opens.
//!
//! Client-side (hydrate): a `gloo-net` GET of the history endpoint.
//! Server-side (SSR): returns nothing; the page fills in after hydration.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use frames::{ChatMessage, HISTORY_ENDPOINT};

/// URL of the history endpoint, optionally limited to the newest `limit` messages.
#[must_use]
pub fn history_url(limit: Option<usize>) -> String {
    match limit {
        Some(limit) => format!("{HISTORY_ENDPOINT}?limite={limit}"),
        None => HISTORY_ENDPOINT.to_owned(),
    }
}

/// Fetch recent chat messages, oldest first. Failures yield an empty history.
pub async fn fetch_history(limit: Option<usize>) -> Vec<ChatMessage> {
    #[cfg(feature = "hydrate")]
    {
        let url = history_url(limit);
        let Ok(resp) = gloo_net::http::Request::get(&url).send().await else {
            return Vec::new();
        };
        if !resp.ok() {
            leptos::logging::warn!("history request failed: {}", resp.status());
            return Vec::new();
        }
        resp.json::<Vec<ChatMessage>>().await.unwrap_or_default()
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = limit;
        Vec::new()
    }
}
