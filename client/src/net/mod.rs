//! Networking for the STOMP-over-WebSocket chat transport.
//!
//! SYSTEM CONTEXT
//! ==============
//! `chat_client` owns the session handle shared through context and, in the
//! browser, the websocket lifecycle loop. `history` loads the messages sent
//! before the page opened. Wire types live in the `frames` crate.

pub mod chat_client;
pub mod history;
