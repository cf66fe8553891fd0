//! Domain services behind the websocket endpoint.

pub mod broker;
pub mod chat;
pub mod history;
