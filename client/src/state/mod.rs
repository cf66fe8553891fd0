//! Reactive application state shared through Leptos context.
//!
//! SYSTEM CONTEXT
//! ==============
//! `chat` holds the rendered history and connection status; `user` holds the
//! identity handed to the page by its host.

pub mod chat;
pub mod user;
