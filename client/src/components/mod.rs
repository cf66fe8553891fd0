//! Reusable UI components.

pub mod chat_panel;
pub mod status_bar;
