//! Pure message render model.
//!
//! `render_message` turns a `ChatMessage` into the classes and escaped markup
//! of one history entry. Components only insert the result, so everything
//! user-controlled passes through `escape_html` exactly once.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use frames::message::format_timestamp;
use frames::{ChatMessage, MessageStyle};

/// Header line of a user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Escaped sender name.
    pub username: String,
    /// Local `HH:MM`, or the "now" placeholder.
    pub time: String,
}

/// Render model of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    pub style: MessageStyle,
    /// Absent for system messages.
    pub header: Option<MessageHeader>,
    /// Escaped message text.
    pub content: String,
}

impl MessageView {
    /// Classes of the message element.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self.style {
            MessageStyle::System => "message system-message",
            MessageStyle::Own => "message own-message",
            MessageStyle::Other => "message other-message",
        }
    }

    /// Inner markup of the message element.
    #[must_use]
    pub fn to_html(&self) -> String {
        let content = format!(r#"<div class="message-content">{}</div>"#, self.content);
        match &self.header {
            None => content,
            Some(header) => format!(
                r#"<div class="message-header"><span class="username">{}</span><span class="timestamp">{}</span></div>{content}"#,
                header.username, header.time
            ),
        }
    }
}

/// Build the render model for `message` as seen by `current_user`.
#[must_use]
pub fn render_message(message: &ChatMessage, current_user: &str) -> MessageView {
    let style = MessageStyle::of(message, current_user);
    let header = (style != MessageStyle::System).then(|| MessageHeader {
        username: escape_html(&message.sender),
        time: escape_html(&format_timestamp(message.timestamp.as_ref())),
    });
    MessageView { style, header, content: escape_html(&message.content) }
}

/// Escape text for insertion into HTML element content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
