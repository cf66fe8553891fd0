//! Terminal rendering of chat messages and connection status.

use frames::message::format_timestamp;
use frames::{ChatMessage, ConnectionState, MessageStyle};

/// Printed to stderr when a line is typed without a live connection.
pub const NOT_CONNECTED_ALERT: &str = "No hay conexión con el servidor. El mensaje no se envió.";

/// One output line for `message`, styled relative to `current_user`.
///
/// System notices carry no header. Own and other messages show the local
/// `HH:MM` time and the sender. Control characters in user text are replaced
/// so a peer cannot drive the terminal.
pub fn render_line(message: &ChatMessage, current_user: &str) -> String {
    let content = sanitize(&message.content);
    match MessageStyle::of(message, current_user) {
        MessageStyle::System => format!("*** {content} ***"),
        MessageStyle::Own => {
            let time = format_timestamp(message.timestamp.as_ref());
            format!("[{time}] {} (tú): {content}", sanitize(&message.sender))
        }
        MessageStyle::Other => {
            let time = format_timestamp(message.timestamp.as_ref());
            format!("[{time}] {}: {content}", sanitize(&message.sender))
        }
    }
}

pub fn status_line(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => "[Conectado]",
        ConnectionState::Connecting => "[Conectando...]",
        ConnectionState::Disconnected => "[Desconectado - reconectando...]",
    }
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { '\u{fffd}' } else { c })
        .collect()
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
