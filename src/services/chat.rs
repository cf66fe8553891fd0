//! Chat application handlers for the `/app/...` destinations.
//!
//! DESIGN
//! ======
//! Handlers are pure: they decode the SEND body, validate it, and return the
//! message to broadcast on `/topic/public`. The websocket dispatch layer owns
//! publishing and the per-connection username.

use frames::{ChatMessage, MessageKind, Timestamp};

/// Longest accepted username, in characters.
pub const MAX_USER_LEN: usize = 50;
/// Longest accepted message content, in characters.
pub const MAX_CONTENT_LEN: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid chat payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("username is required")]
    MissingUser,
    #[error("username exceeds {MAX_USER_LEN} characters")]
    UserTooLong,
    #[error("message exceeds {MAX_CONTENT_LEN} characters")]
    ContentTooLong,
}

/// Handle `/app/chat.addUser`.
///
/// Returns the trimmed username to remember on the connection and the
/// system notice to broadcast. The notice is not numbered.
///
/// # Errors
///
/// Fails on undecodable bodies and blank or oversized usernames.
pub fn add_user(body: &str) -> Result<(String, ChatMessage), ChatError> {
    let request = ChatMessage::from_json(body)?;
    let user = validate_user(&request.sender)?;

    let mut notice = ChatMessage::system(format!("{user} se unió al chat!"));
    notice.timestamp = Some(Timestamp::now_utc());
    Ok((user.to_owned(), notice))
}

/// Handle `/app/chat.sendMessage`: number and timestamp the message.
///
/// # Errors
///
/// Fails on undecodable bodies, blank or oversized usernames, and oversized
/// content.
pub fn send_message(body: &str, id: u64) -> Result<ChatMessage, ChatError> {
    let request = ChatMessage::from_json(body)?;
    let user = validate_user(&request.sender)?;
    if request.content.chars().count() > MAX_CONTENT_LEN {
        return Err(ChatError::ContentTooLong);
    }

    Ok(ChatMessage {
        id: Some(id),
        sender: user.to_owned(),
        content: request.content,
        kind: MessageKind::Chat,
        timestamp: Some(Timestamp::now_utc()),
    })
}

fn validate_user(raw: &str) -> Result<&str, ChatError> {
    let user = raw.trim();
    if user.is_empty() {
        return Err(ChatError::MissingUser);
    }
    if user.chars().count() > MAX_USER_LEN {
        return Err(ChatError::UserTooLong);
    }
    Ok(user)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
