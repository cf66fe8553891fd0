//! Chat payloads carried in STOMP frame bodies.
//!
//! Field names on the wire are Spanish (`usuario`, `contenido`, `tipo`) because
//! that is what the chat server speaks; the Rust side uses English names.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Sender name the server uses for its own announcements.
pub const SYSTEM_SENDER: &str = "Sistema";
/// Shown instead of a time when a message carries no timestamp.
pub const NOW_PLACEHOLDER: &str = "Ahora";
/// Shown when a timestamp is present but cannot be interpreted.
pub const INVALID_TIME: &str = "--:--";

/// Message category; drives rendering and server-side side effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// A user announcing itself on the public channel.
    Join,
    /// Ordinary chat text. Payloads without `tipo` decode as this.
    #[default]
    Chat,
    /// Server announcement.
    System,
}

/// Point in time attached to a message by the server.
///
/// The server may send a date-component array
/// (`[year, month, day, hour, minute, second, nanos]`, month 1-based), an
/// ISO-8601 string, or epoch milliseconds. Any other JSON value is kept as
/// [`Timestamp::Other`] so the message itself still decodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Components(Vec<i64>),
    Millis(i64),
    Text(String),
    Other(serde_json::Value),
}

impl Timestamp {
    /// Current instant as an RFC 3339 UTC string.
    #[must_use]
    pub fn now_utc() -> Self {
        Self::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Local wall-clock time this timestamp denotes, if it can be interpreted.
    ///
    /// Component arrays and zone-less ISO strings are already local wall-clock
    /// values; zoned strings and epoch millis are converted to the local zone.
    #[must_use]
    pub fn to_local(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Components(parts) => components_to_local(parts),
            Self::Millis(ms) => {
                DateTime::from_timestamp_millis(*ms).map(|dt| dt.with_timezone(&Local).naive_local())
            }
            Self::Text(text) => text_to_local(text.trim()),
            Self::Other(_) => None,
        }
    }
}

fn components_to_local(parts: &[i64]) -> Option<NaiveDateTime> {
    // Only the first five components matter; seconds and nanos are dropped.
    let [year, month, day, hour, minute, ..] = parts else {
        return None;
    };
    // Out-of-range fields carry into the next larger unit: month 13 is
    // January of the following year, minute 60 is the next hour.
    let month0 = month.checked_sub(1)?;
    let year = i32::try_from(year.checked_add(month0.div_euclid(12))?).ok()?;
    let month = u32::try_from(month0.rem_euclid(12) + 1).ok()?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let offset = TimeDelta::try_days(day.checked_sub(1)?)?
        .checked_add(&TimeDelta::try_hours(*hour)?)?
        .checked_add(&TimeDelta::try_minutes(*minute)?)?;
    start.checked_add_signed(offset)
}

fn text_to_local(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive);
        }
    }
    // Bare dates mean UTC midnight.
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().with_timezone(&Local).naive_local())
}

/// Render a message timestamp as local `HH:MM`.
#[must_use]
pub fn format_timestamp(timestamp: Option<&Timestamp>) -> String {
    let Some(timestamp) = timestamp else {
        return NOW_PLACEHOLDER.to_owned();
    };
    timestamp
        .to_local()
        .map_or_else(|| INVALID_TIME.to_owned(), |t| t.format("%H:%M").to_string())
}

/// A chat event as exchanged on `/app/...` and `/topic/public`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned sequence number for stored chat messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "usuario")]
    pub sender: String,
    #[serde(rename = "contenido")]
    pub content: String,
    #[serde(rename = "tipo", default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl ChatMessage {
    /// JOIN announcement for `user`; content is always empty.
    #[must_use]
    pub fn join(user: &str) -> Self {
        Self { id: None, sender: user.to_owned(), content: String::new(), kind: MessageKind::Join, timestamp: None }
    }

    #[must_use]
    pub fn chat(user: &str, content: &str) -> Self {
        Self {
            id: None,
            sender: user.to_owned(),
            content: content.to_owned(),
            kind: MessageKind::Chat,
            timestamp: None,
        }
    }

    /// Server announcement sent as [`SYSTEM_SENDER`].
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: None,
            sender: SYSTEM_SENDER.to_owned(),
            content: content.into(),
            kind: MessageKind::System,
            timestamp: None,
        }
    }

    /// Decode a JSON frame body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for bodies that are not a chat message.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Encode as a JSON frame body.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Plain strings, integers and enums always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Visual variant a message is rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageStyle {
    /// Server announcement: content only, no header.
    System,
    /// Sent by the local user.
    Own,
    /// Sent by anyone else.
    Other,
}

impl MessageStyle {
    /// Classify `message` from the point of view of `current_user`.
    #[must_use]
    pub fn of(message: &ChatMessage, current_user: &str) -> Self {
        if message.sender == SYSTEM_SENDER {
            Self::System
        } else if message.sender == current_user {
            Self::Own
        } else {
            Self::Other
        }
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
