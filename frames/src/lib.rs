//! Shared STOMP frame model and text codec for the chat WebSocket transport.
//!
//! This crate owns the wire representation used by the server, the browser
//! client and the CLI. Frames follow STOMP 1.2 text framing: a command line,
//! `name:value` header lines, a blank line, the body, and a terminating NUL.
//!
//! Chat payloads carried in frame bodies live in [`message`]; the client-side
//! connection state machine lives in [`session`].

pub mod message;
pub mod session;

use std::fmt;
use std::str::FromStr;

pub use message::{ChatMessage, MessageKind, MessageStyle, Timestamp};
pub use session::{Attempt, ChatSession, ConnectionState, Inbound, SendError, SessionConfig, SessionError};

/// WebSocket endpoint path the chat handshake runs on.
pub const WS_ENDPOINT: &str = "/ws";
/// HTTP endpoint serving recent chat messages as a JSON array.
pub const HISTORY_ENDPOINT: &str = "/api/history";
/// Broadcast topic every participant subscribes to.
pub const TOPIC_PUBLIC: &str = "/topic/public";
/// Application destination announcing a user joining.
pub const APP_ADD_USER: &str = "/app/chat.addUser";
/// Application destination carrying chat text.
pub const APP_SEND_MESSAGE: &str = "/app/chat.sendMessage";

/// Well-known header names.
pub mod header {
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const DESTINATION: &str = "destination";
    pub const HEART_BEAT: &str = "heart-beat";
    pub const HOST: &str = "host";
    pub const ID: &str = "id";
    pub const MESSAGE: &str = "message";
    pub const MESSAGE_ID: &str = "message-id";
    pub const RECEIPT: &str = "receipt";
    pub const RECEIPT_ID: &str = "receipt-id";
    pub const SERVER: &str = "server";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const VERSION: &str = "version";
}

/// Error returned by [`decode_frames`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The command line is not a STOMP command this codec understands.
    #[error("unknown frame command: {0}")]
    UnknownCommand(String),
    /// A header line has no `:` separator.
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    /// A header contains a backslash escape STOMP 1.2 does not define.
    #[error("invalid header escape in: {0}")]
    InvalidEscape(String),
    /// The `content-length` header is not a non-negative integer.
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),
    /// The declared `content-length` runs past the end of the input or splits a character.
    #[error("content-length {0} does not fit the frame body")]
    ContentLength(usize),
    /// The input ends before the header block or the NUL terminator.
    #[error("frame is not terminated")]
    Unterminated,
}

/// STOMP frame command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake (STOMP 1.0/1.1 spelling).
    Connect,
    /// Client handshake (STOMP 1.2 spelling).
    Stomp,
    /// Server handshake reply.
    Connected,
    /// Client publish to a destination.
    Send,
    /// Client subscription to a destination.
    Subscribe,
    /// Client subscription removal.
    Unsubscribe,
    /// Client graceful shutdown.
    Disconnect,
    /// Server delivery to a subscription.
    Message,
    /// Server acknowledgement of a `receipt` header.
    Receipt,
    /// Server-side protocol or application failure.
    Error,
}

impl Command {
    /// Wire spelling of the command.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED frames carry raw header values for 1.0 compatibility.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "STOMP" => Ok(Self::Stomp),
            "CONNECTED" => Ok(Self::Connected),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(CodecError::UnknownCommand(other.to_owned())),
        }
    }
}

/// A single STOMP frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Headers in wire order. Repeated names are kept; the first one wins on lookup.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// SEND frame carrying a JSON body to `destination`.
    #[must_use]
    pub fn send_json(destination: &str, body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header(header::DESTINATION, destination)
            .with_header(header::CONTENT_TYPE, "application/json")
            .with_body(body)
    }

    /// First value of the named header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.header(header::DESTINATION)
    }

    fn content_length(&self) -> Result<Option<usize>, CodecError> {
        self.header(header::CONTENT_LENGTH)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| CodecError::InvalidContentLength(raw.to_owned()))
            })
            .transpose()
    }
}

/// Encode a frame into its STOMP text form.
///
/// A `content-length` header is added for non-empty bodies unless the frame
/// already carries one.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    let escape = frame.command.escapes_headers();
    let mut out = String::with_capacity(frame.body.len() + 64);
    out.push_str(frame.command.as_str());
    out.push('\n');
    for (name, value) in &frame.headers {
        push_header_part(&mut out, name, escape);
        out.push(':');
        push_header_part(&mut out, value, escape);
        out.push('\n');
    }
    if !frame.body.is_empty() && frame.header(header::CONTENT_LENGTH).is_none() {
        out.push_str(header::CONTENT_LENGTH);
        out.push(':');
        out.push_str(&frame.body.len().to_string());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&frame.body);
    out.push('\0');
    out
}

/// Decode every frame contained in one text payload.
///
/// Bare EOLs between frames are heart-beats and are skipped, so a payload
/// consisting only of newlines decodes to an empty list.
///
/// # Errors
///
/// Returns a [`CodecError`] describing the first malformed frame.
pub fn decode_frames(input: &str) -> Result<Vec<Frame>, CodecError> {
    let mut frames = Vec::new();
    let mut rest = input;
    loop {
        rest = rest.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(frames);
        }
        let (frame, tail) = decode_one(rest)?;
        frames.push(frame);
        rest = tail;
    }
}

fn decode_one(input: &str) -> Result<(Frame, &str), CodecError> {
    let (command_line, mut rest) = split_line(input).ok_or(CodecError::Unterminated)?;
    let command = command_line.parse::<Command>()?;
    let escape = command.escapes_headers();

    let mut frame = Frame::new(command);
    loop {
        let (line, tail) = split_line(rest).ok_or(CodecError::Unterminated)?;
        rest = tail;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::MalformedHeader(line.to_owned()))?;
        if escape {
            frame.headers.push((unescape(name)?, unescape(value)?));
        } else {
            frame.headers.push((name.to_owned(), value.to_owned()));
        }
    }

    let (body, tail) = match frame.content_length()? {
        Some(len) => {
            let body = rest.get(..len).ok_or(CodecError::ContentLength(len))?;
            let tail = rest
                .get(len..)
                .and_then(|t| t.strip_prefix('\0'))
                .ok_or(CodecError::Unterminated)?;
            (body, tail)
        }
        None => rest.split_once('\0').ok_or(CodecError::Unterminated)?,
    };
    frame.body = body.to_owned();
    Ok((frame, tail))
}

fn split_line(input: &str) -> Option<(&str, &str)> {
    let (line, rest) = input.split_once('\n')?;
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn push_header_part(out: &mut String, raw: &str, escape: bool) {
    if !escape {
        out.push_str(raw);
        return;
    }
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, CodecError> {
    if !raw.contains('\\') {
        return Ok(raw.to_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(CodecError::InvalidEscape(raw.to_owned())),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
