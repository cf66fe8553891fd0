//! Client-side chat session state machine.
//!
//! `ChatSession` performs no I/O. Transports (the browser loop, the CLI) feed
//! it decoded frames and transport failures and write out the frames it hands
//! back. Every connection attempt gets an [`Attempt`] token; events carrying a
//! superseded token are rejected, so a late failure from an old socket can
//! never schedule a second reconnect.
//!
//! ```text
//! Disconnected --begin_connect--> Connecting --CONNECTED--> Connected
//!      ^                              |                         |
//!      +-------------- fail ----------+-------------------------+
//! ```

use std::time::Duration;

use crate::message::ChatMessage;
use crate::{APP_ADD_USER, APP_SEND_MESSAGE, Command, Frame, TOPIC_PUBLIC, header};

/// Delay before a failed connection is retried.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Subscription id used for the public topic.
pub const PUBLIC_SUBSCRIPTION_ID: &str = "sub-0";

/// Connection lifecycle as seen by the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Transport open or opening; waiting for CONNECTED.
    Connecting,
    Connected,
}

/// Tunables for a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Fixed wait between a failure and the next attempt. Retries never stop.
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }
}

/// Token identifying one connection attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attempt(u64);

/// What a handled inbound frame means to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Handshake finished. The frames must be sent in order.
    Connected(Vec<Frame>),
    /// A broadcast on the public topic.
    Message(ChatMessage),
    /// Server confirmed a frame that carried a `receipt` header.
    Receipt(String),
    /// Nothing for this session (another subscription, stray receipt-less frame).
    Ignored,
}

/// Error returned by [`ChatSession::handle_frame`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The event belongs to an attempt that already failed or was torn down.
    #[error("event belongs to a superseded connection attempt")]
    StaleAttempt,
    /// The server sent an ERROR frame.
    #[error("server rejected the session: {0}")]
    Rejected(String),
    /// A frame arrived that makes no sense in the current state.
    #[error("unexpected {0} frame while {1:?}")]
    Unexpected(Command, ConnectionState),
    /// A MESSAGE body is not a chat message.
    #[error("malformed chat payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl SessionError {
    /// Whether the connection must be treated as failed.
    ///
    /// Payload errors only drop the offending message.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Unexpected(..))
    }
}

/// Error returned when composing or transmitting an outgoing chat message.
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
pub enum SendError {
    /// Input was empty after trimming; callers ignore this silently.
    #[error("message is empty")]
    Empty,
    #[error("not connected to the chat server")]
    NotConnected,
    /// The transport stopped accepting frames.
    #[error("outbound channel closed")]
    Closed,
}

/// Connection state machine for one chat user.
#[derive(Clone, Debug)]
pub struct ChatSession {
    user: String,
    config: SessionConfig,
    state: ConnectionState,
    current: Option<Attempt>,
    next_attempt: u64,
}

impl ChatSession {
    #[must_use]
    pub fn new(user: impl Into<String>, config: SessionConfig) -> Self {
        Self { user: user.into(), config, state: ConnectionState::Disconnected, current: None, next_attempt: 0 }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Start a connection attempt.
    ///
    /// Returns `None` while an attempt is in flight or a connection is live,
    /// so a timer-driven reconnect racing a manual one opens one socket only.
    pub fn begin_connect(&mut self) -> Option<Attempt> {
        if self.state != ConnectionState::Disconnected {
            return None;
        }
        let attempt = Attempt(self.next_attempt);
        self.next_attempt += 1;
        self.current = Some(attempt);
        self.state = ConnectionState::Connecting;
        Some(attempt)
    }

    /// CONNECT frame opening the STOMP session on a fresh transport.
    #[must_use]
    pub fn connect_frame(&self, host: &str) -> Frame {
        Frame::new(Command::Connect)
            .with_header(header::ACCEPT_VERSION, "1.1,1.2")
            .with_header(header::HOST, host)
            .with_header(header::HEART_BEAT, "0,0")
    }

    /// Apply one inbound frame received on `attempt`'s transport.
    ///
    /// # Errors
    ///
    /// See [`SessionError`]; use [`SessionError::is_fatal`] to decide whether
    /// to call [`ChatSession::fail`].
    pub fn handle_frame(&mut self, attempt: Attempt, frame: &Frame) -> Result<Inbound, SessionError> {
        if self.current != Some(attempt) {
            return Err(SessionError::StaleAttempt);
        }

        match (frame.command, self.state) {
            (Command::Connected, ConnectionState::Connecting) => {
                self.state = ConnectionState::Connected;
                Ok(Inbound::Connected(self.on_connected_frames()))
            }
            (Command::Message, ConnectionState::Connected) => {
                if !is_public_delivery(frame) {
                    return Ok(Inbound::Ignored);
                }
                Ok(Inbound::Message(ChatMessage::from_json(&frame.body)?))
            }
            (Command::Receipt, _) => Ok(frame
                .header(header::RECEIPT_ID)
                .map_or(Inbound::Ignored, |id| Inbound::Receipt(id.to_owned()))),
            (Command::Error, _) => {
                let reason = frame.header(header::MESSAGE).unwrap_or(&frame.body);
                Err(SessionError::Rejected(reason.to_owned()))
            }
            (command, state) => Err(SessionError::Unexpected(command, state)),
        }
    }

    /// Subscribe first, then announce the user, so our own JOIN is delivered to us.
    fn on_connected_frames(&self) -> Vec<Frame> {
        vec![
            Frame::new(Command::Subscribe)
                .with_header(header::ID, PUBLIC_SUBSCRIPTION_ID)
                .with_header(header::DESTINATION, TOPIC_PUBLIC),
            Frame::send_json(APP_ADD_USER, ChatMessage::join(&self.user).to_json()),
        ]
    }

    /// Record a transport or protocol failure on `attempt`.
    ///
    /// The state drops to `Disconnected` immediately. Returns the delay after
    /// which the caller should call [`ChatSession::begin_connect`] again, once
    /// per attempt; stale or repeated failures return `None`.
    pub fn fail(&mut self, attempt: Attempt) -> Option<Duration> {
        if self.current != Some(attempt) {
            return None;
        }
        self.current = None;
        self.state = ConnectionState::Disconnected;
        Some(self.config.reconnect_delay)
    }

    /// Build the SEND frame for user input.
    ///
    /// # Errors
    ///
    /// [`SendError::Empty`] for blank input, [`SendError::NotConnected`]
    /// unless the session is connected. Nothing is buffered.
    pub fn compose(&self, input: &str) -> Result<Frame, SendError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SendError::Empty);
        }
        if !self.is_connected() {
            return Err(SendError::NotConnected);
        }
        Ok(Frame::send_json(APP_SEND_MESSAGE, ChatMessage::chat(&self.user, text).to_json()))
    }

    /// Tear the session down.
    ///
    /// Any in-flight attempt is invalidated so its pending reconnect never
    /// fires. Returns the DISCONNECT frame to send if a connection was live.
    pub fn disconnect(&mut self) -> Option<Frame> {
        let was_connected = self.is_connected();
        self.current = None;
        self.state = ConnectionState::Disconnected;
        was_connected.then(|| Frame::new(Command::Disconnect))
    }
}

fn is_public_delivery(frame: &Frame) -> bool {
    match frame.header(header::SUBSCRIPTION) {
        Some(id) => id == PUBLIC_SUBSCRIPTION_ID,
        None => frame.destination() == Some(TOPIC_PUBLIC),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
