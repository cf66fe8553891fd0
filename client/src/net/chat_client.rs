//! STOMP chat client for the browser.
//!
//! `ChatClient` is a cheap, cloneable handle around a `frames::ChatSession`
//! that components reach through context to send messages and tear down.
//! Outgoing frames travel through an unbounded channel to the transport loop.
//!
//! The transport loop is gated behind `#[cfg(feature = "hydrate")]` since it
//! requires a browser environment. It connects, runs the STOMP handshake,
//! forwards frames both ways, and on failure waits the session's fixed
//! reconnect delay before trying again.

#[cfg(test)]
#[path = "chat_client_test.rs"]
mod chat_client_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use frames::{
    Attempt, ChatMessage, ChatSession, CodecError, ConnectionState, Frame, Inbound, SendError, SessionConfig,
    SessionError, WS_ENDPOINT, decode_frames, encode_frame,
};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Text of the blocking alert shown when sending without a connection.
pub const NOT_CONNECTED_ALERT: &str = "No hay conexión con el servidor. Intenta recargar la página.";

/// Error that ends one connection attempt.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("frame decode failed: {0}")]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("websocket error: {0}")]
    Transport(String),
    #[error("websocket closed")]
    Closed,
}

/// Effect of an inbound payload that the UI must reflect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake done; subscription and JOIN already queued.
    Connected,
    Message(ChatMessage),
}

/// Shared handle to the chat session of the current page.
#[derive(Clone, Debug)]
pub struct ChatClient {
    session: Arc<Mutex<ChatSession>>,
    outbound: UnboundedSender<String>,
}

impl ChatClient {
    /// Create a client for `user`.
    ///
    /// The receiver yields encoded frames for whichever transport drives the
    /// session.
    #[must_use]
    pub fn new(user: &str, config: SessionConfig) -> (Self, UnboundedReceiver<String>) {
        let (outbound, rx) = mpsc::unbounded();
        let session = Arc::new(Mutex::new(ChatSession::new(user, config)));
        (Self { session, outbound }, rx)
    }

    fn session(&self) -> MutexGuard<'_, ChatSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the session state.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        f(&mut self.session())
    }

    #[must_use]
    pub fn user(&self) -> String {
        self.session().user().to_owned()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.session().state()
    }

    /// Send user input as a chat message.
    ///
    /// # Errors
    ///
    /// [`SendError::Empty`] for blank input (callers ignore it),
    /// [`SendError::NotConnected`] without a live connection (callers alert),
    /// [`SendError::Closed`] once the transport loop is gone.
    pub fn send_message(&self, input: &str) -> Result<(), SendError> {
        let frame = self.session().compose(input)?;
        self.transmit(&frame)
    }

    /// Tear down: send DISCONNECT when connected and stop reconnecting.
    pub fn disconnect(&self) {
        let frame = self.session().disconnect();
        if let Some(frame) = frame {
            let _ = self.transmit(&frame);
        }
    }

    fn transmit(&self, frame: &Frame) -> Result<(), SendError> {
        self.outbound
            .unbounded_send(encode_frame(frame))
            .map_err(|_| SendError::Closed)
    }

    /// Apply one websocket text payload received on `attempt`'s transport.
    ///
    /// Handshake replies are queued on the outbound channel before
    /// `ClientEvent::Connected` is reported. Malformed chat payloads are
    /// logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the payload ends the connection: bad
    /// framing, an ERROR frame, a stale attempt, or a closed outbound channel.
    pub fn process_text(&self, attempt: Attempt, text: &str) -> Result<Vec<ClientEvent>, ClientError> {
        let mut events = Vec::new();
        for frame in decode_frames(text)? {
            let inbound = self.session().handle_frame(attempt, &frame);
            match inbound {
                Ok(Inbound::Connected(replies)) => {
                    for reply in &replies {
                        self.transmit(reply).map_err(|_| ClientError::Closed)?;
                    }
                    events.push(ClientEvent::Connected);
                }
                Ok(Inbound::Message(message)) => events.push(ClientEvent::Message(message)),
                Ok(Inbound::Receipt(_) | Inbound::Ignored) => {}
                Err(SessionError::Payload(e)) => {
                    leptos::logging::warn!("dropping malformed chat message: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(events)
    }
}

/// Drop frames queued for a transport that no longer exists.
///
/// Sends are never buffered across reconnects.
pub fn drain_stale(rx: &mut UnboundedReceiver<String>) -> usize {
    let mut dropped = 0;
    while let Ok(Some(_)) = rx.try_next() {
        dropped += 1;
    }
    dropped
}

/// Websocket URL of the chat endpoint for a page served from `protocol`//`host`.
#[must_use]
pub fn ws_url(protocol: &str, host: &str) -> String {
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    format!("{scheme}://{host}{WS_ENDPOINT}")
}

/// Spawn the chat transport lifecycle as a local async task.
#[cfg(feature = "hydrate")]
pub fn spawn_chat_client(
    client: ChatClient,
    rx: UnboundedReceiver<String>,
    chat: leptos::prelude::RwSignal<crate::state::chat::ChatState>,
) {
    leptos::task::spawn_local(chat_client_loop(client, rx, chat));
}

/// Main connection loop with fixed-delay reconnect.
#[cfg(feature = "hydrate")]
async fn chat_client_loop(
    client: ChatClient,
    mut rx: UnboundedReceiver<String>,
    chat: leptos::prelude::RwSignal<crate::state::chat::ChatState>,
) {
    use leptos::prelude::Update;

    loop {
        let Some(attempt) = client.with_session(ChatSession::begin_connect) else {
            // Another loop owns the connection.
            return;
        };
        chat.update(|c| c.connection = ConnectionState::Connecting);

        let dropped = drain_stale(&mut rx);
        if dropped > 0 {
            leptos::logging::warn!("dropped {dropped} frames queued for a closed connection");
        }

        leptos::logging::log!("connecting to chat server");
        if let Err(e) = connect_and_run(&client, attempt, &mut rx, chat).await {
            leptos::logging::warn!("chat connection error: {e}");
        }

        let retry = client.with_session(|s| s.fail(attempt));
        chat.update(|c| c.connection = ConnectionState::Disconnected);

        let Some(delay) = retry else {
            leptos::logging::log!("chat client stopped");
            return;
        };
        gloo_timers::future::sleep(delay).await;
        leptos::logging::log!("reconnecting to chat server");
    }
}

/// Connect to the websocket and process frames until the connection ends.
#[cfg(feature = "hydrate")]
async fn connect_and_run(
    client: &ChatClient,
    attempt: Attempt,
    rx: &mut UnboundedReceiver<String>,
    chat: leptos::prelude::RwSignal<crate::state::chat::ChatState>,
) -> Result<(), ClientError> {
    use futures::future::Either;
    use futures::{SinkExt, StreamExt};
    use gloo_net::websocket::Message;
    use gloo_net::websocket::futures::WebSocket;
    use leptos::prelude::Update;

    let location = web_sys::window().map(|w| w.location());
    let protocol = location
        .as_ref()
        .and_then(|l| l.protocol().ok())
        .unwrap_or_default();
    let host = location
        .and_then(|l| l.host().ok())
        .unwrap_or_else(|| "localhost:8080".to_owned());

    let ws = WebSocket::open(&ws_url(&protocol, &host)).map_err(|e| ClientError::Transport(e.to_string()))?;
    let (mut ws_write, mut ws_read) = ws.split();

    let connect = client.with_session(|s| s.connect_frame(&host));
    ws_write
        .send(Message::Text(encode_frame(&connect)))
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    // Forward outgoing frames from our channel to the socket.
    let send_task = async {
        while let Some(text) = rx.next().await {
            if ws_write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    };

    // Receive loop: decode frames and reflect them in chat state.
    let recv_task = async {
        while let Some(msg) = ws_read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    for event in client.process_text(attempt, &text)? {
                        match event {
                            ClientEvent::Connected => {
                                leptos::logging::log!("chat connected");
                                chat.update(|c| c.connection = ConnectionState::Connected);
                            }
                            ClientEvent::Message(message) => chat.update(|c| c.messages.push(message)),
                        }
                    }
                }
                Ok(Message::Bytes(_)) => {}
                Err(e) => return Err(ClientError::Transport(e.to_string())),
            }
        }
        Err(ClientError::Closed)
    };

    match futures::future::select(Box::pin(send_task), Box::pin(recv_task)).await {
        Either::Left(((), _)) => Err(ClientError::Closed),
        Either::Right((result, _)) => result,
    }
}
