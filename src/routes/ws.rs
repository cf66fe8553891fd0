//! WebSocket handler: STOMP 1.2 endpoint in front of the topic broker.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming text messages → decode STOMP frames → handle each in order
//! - MESSAGE frames queued by the broker → forward to client
//!
//! Frame handlers validate, mutate broker state, and return an `Outcome`.
//! Protocol violations become a single ERROR frame followed by closing the
//! socket, as STOMP requires.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → wait for CONNECT (or STOMP) → register with broker → CONNECTED
//! 2. SUBSCRIBE / UNSUBSCRIBE / SEND, each optionally acknowledged by RECEIPT
//! 3. DISCONNECT, socket close, or protocol error → unregister → close

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{APP_ADD_USER, APP_SEND_MESSAGE, CodecError, Command, Frame, header};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::{broker, chat, history};
use crate::state::AppState;

/// Protocol versions this endpoint speaks, most preferred first.
const SUPPORTED_VERSIONS: [&str; 3] = ["1.2", "1.1", "1.0"];
const SERVER_NAME: &str = concat!("kodichat/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";

// =============================================================================
// TYPES
// =============================================================================

/// What the socket loop does after a batch of inbound frames.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Send these frames to the client and keep reading.
    Continue(Vec<Frame>),
    /// Send these frames to the client, then close the socket.
    Close(Vec<Frame>),
}

#[derive(Debug, thiserror::Error)]
enum ProtocolError {
    #[error("malformed frame: {0}")]
    Codec(#[from] CodecError),
    #[error("expected CONNECT frame, got {0}")]
    NotConnected(Command),
    #[error("already connected")]
    AlreadyConnected,
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("{0} frames are sent by the server only")]
    ServerOnly(Command),
    #[error(transparent)]
    Broker(#[from] broker::BrokerError),
}

/// Per-connection protocol state.
struct Connection {
    client_id: Uuid,
    connected: bool,
}

impl Connection {
    fn new(client_id: Uuid) -> Self {
        Self { client_id, connected: false }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let mut conn = Connection::new(Uuid::new_v4());
    let client_id = conn.client_id;

    // Per-connection channel for MESSAGE frames fanned out by the broker.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    info!(%client_id, "ws: socket opened");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let text = match msg {
                    Message::Text(text) => text.as_str().to_owned(),
                    Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!(%client_id, "ws: non-utf8 binary message");
                            break;
                        }
                    },
                    Message::Close(_) => break,
                    _ => continue,
                };

                let outcome = process_inbound_text(&state, &mut conn, &client_tx, &text).await;
                let (frames, close) = match outcome {
                    Outcome::Continue(frames) => (frames, false),
                    Outcome::Close(frames) => (frames, true),
                };
                let mut sent = true;
                for frame in &frames {
                    if send_frame(&mut socket, client_id, frame).await.is_err() {
                        sent = false;
                        break;
                    }
                }
                if close || !sent {
                    break;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, client_id, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    let user = broker::unregister(&state, client_id).await;
    let _ = socket.send(Message::Close(None)).await;
    info!(%client_id, user = user.as_deref().unwrap_or("-"), "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one inbound text message and handle every frame it carries.
///
/// Frames are handled in wire order. The first protocol error stops
/// processing: the reply so far plus one ERROR frame are returned as
/// `Outcome::Close`.
async fn process_inbound_text(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Outcome {
    let decoded = match frames::decode_frames(text) {
        Ok(decoded) => decoded,
        Err(e) => {
            let e = ProtocolError::from(e);
            warn!(client_id = %conn.client_id, error = %e, "ws: undecodable inbound text");
            return Outcome::Close(vec![error_frame(&e, None)]);
        }
    };

    let mut replies = Vec::new();
    for frame in &decoded {
        let receipt = frame.header(header::RECEIPT);
        match handle_frame(state, conn, client_tx, frame).await {
            Ok(Outcome::Continue(out)) => {
                replies.extend(out);
                if let Some(receipt) = receipt {
                    replies.push(receipt_frame(receipt));
                }
            }
            Ok(Outcome::Close(out)) => {
                replies.extend(out);
                if let Some(receipt) = receipt {
                    replies.push(receipt_frame(receipt));
                }
                return Outcome::Close(replies);
            }
            Err(e) => {
                warn!(client_id = %conn.client_id, command = %frame.command, error = %e, "ws: protocol error");
                replies.push(error_frame(&e, receipt));
                return Outcome::Close(replies);
            }
        }
    }
    Outcome::Continue(replies)
}

async fn handle_frame(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<Frame>,
    frame: &Frame,
) -> Result<Outcome, ProtocolError> {
    match frame.command {
        Command::Connect | Command::Stomp => {
            if conn.connected {
                return Err(ProtocolError::AlreadyConnected);
            }
            handle_connect(state, conn, client_tx, frame).await
        }
        Command::Connected | Command::Message | Command::Receipt | Command::Error => {
            Err(ProtocolError::ServerOnly(frame.command))
        }
        command if !conn.connected => Err(ProtocolError::NotConnected(command)),
        Command::Subscribe => {
            let id = require_header(frame, header::ID)?;
            let destination = require_header(frame, header::DESTINATION)?;
            broker::subscribe(state, conn.client_id, id, destination).await?;
            Ok(Outcome::Continue(Vec::new()))
        }
        Command::Unsubscribe => {
            let id = require_header(frame, header::ID)?;
            broker::unsubscribe(state, conn.client_id, id).await?;
            Ok(Outcome::Continue(Vec::new()))
        }
        Command::Send => {
            let destination = require_header(frame, header::DESTINATION)?;
            handle_send(state, conn.client_id, destination, frame).await;
            Ok(Outcome::Continue(Vec::new()))
        }
        Command::Disconnect => {
            info!(client_id = %conn.client_id, "ws: client sent DISCONNECT");
            Ok(Outcome::Close(Vec::new()))
        }
    }
}

async fn handle_connect(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<Frame>,
    frame: &Frame,
) -> Result<Outcome, ProtocolError> {
    let version = negotiate_version(frame.header(header::ACCEPT_VERSION))?;

    broker::register(state, conn.client_id, client_tx.clone()).await;
    conn.connected = true;
    info!(client_id = %conn.client_id, version, "ws: client connected");

    let connected = Frame::new(Command::Connected)
        .with_header(header::VERSION, version)
        .with_header(header::HEART_BEAT, "0,0")
        .with_header(header::SERVER, SERVER_NAME);
    Ok(Outcome::Continue(vec![connected]))
}

/// Route a SEND frame by destination prefix.
///
/// Application errors (bad payloads, oversized fields, unknown `/app`
/// destinations) are logged and the frame is dropped; the connection stays
/// open.
async fn handle_send(state: &AppState, client_id: Uuid, destination: &str, frame: &Frame) {
    match destination {
        APP_ADD_USER => match chat::add_user(&frame.body) {
            Ok((user, notice)) => {
                if let Err(e) = broker::set_user(state, client_id, &user).await {
                    warn!(%client_id, error = %e, "ws: could not record username");
                }
                info!(%client_id, %user, "ws: user joined");
                broker::publish(state, frames::TOPIC_PUBLIC, JSON, &notice.to_json()).await;
            }
            Err(e) => warn!(%client_id, destination, error = %e, "ws: dropped join"),
        },
        APP_SEND_MESSAGE => match chat::send_message(&frame.body, state.next_chat_id()) {
            Ok(msg) => {
                debug!(%client_id, id = ?msg.id, user = %msg.sender, "ws: chat message");
                broker::publish(state, frames::TOPIC_PUBLIC, JSON, &msg.to_json()).await;
                history::record(state, msg).await;
            }
            Err(e) => warn!(%client_id, destination, error = %e, "ws: dropped chat message"),
        },
        topic if topic.starts_with("/topic/") => {
            let content_type = frame.header(header::CONTENT_TYPE).unwrap_or(JSON);
            broker::publish(state, topic, content_type, &frame.body).await;
        }
        _ => warn!(%client_id, destination, "ws: no handler for destination"),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Pick the highest version both sides speak. A CONNECT without
/// `accept-version` is a STOMP 1.0 client.
fn negotiate_version(accept: Option<&str>) -> Result<&'static str, ProtocolError> {
    let Some(accept) = accept else {
        return Ok("1.0");
    };
    SUPPORTED_VERSIONS
        .into_iter()
        .find(|supported| accept.split(',').any(|v| v.trim() == *supported))
        .ok_or_else(|| ProtocolError::UnsupportedVersion(accept.to_owned()))
}

fn require_header<'a>(frame: &'a Frame, name: &'static str) -> Result<&'a str, ProtocolError> {
    frame.header(name).ok_or(ProtocolError::MissingHeader(name))
}

fn receipt_frame(receipt: &str) -> Frame {
    Frame::new(Command::Receipt).with_header(header::RECEIPT_ID, receipt)
}

fn error_frame(error: &ProtocolError, receipt: Option<&str>) -> Frame {
    let mut frame = Frame::new(Command::Error).with_header(header::MESSAGE, error.to_string());
    if let Some(receipt) = receipt {
        frame = frame.with_header(header::RECEIPT_ID, receipt);
    }
    frame
}

async fn send_frame(socket: &mut WebSocket, client_id: Uuid, frame: &Frame) -> Result<(), ()> {
    if frame.command == Command::Message {
        debug!(%client_id, destination = frame.destination().unwrap_or("-"), "ws: send MESSAGE");
    } else {
        info!(%client_id, command = %frame.command, "ws: send frame");
    }
    socket
        .send(Message::Text(frames::encode_frame(frame).into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
