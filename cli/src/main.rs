//! KodiChat terminal client.
//!
//! DESIGN
//! ======
//! `chat` drives the same `ChatSession` state machine as the browser client
//! over tokio-tungstenite. Each connection attempt runs a `select!` over the
//! socket, stdin lines, and ctrl-c. A lost connection drops the session to
//! Disconnected and retries after the fixed reconnect delay, forever.

mod render;

use std::time::Duration;

use clap::{Parser, Subcommand};
use frames::{Attempt, ChatSession, Inbound, SendError, SessionConfig};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type StdinLines = Lines<BufReader<Stdin>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing username; pass --user or set KODICHAT_USER")]
    MissingUser,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    HealthCheck(u16),
    #[error("stdin read failed: {0}")]
    Stdin(#[from] std::io::Error),
}

/// Why one connection attempt ended.
#[derive(Debug, thiserror::Error)]
enum ConnectionError {
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    Closed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error(transparent)]
    Session(#[from] frames::SessionError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "kodichat-cli", about = "KodiChat terminal client")]
struct Cli {
    #[arg(long, env = "KODICHAT_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    #[arg(long, env = "KODICHAT_USER")]
    user: Option<String>,

    #[arg(long, default_value_t = 5000)]
    reconnect_delay_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server answers `/healthz`.
    Ping,
    /// Join the public chat room; stdin lines are sent as messages.
    Chat,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Chat => {
            let user = cli
                .user
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or(CliError::MissingUser)?;
            let config = SessionConfig { reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms) };
            run_chat(&cli.base_url, ChatSession::new(user, config)).await
        }
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::HealthCheck(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

// =============================================================================
// CHAT
// =============================================================================

async fn run_chat(base_url: &str, mut session: ChatSession) -> Result<(), CliError> {
    let url = ws_url(base_url)?;
    let host = host_of(base_url)?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(attempt) = session.begin_connect() else {
            return Ok(());
        };
        eprintln!("{}", render::status_line(session.state()));

        // Ok means the user quit.
        match run_connection(&url, &host, &mut session, attempt, &mut stdin).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!(error = %e, "chat connection lost"),
        }

        let Some(delay) = session.fail(attempt) else {
            return Ok(());
        };
        eprintln!("{}", render::status_line(session.state()));
        info!(delay_ms = delay.as_millis(), "reconnect scheduled");

        if wait_disconnected(delay, &mut stdin).await? {
            return Ok(());
        }
    }
}

/// Run one connection attempt until the user quits (`Ok`) or the transport fails.
async fn run_connection(
    url: &str,
    host: &str,
    session: &mut ChatSession,
    attempt: Attempt,
    stdin: &mut StdinLines,
) -> Result<(), ConnectionError> {
    let (mut ws, _) = connect_async(url).await?;
    send(&mut ws, &session.connect_frame(host)).await?;

    loop {
        tokio::select! {
            msg = ws.next() => {
                let Some(msg) = msg else { return Err(ConnectionError::Closed) };
                let text = match msg? {
                    Message::Text(text) => text,
                    Message::Close(_) => return Err(ConnectionError::Closed),
                    _ => continue,
                };
                for frame in frames::decode_frames(text.as_str())? {
                    match session.handle_frame(attempt, &frame) {
                        Ok(Inbound::Connected(replies)) => {
                            for reply in &replies {
                                send(&mut ws, reply).await?;
                            }
                            eprintln!("{}", render::status_line(session.state()));
                        }
                        Ok(Inbound::Message(message)) => {
                            println!("{}", render::render_line(&message, session.user()));
                        }
                        Ok(Inbound::Receipt(_) | Inbound::Ignored) => {}
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => warn!(error = %e, "dropped inbound message"),
                    }
                }
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else {
                    // End of input quits like ctrl-c.
                    quit(&mut ws, session).await;
                    return Ok(());
                };
                match session.compose(&line) {
                    Ok(frame) => send(&mut ws, &frame).await?,
                    Err(SendError::Empty) => {}
                    Err(SendError::NotConnected | SendError::Closed) => eprintln!("{}", render::NOT_CONNECTED_ALERT),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                quit(&mut ws, session).await;
                return Ok(());
            }
        }
    }
}

/// Sit out the reconnect delay. Input typed meanwhile is refused, not queued.
///
/// Returns `true` if the user quit while waiting.
async fn wait_disconnected<R>(delay: Duration, stdin: &mut Lines<R>) -> Result<bool, CliError>
where
    R: AsyncBufRead + Unpin,
{
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return Ok(false),
            line = stdin.next_line() => {
                let Some(line) = line? else { return Ok(true) };
                if !line.trim().is_empty() {
                    eprintln!("{}", render::NOT_CONNECTED_ALERT);
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(true),
        }
    }
}

/// Send DISCONNECT if connected and close the socket. Errors are irrelevant here.
async fn quit(ws: &mut WsStream, session: &mut ChatSession) {
    if let Some(frame) = session.disconnect() {
        let _ = send(ws, &frame).await;
    }
    let _ = ws.close(None).await;
}

async fn send(ws: &mut WsStream, frame: &frames::Frame) -> Result<(), ConnectionError> {
    ws.send(Message::Text(frames::encode_frame(frame).into())).await?;
    Ok(())
}

// =============================================================================
// URLS
// =============================================================================

fn ws_url(base_url: &str) -> Result<String, CliError> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("http://") {
        return Ok(format!("ws://{rest}{}", frames::WS_ENDPOINT));
    }
    if let Some(rest) = base.strip_prefix("https://") {
        return Ok(format!("wss://{rest}{}", frames::WS_ENDPOINT));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

/// Authority part of the base URL, used as the STOMP `host` header.
fn host_of(base_url: &str) -> Result<String, CliError> {
    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("https://"))
        .ok_or_else(|| CliError::InvalidBaseUrl(base_url.to_owned()))?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(CliError::InvalidBaseUrl(base_url.to_owned()));
    }
    Ok(host.to_owned())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
