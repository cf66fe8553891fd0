use super::*;

use frames::{APP_ADD_USER, APP_SEND_MESSAGE, Command, TOPIC_PUBLIC};

const CONNECTED: &str = "CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0";

fn next_frame(rx: &mut UnboundedReceiver<String>) -> Frame {
    let text = rx
        .try_next()
        .expect("frame should be queued")
        .expect("channel should be open");
    let mut frames = decode_frames(&text).expect("queued frame should decode");
    assert_eq!(frames.len(), 1);
    frames.remove(0)
}

fn connected_client() -> (ChatClient, UnboundedReceiver<String>, Attempt) {
    let (client, mut rx) = ChatClient::new("ana", SessionConfig::default());
    let attempt = client.with_session(ChatSession::begin_connect).expect("attempt");
    client.process_text(attempt, CONNECTED).expect("handshake");
    drain_stale(&mut rx);
    (client, rx, attempt)
}

fn public_message(body: &str) -> String {
    encode_frame(
        &Frame::new(Command::Message)
            .with_header("destination", TOPIC_PUBLIC)
            .with_header("subscription", "sub-0")
            .with_header("message-id", "1")
            .with_body(body),
    )
}

// =============================================================
// Handshake
// =============================================================

#[test]
fn handshake_queues_subscribe_then_join_and_reports_connected() {
    let (client, mut rx) = ChatClient::new("ana", SessionConfig::default());
    let attempt = client.with_session(ChatSession::begin_connect).expect("attempt");
    assert_eq!(client.connection_state(), ConnectionState::Connecting);

    let events = client.process_text(attempt, CONNECTED).expect("handshake");
    assert_eq!(events, vec![ClientEvent::Connected]);
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    let subscribe = next_frame(&mut rx);
    assert_eq!(subscribe.command, Command::Subscribe);
    assert_eq!(subscribe.destination(), Some(TOPIC_PUBLIC));
    let join = next_frame(&mut rx);
    assert_eq!(join.destination(), Some(APP_ADD_USER));
    assert_eq!(ChatMessage::from_json(&join.body).expect("join"), ChatMessage::join("ana"));
}

#[test]
fn error_frame_ends_the_attempt() {
    let (client, _rx, attempt) = connected_client();
    let err = client
        .process_text(attempt, "ERROR\nmessage:nope\n\n\0")
        .expect_err("error frame");
    assert!(matches!(err, ClientError::Session(SessionError::Rejected(_))));
}

#[test]
fn garbage_framing_ends_the_attempt() {
    let (client, _rx, attempt) = connected_client();
    let err = client.process_text(attempt, "HELLO\n\n\0").expect_err("bad command");
    assert!(matches!(err, ClientError::Codec(CodecError::UnknownCommand(_))));
}

// =============================================================
// Inbound messages
// =============================================================

#[test]
fn messages_are_reported_in_arrival_order() {
    let (client, _rx, attempt) = connected_client();
    let text = format!(
        "{}{}",
        public_message(r#"{"usuario":"luis","contenido":"uno","tipo":"CHAT"}"#),
        public_message(r#"{"usuario":"Sistema","contenido":"dos","tipo":"SYSTEM"}"#)
    );
    let events = client.process_text(attempt, &text).expect("messages");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ClientEvent::Message(ChatMessage::chat("luis", "uno")));
    assert_eq!(events[1], ClientEvent::Message(ChatMessage::system("dos")));
}

#[test]
fn malformed_payload_is_dropped_and_connection_kept() {
    let (client, _rx, attempt) = connected_client();
    let events = client.process_text(attempt, &public_message("{oops")).expect("not fatal");
    assert!(events.is_empty());
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

// =============================================================
// Outbound messages
// =============================================================

#[test]
fn send_message_queues_one_trimmed_chat_frame() {
    let (client, mut rx, _) = connected_client();
    client.send_message("  hola  ").expect("sent");
    let frame = next_frame(&mut rx);
    assert_eq!(frame.destination(), Some(APP_SEND_MESSAGE));
    assert_eq!(ChatMessage::from_json(&frame.body).expect("chat"), ChatMessage::chat("ana", "hola"));
    assert!(rx.try_next().is_err(), "exactly one frame");
}

#[test]
fn blank_input_sends_nothing() {
    let (client, mut rx, _) = connected_client();
    assert_eq!(client.send_message("   "), Err(SendError::Empty));
    assert!(rx.try_next().is_err());
}

#[test]
fn send_without_connection_is_rejected_and_not_buffered() {
    let (client, mut rx) = ChatClient::new("ana", SessionConfig::default());
    assert_eq!(client.send_message("hola"), Err(SendError::NotConnected));
    assert!(rx.try_next().is_err());
}

#[test]
fn send_after_transport_dropped_reports_closed() {
    let (client, rx, _) = connected_client();
    drop(rx);
    assert_eq!(client.send_message("hola"), Err(SendError::Closed));
}

// =============================================================
// Teardown
// =============================================================

#[test]
fn disconnect_queues_disconnect_frame_when_connected() {
    let (client, mut rx, attempt) = connected_client();
    client.disconnect();
    assert_eq!(next_frame(&mut rx).command, Command::Disconnect);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(client.with_session(|s| s.fail(attempt)), None);
}

#[test]
fn disconnect_without_connection_sends_nothing() {
    let (client, mut rx) = ChatClient::new("ana", SessionConfig::default());
    client.disconnect();
    assert!(rx.try_next().is_err());
}

// =============================================================
// Helpers
// =============================================================

#[test]
fn drain_stale_discards_queued_frames() {
    let (client, mut rx, _) = connected_client();
    client.send_message("uno").expect("sent");
    client.send_message("dos").expect("sent");
    assert_eq!(drain_stale(&mut rx), 2);
    assert_eq!(drain_stale(&mut rx), 0);
}

#[test]
fn ws_url_follows_page_scheme() {
    assert_eq!(ws_url("http:", "localhost:8080"), "ws://localhost:8080/ws");
    assert_eq!(ws_url("https:", "chat.example.com"), "wss://chat.example.com/ws");
}

#[test]
fn user_is_exposed() {
    let (client, _rx) = ChatClient::new("ana", SessionConfig::default());
    assert_eq!(client.user(), "ana");
}
