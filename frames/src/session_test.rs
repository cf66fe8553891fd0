use super::*;

use crate::message::MessageKind;

fn session() -> ChatSession {
    ChatSession::new("ana", SessionConfig::default())
}

fn connected() -> (ChatSession, Attempt) {
    let mut s = session();
    let attempt = s.begin_connect().expect("attempt");
    s.handle_frame(attempt, &Frame::new(Command::Connected)).expect("connected");
    (s, attempt)
}

fn public_message(body: &str) -> Frame {
    Frame::new(Command::Message)
        .with_header(header::DESTINATION, TOPIC_PUBLIC)
        .with_header(header::SUBSCRIPTION, PUBLIC_SUBSCRIPTION_ID)
        .with_body(body)
}

// =============================================================
// Connection lifecycle
// =============================================================

#[test]
fn new_session_is_disconnected() {
    let s = session();
    assert_eq!(s.state(), ConnectionState::Disconnected);
    assert_eq!(s.user(), "ana");
    assert_eq!(s.config().reconnect_delay, Duration::from_millis(5000));
}

#[test]
fn begin_connect_moves_to_connecting() {
    let mut s = session();
    assert!(s.begin_connect().is_some());
    assert_eq!(s.state(), ConnectionState::Connecting);
}

#[test]
fn begin_connect_is_guarded_while_attempt_in_flight_or_connected() {
    let mut s = session();
    let _first = s.begin_connect().expect("attempt");
    assert!(s.begin_connect().is_none());

    let (mut live, _) = connected();
    assert!(live.begin_connect().is_none());
}

#[test]
fn connect_frame_negotiates_versions_without_heart_beats() {
    let frame = session().connect_frame("localhost:8080");
    assert_eq!(frame.command, Command::Connect);
    assert_eq!(frame.header(header::ACCEPT_VERSION), Some("1.1,1.2"));
    assert_eq!(frame.header(header::HOST), Some("localhost:8080"));
    assert_eq!(frame.header(header::HEART_BEAT), Some("0,0"));
}

#[test]
fn connected_frame_subscribes_before_sending_join() {
    let mut s = session();
    let attempt = s.begin_connect().expect("attempt");
    let Inbound::Connected(frames) = s.handle_frame(attempt, &Frame::new(Command::Connected)).expect("ok")
    else {
        panic!("expected Connected");
    };
    assert_eq!(s.state(), ConnectionState::Connected);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].command, Command::Subscribe);
    assert_eq!(frames[0].destination(), Some(TOPIC_PUBLIC));
    assert_eq!(frames[1].command, Command::Send);
    assert_eq!(frames[1].destination(), Some(APP_ADD_USER));
    let join = ChatMessage::from_json(&frames[1].body).expect("join body");
    assert_eq!(join, ChatMessage::join("ana"));
    assert_eq!(join.kind, MessageKind::Join);
}

#[test]
fn failure_disconnects_immediately_and_schedules_one_retry() {
    let (mut s, attempt) = connected();
    assert_eq!(s.fail(attempt), Some(DEFAULT_RECONNECT_DELAY));
    assert_eq!(s.state(), ConnectionState::Disconnected);
    assert_eq!(s.fail(attempt), None);
}

#[test]
fn failure_while_connecting_also_schedules_retry() {
    let mut s = ChatSession::new("ana", SessionConfig { reconnect_delay: Duration::from_millis(250) });
    let attempt = s.begin_connect().expect("attempt");
    assert_eq!(s.fail(attempt), Some(Duration::from_millis(250)));
    assert_eq!(s.state(), ConnectionState::Disconnected);
}

#[test]
fn retries_are_unbounded() {
    let mut s = session();
    for _ in 0..50 {
        let attempt = s.begin_connect().expect("attempt");
        assert!(s.fail(attempt).is_some());
    }
}

#[test]
fn stale_attempt_events_are_rejected() {
    let mut s = session();
    let old = s.begin_connect().expect("attempt");
    s.fail(old);
    let new = s.begin_connect().expect("attempt");
    assert_ne!(old, new);

    let err = s.handle_frame(old, &Frame::new(Command::Connected)).expect_err("stale");
    assert!(matches!(err, SessionError::StaleAttempt));
    assert_eq!(s.fail(old), None);
    assert_eq!(s.state(), ConnectionState::Connecting);
}

#[test]
fn error_frame_is_fatal_rejection() {
    let (mut s, attempt) = connected();
    let err = s
        .handle_frame(attempt, &Frame::new(Command::Error).with_header(header::MESSAGE, "bad frame"))
        .expect_err("error frame");
    assert!(matches!(&err, SessionError::Rejected(reason) if reason == "bad frame"));
    assert!(err.is_fatal());
}

#[test]
fn message_before_handshake_is_unexpected() {
    let mut s = session();
    let attempt = s.begin_connect().expect("attempt");
    let err = s.handle_frame(attempt, &public_message("{}")).expect_err("unexpected");
    assert!(matches!(err, SessionError::Unexpected(Command::Message, ConnectionState::Connecting)));
}

// =============================================================
// Inbound messages
// =============================================================

#[test]
fn public_message_decodes_chat_payload() {
    let (mut s, attempt) = connected();
    let inbound = s
        .handle_frame(attempt, &public_message(r#"{"usuario":"luis","contenido":"<b>hi</b>","tipo":"CHAT"}"#))
        .expect("message");
    assert_eq!(inbound, Inbound::Message(ChatMessage::chat("luis", "<b>hi</b>")));
}

#[test]
fn malformed_payload_is_not_fatal() {
    let (mut s, attempt) = connected();
    let err = s.handle_frame(attempt, &public_message("not json")).expect_err("payload");
    assert!(matches!(err, SessionError::Payload(_)));
    assert!(!err.is_fatal());
    assert!(s.is_connected());
}

#[test]
fn message_for_other_subscription_is_ignored() {
    let (mut s, attempt) = connected();
    let frame = Frame::new(Command::Message)
        .with_header(header::SUBSCRIPTION, "sub-9")
        .with_body("{}");
    assert_eq!(s.handle_frame(attempt, &frame).expect("ok"), Inbound::Ignored);
}

#[test]
fn receipt_is_reported() {
    let (mut s, attempt) = connected();
    let frame = Frame::new(Command::Receipt).with_header(header::RECEIPT_ID, "r-1");
    assert_eq!(s.handle_frame(attempt, &frame).expect("ok"), Inbound::Receipt("r-1".to_owned()));
}

// =============================================================
// Outbound messages
// =============================================================

#[test]
fn compose_sends_trimmed_chat_to_app_destination() {
    let (s, _) = connected();
    let frame = s.compose("  hola mundo \n").expect("frame");
    assert_eq!(frame.command, Command::Send);
    assert_eq!(frame.destination(), Some(APP_SEND_MESSAGE));
    let msg = ChatMessage::from_json(&frame.body).expect("body");
    assert_eq!(msg, ChatMessage::chat("ana", "hola mundo"));
}

#[test]
fn compose_ignores_blank_input_even_when_disconnected() {
    let (s, _) = connected();
    assert_eq!(s.compose("").expect_err("empty"), SendError::Empty);
    assert_eq!(s.compose(" \t\n").expect_err("blank"), SendError::Empty);
    assert_eq!(session().compose("   ").expect_err("blank"), SendError::Empty);
}

#[test]
fn compose_rejects_when_not_connected() {
    let mut s = session();
    assert_eq!(s.compose("hola").expect_err("disconnected"), SendError::NotConnected);
    s.begin_connect();
    assert_eq!(s.compose("hola").expect_err("connecting"), SendError::NotConnected);
}

// =============================================================
// Teardown
// =============================================================

#[test]
fn disconnect_returns_frame_only_when_connected() {
    let (mut s, attempt) = connected();
    let frame = s.disconnect().expect("frame");
    assert_eq!(frame.command, Command::Disconnect);
    assert_eq!(s.state(), ConnectionState::Disconnected);
    assert_eq!(s.fail(attempt), None);
    assert!(s.disconnect().is_none());
}

#[test]
fn disconnect_invalidates_in_flight_attempt() {
    let mut s = session();
    let attempt = s.begin_connect().expect("attempt");
    assert!(s.disconnect().is_none());
    assert_eq!(s.fail(attempt), None);
}
