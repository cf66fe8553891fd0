use super::*;
use frames::Timestamp;
use frames::message::NOW_PLACEHOLDER;

#[test]
fn system_notice_has_no_header() {
    let msg = ChatMessage::system("ana se unió al chat!");
    assert_eq!(render_line(&msg, "ana"), "*** ana se unió al chat! ***");
}

#[test]
fn own_message_is_marked() {
    let mut msg = ChatMessage::chat("ana", "hola");
    msg.timestamp = Some(Timestamp::Components(vec![2024, 3, 5, 9, 7, 0, 0]));
    assert_eq!(render_line(&msg, "ana"), "[09:07] ana (tú): hola");
}

#[test]
fn other_message_shows_sender() {
    let mut msg = ChatMessage::chat("luis", "buenas");
    msg.timestamp = Some(Timestamp::Components(vec![2024, 3, 5, 21, 30]));
    assert_eq!(render_line(&msg, "ana"), "[21:30] luis: buenas");
}

#[test]
fn missing_timestamp_renders_placeholder() {
    let msg = ChatMessage::chat("luis", "hola");
    assert_eq!(render_line(&msg, "ana"), format!("[{NOW_PLACEHOLDER}] luis: hola"));
}

#[test]
fn control_characters_are_replaced() {
    let msg = ChatMessage::chat("lu\u{1b}is", "a\u{1b}[2Jb\nc");
    let line = render_line(&msg, "ana");
    assert!(!line.contains('\u{1b}'));
    assert!(!line.contains('\n'));
    assert!(line.ends_with("a\u{fffd}[2Jb\u{fffd}c"));
}

#[test]
fn markup_is_printed_verbatim() {
    let msg = ChatMessage::chat("luis", "<b>hola</b>");
    assert!(render_line(&msg, "ana").ends_with(": <b>hola</b>"));
}

#[test]
fn status_lines_cover_every_state() {
    assert_eq!(status_line(ConnectionState::Connected), "[Conectado]");
    assert_eq!(status_line(ConnectionState::Connecting), "[Conectando...]");
    assert!(status_line(ConnectionState::Disconnected).starts_with("[Desconectado"));
}
