use super::*;

fn sample_send() -> Frame {
    Frame::send_json(APP_SEND_MESSAGE, r#"{"usuario":"ana","contenido":"hola","tipo":"CHAT"}"#)
}

#[test]
fn command_parses_every_wire_spelling() {
    for command in [
        Command::Connect,
        Command::Stomp,
        Command::Connected,
        Command::Send,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Disconnect,
        Command::Message,
        Command::Receipt,
        Command::Error,
    ] {
        assert_eq!(command.as_str().parse::<Command>().expect("command"), command);
    }
}

#[test]
fn command_rejects_unknown_spelling() {
    let err = "ACK".parse::<Command>().expect_err("ACK is not supported");
    assert_eq!(err, CodecError::UnknownCommand("ACK".to_owned()));
}

#[test]
fn encode_frame_writes_command_headers_body_and_nul() {
    let frame = Frame::new(Command::Subscribe)
        .with_header(header::ID, "sub-0")
        .with_header(header::DESTINATION, TOPIC_PUBLIC);
    assert_eq!(
        encode_frame(&frame),
        "SUBSCRIBE\nid:sub-0\ndestination:/topic/public\n\n\0"
    );
}

#[test]
fn encode_frame_adds_content_length_for_body() {
    let encoded = encode_frame(&Frame::new(Command::Send).with_body("héllo"));
    assert_eq!(encoded, "SEND\ncontent-length:6\n\nhéllo\0");
}

#[test]
fn encode_frame_keeps_explicit_content_length() {
    let frame = Frame::new(Command::Send)
        .with_header(header::CONTENT_LENGTH, "2")
        .with_body("hi");
    assert_eq!(encode_frame(&frame).matches("content-length").count(), 1);
}

#[test]
fn encode_and_decode_preserve_a_send_frame() {
    let frame = sample_send();
    let decoded = decode_frames(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].command, Command::Send);
    assert_eq!(decoded[0].destination(), Some(APP_SEND_MESSAGE));
    assert_eq!(decoded[0].body, frame.body);
}

#[test]
fn header_values_are_escaped_outside_connect() {
    let frame = Frame::new(Command::Send).with_header("note", "a:b\nc\\d");
    let encoded = encode_frame(&frame);
    assert!(encoded.contains("note:a\\cb\\nc\\\\d\n"));
    let decoded = decode_frames(&encoded).expect("decode");
    assert_eq!(decoded[0].header("note"), Some("a:b\nc\\d"));
}

#[test]
fn connect_headers_are_not_escaped() {
    let frame = Frame::new(Command::Connect).with_header(header::HOST, "localhost:8080");
    assert!(encode_frame(&frame).contains("host:localhost:8080\n"));
    let decoded = decode_frames("CONNECTED\nserver:kodichat:1\n\n\0").expect("decode");
    assert_eq!(decoded[0].header(header::SERVER), Some("kodichat:1"));
}

#[test]
fn decode_rejects_undefined_escape() {
    let err = decode_frames("MESSAGE\nbad:\\t\n\n\0").expect_err("invalid escape");
    assert!(matches!(err, CodecError::InvalidEscape(_)));
}

#[test]
fn decode_skips_heart_beats_and_reads_multiple_frames() {
    let input = "\n\nRECEIPT\nreceipt-id:1\n\n\0\r\nRECEIPT\nreceipt-id:2\n\n\0\n";
    let frames = decode_frames(input).expect("decode");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].header(header::RECEIPT_ID), Some("1"));
    assert_eq!(frames[1].header(header::RECEIPT_ID), Some("2"));
}

#[test]
fn decode_heart_beat_only_payload_is_empty() {
    assert!(decode_frames("\n").expect("decode").is_empty());
}

#[test]
fn decode_accepts_crlf_line_endings() {
    let frames = decode_frames("ERROR\r\nmessage:boom\r\n\r\ndetails\0").expect("decode");
    assert_eq!(frames[0].header(header::MESSAGE), Some("boom"));
    assert_eq!(frames[0].body, "details");
}

#[test]
fn decode_uses_content_length_to_read_embedded_nul() {
    let frames = decode_frames("SEND\ncontent-length:3\n\na\0b\0").expect("decode");
    assert_eq!(frames[0].body, "a\0b");
}

#[test]
fn decode_rejects_content_length_past_end() {
    let err = decode_frames("SEND\ncontent-length:10\n\nabc\0").expect_err("too long");
    assert_eq!(err, CodecError::ContentLength(10));
}

#[test]
fn decode_rejects_non_numeric_content_length() {
    let err = decode_frames("SEND\ncontent-length:abc\n\nabc\0").expect_err("not numeric");
    assert_eq!(err, CodecError::InvalidContentLength("abc".to_owned()));
}

#[test]
fn decode_rejects_missing_terminator() {
    assert_eq!(decode_frames("SEND\n\nbody").expect_err("no nul"), CodecError::Unterminated);
    assert_eq!(decode_frames("SEND\nid:1").expect_err("no blank line"), CodecError::Unterminated);
}

#[test]
fn decode_rejects_header_without_separator() {
    let err = decode_frames("SEND\nnocolon\n\n\0").expect_err("malformed");
    assert_eq!(err, CodecError::MalformedHeader("nocolon".to_owned()));
}

#[test]
fn header_lookup_returns_first_repeated_value() {
    let frames = decode_frames("MESSAGE\nfoo:1\nfoo:2\n\n\0").expect("decode");
    assert_eq!(frames[0].header("foo"), Some("1"));
    assert_eq!(frames[0].headers.len(), 2);
}
