use super::*;

fn paid_event() -> Envelope {
    Envelope {
        id: "env-1".to_owned(),
        ts: 42,
        channel: "private-paymongo.paid".to_owned(),
        event: "PaymongoPaidEvent".to_owned(),
        signal: Signal::Event,
        data: serde_json::json!({
            "payment_intent_id": "pi_123",
            "amount": 150,
            "rate": 1.25,
            "ok": true,
            "tags": ["gcash"],
            "nil": null
        }),
    }
}

#[test]
fn signal_numeric_mapping_matches_wire_enum() {
    assert_eq!(Signal::Event.as_i32(), 0);
    assert_eq!(Signal::Subscribe.as_i32(), 1);
    assert_eq!(Signal::Subscribed.as_i32(), 2);
    assert_eq!(Signal::Unsubscribe.as_i32(), 3);
    assert_eq!(Signal::Error.as_i32(), 4);
}

#[test]
fn signal_from_wire_rejects_out_of_range_value() {
    let err = Signal::from_i32(99).expect_err("signal should be invalid");
    assert!(matches!(err, CodecError::InvalidSignal(99)));
}

#[test]
fn protobuf_encoding_preserves_payment_event() {
    let envelope = paid_event();
    let decoded = decode_envelope(&encode_envelope(&envelope)).expect("decode should succeed");
    assert_eq!(decoded, envelope);
    assert_eq!(decoded.data["amount"], serde_json::json!(150));
}

#[test]
fn decode_envelope_rejects_malformed_bytes() {
    let err = decode_envelope(&[0xff, 0x00, 0x01]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_envelope_rejects_invalid_wire_signal() {
    let wire = WireEnvelope {
        id: "env-1".to_owned(),
        ts: 1,
        channel: "private-chat".to_owned(),
        event: "MessageSent".to_owned(),
        signal: 77,
        data: None,
    };
    let err = decode_envelope(&wire.encode_to_vec()).expect_err("signal should fail");
    assert!(matches!(err, CodecError::InvalidSignal(77)));
}

#[test]
fn decode_envelope_without_data_yields_null() {
    let wire = WireEnvelope {
        id: "env-1".to_owned(),
        ts: 1,
        channel: "private-chat".to_owned(),
        event: String::new(),
        signal: Signal::Subscribed.as_i32(),
        data: None,
    };
    let decoded = decode_envelope(&wire.encode_to_vec()).expect("decode");
    assert_eq!(decoded.signal, Signal::Subscribed);
    assert_eq!(decoded.data, Value::Null);
}

#[test]
fn json_text_frame_defaults_missing_fields() {
    let decoded =
        decode_envelope_json(r#"{"channel":"private-chat","event":"MessageSent"}"#).expect("decode");
    assert_eq!(decoded.signal, Signal::Event);
    assert!(decoded.id.is_empty());
    assert!(decoded.is_event("private-chat", "MessageSent"));
}

#[test]
fn json_text_frame_unwraps_string_encoded_data() {
    let text = r#"{"channel":"private-paymongo.paid","event":"PaymongoPaidEvent","data":"{\"payment_intent_id\":\"pi_9\"}"}"#;
    let decoded = decode_envelope_json(text).expect("decode");
    assert_eq!(decoded.data_str("payment_intent_id"), Some("pi_9"));
}

#[test]
fn json_text_frame_keeps_plain_string_data() {
    let decoded = decode_envelope_json(r#"{"channel":"c","event":"e","data":"hello"}"#).expect("decode");
    assert_eq!(decoded.data, Value::String("hello".to_owned()));
}

#[test]
fn json_encoding_uses_lowercase_signal() {
    let text = encode_envelope_json(&Envelope::subscribe("private-chat")).expect("encode");
    assert!(text.contains(r#""signal":"subscribe""#));
}

#[test]
fn control_constructors_stamp_id_and_channel() {
    let sub = Envelope::subscribe("private-chat");
    let unsub = Envelope::unsubscribe("private-chat");
    assert_eq!(sub.signal, Signal::Subscribe);
    assert_eq!(unsub.signal, Signal::Unsubscribe);
    assert_eq!(sub.channel, "private-chat");
    assert!(!sub.id.is_empty());
    assert_ne!(sub.id, unsub.id);
    assert!(sub.ts > 0);
}

#[test]
fn is_event_requires_event_signal() {
    let mut envelope = Envelope::event("private-chat", "MessageSent", Value::Null);
    assert!(envelope.is_event("private-chat", "MessageSent"));
    assert!(!envelope.is_event("private-chat", "Other"));
    envelope.signal = Signal::Error;
    assert!(!envelope.is_event("private-chat", "MessageSent"));
}
