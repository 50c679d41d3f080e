//! Push-channel envelope model and codec.
//!
//! Every message on the push transport (chat notifications, payment
//! confirmations, subscription control) travels as an [`Envelope`]. Binary
//! socket frames carry the protobuf encoding; text frames carry the same
//! envelope as JSON so broadcaster bridges that only speak JSON still work.
//!
//! Payloads stay schema-free (`serde_json::Value`); consumers pick the
//! fields they care about (`payment_intent_id`, `socket_id`, ...).

use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use prost_types::value::Kind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event name the server sends once a socket is ready; `data.socket_id`
/// identifies the connection for private-channel authorization.
pub const CONNECTED_EVENT: &str = "session:connected";

/// Error returned by the decode functions.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireEnvelope`.
    #[error("failed to decode protobuf envelope: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The `signal` integer on the wire does not map to a known [`Signal`].
    #[error("invalid envelope signal: {0}")]
    InvalidSignal(i32),
    /// A text frame was not a valid JSON envelope.
    #[error("invalid JSON envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// What an envelope asks for or reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Client asks to start receiving a channel.
    Subscribe,
    /// Server acknowledges a subscription.
    Subscribed,
    /// A named event published on a channel.
    #[default]
    Event,
    /// Client stops receiving a channel.
    Unsubscribe,
    /// Server-side failure (auth rejected, unknown channel, ...).
    Error,
}

impl Signal {
    /// Wire enum integer for this signal.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        let wire = match self {
            Self::Subscribe => WireSignal::Subscribe,
            Self::Subscribed => WireSignal::Subscribed,
            Self::Event => WireSignal::Event,
            Self::Unsubscribe => WireSignal::Unsubscribe,
            Self::Error => WireSignal::Error,
        };
        wire as i32
    }

    fn from_i32(value: i32) -> Result<Self, CodecError> {
        match WireSignal::try_from(value) {
            Ok(WireSignal::Subscribe) => Ok(Self::Subscribe),
            Ok(WireSignal::Subscribed) => Ok(Self::Subscribed),
            Ok(WireSignal::Event) => Ok(Self::Event),
            Ok(WireSignal::Unsubscribe) => Ok(Self::Unsubscribe),
            Ok(WireSignal::Error) => Ok(Self::Error),
            Err(_) => Err(CodecError::InvalidSignal(value)),
        }
    }
}

/// A single push-channel message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier (UUID string).
    #[serde(default)]
    pub id: String,
    /// Milliseconds since the Unix epoch when the envelope was created.
    #[serde(default)]
    pub ts: i64,
    /// Channel name, e.g. `"private-chat"`. Empty for connection-level events.
    #[serde(default)]
    pub channel: String,
    /// Event name, e.g. `"MessageSent"`. Empty for control signals.
    #[serde(default)]
    pub event: String,
    /// Control signal or [`Signal::Event`] for published events.
    #[serde(default)]
    pub signal: Signal,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    fn build(channel: &str, event: &str, signal: Signal, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: now_ms(),
            channel: channel.to_owned(),
            event: event.to_owned(),
            signal,
            data,
        }
    }

    /// Published event on `channel`.
    #[must_use]
    pub fn event(channel: &str, event: &str, data: Value) -> Self {
        Self::build(channel, event, Signal::Event, data)
    }

    /// Subscription request for `channel` with an empty payload.
    #[must_use]
    pub fn subscribe(channel: &str) -> Self {
        Self::build(channel, "", Signal::Subscribe, Value::Object(Map::new()))
    }

    /// Unsubscription notice for `channel`.
    #[must_use]
    pub fn unsubscribe(channel: &str) -> Self {
        Self::build(channel, "", Signal::Unsubscribe, Value::Object(Map::new()))
    }

    /// Whether this is the published event `event` on `channel`.
    #[must_use]
    pub fn is_event(&self, channel: &str, event: &str) -> bool {
        self.signal == Signal::Event && self.channel == channel && self.event == event
    }

    /// String field from the payload, if present.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Encode an envelope into protobuf bytes.
#[must_use]
pub fn encode_envelope(envelope: &Envelope) -> Vec<u8> {
    let wire = WireEnvelope {
        id: envelope.id.clone(),
        ts: envelope.ts,
        channel: envelope.channel.clone(),
        event: envelope.event.clone(),
        signal: envelope.signal.as_i32(),
        data: Some(to_wire_value(&envelope.data)),
    };
    // Writing into a growable Vec cannot hit `BufferTooSmall`.
    wire.encode_to_vec()
}

/// Decode protobuf bytes into an envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::InvalidSignal`] for out-of-range signal values.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, CodecError> {
    let wire = WireEnvelope::decode(bytes)?;
    Ok(Envelope {
        id: wire.id,
        ts: wire.ts,
        channel: wire.channel,
        event: wire.event,
        signal: Signal::from_i32(wire.signal)?,
        data: wire.data.as_ref().map_or(Value::Null, from_wire_value),
    })
}

/// Encode an envelope as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the payload cannot be serialized.
pub fn encode_envelope_json(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode a JSON text frame into an envelope.
///
/// Broadcasters often double-encode `data` as a JSON string; such payloads
/// are unwrapped when they parse as JSON.
///
/// # Errors
///
/// Returns [`CodecError::Json`] when the text is not an envelope object.
pub fn decode_envelope_json(text: &str) -> Result<Envelope, CodecError> {
    let mut envelope: Envelope = serde_json::from_str(text)?;
    if let Value::String(raw) = &envelope.data {
        if let Ok(inner) = serde_json::from_str::<Value>(raw) {
            envelope.data = inner;
        }
    }
    Ok(envelope)
}

fn now_ms() -> i64 {
    let Ok(elapsed) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(elapsed.as_millis()).unwrap_or(0)
}

fn to_wire_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(flag) => Kind::BoolValue(*flag),
        Value::Number(number) => Kind::NumberValue(number.as_f64().unwrap_or(0.0)),
        Value::String(text) => Kind::StringValue(text.clone()),
        Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(to_wire_value).collect(),
        }),
        Value::Object(fields) => Kind::StructValue(prost_types::Struct {
            fields: fields
                .iter()
                .map(|(key, item)| (key.clone(), to_wire_value(item)))
                .collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

fn from_wire_value(value: &prost_types::Value) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(flag)) => Value::Bool(*flag),
        Some(Kind::NumberValue(number)) => number_value(*number),
        Some(Kind::StringValue(text)) => Value::String(text.clone()),
        Some(Kind::ListValue(list)) => Value::Array(list.values.iter().map(from_wire_value).collect()),
        Some(Kind::StructValue(fields)) => Value::Object(
            fields
                .fields
                .iter()
                .map(|(key, item)| (key.clone(), from_wire_value(item)))
                .collect(),
        ),
    }
}

/// Protobuf numbers are all doubles; integral values come back as integers
/// so ids survive a round trip unchanged.
#[allow(clippy::cast_possible_truncation)]
fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        return Value::from(number as i64);
    }
    serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
}

#[derive(Clone, PartialEq, Message)]
struct WireEnvelope {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(int64, tag = "2")]
    ts: i64,
    #[prost(string, tag = "3")]
    channel: String,
    #[prost(string, tag = "4")]
    event: String,
    #[prost(enumeration = "WireSignal", tag = "5")]
    signal: i32,
    #[prost(message, optional, tag = "6")]
    data: Option<prost_types::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireSignal {
    Event = 0,
    Subscribe = 1,
    Subscribed = 2,
    Unsubscribe = 3,
    Error = 4,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
