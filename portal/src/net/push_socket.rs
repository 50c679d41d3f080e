//! WebSocket transport for the push channel.
//!
//! LIFECYCLE
//! =========
//! 1. Connect to the push URL and wait for `session:connected`, which
//!    carries the `socket_id` used to sign private channels.
//! 2. Attach to a [`PushHub`]; channels that already have listeners are
//!    subscribed immediately, later ones as their first listener appears.
//! 3. A background task pumps inbound envelopes into the hub and outbound
//!    control envelopes onto the socket until either side closes.
//!
//! Dropping the [`PushConnection`], or the socket closing, closes the hub so
//! listeners see their streams end.

#[cfg(test)]
#[path = "push_socket_test.rs"]
mod push_socket_test;

use std::sync::Arc;
use std::time::Duration;

use events::{CONNECTED_EVENT, Envelope, Signal};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::push::PushHub;

const HANDSHAKE_TIMEOUT_SECS: u64 = 5;
const PRIVATE_PREFIX: &str = "private-";

type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("websocket failed: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    Closed,
    #[error("timed out waiting for session:connected")]
    Timeout,
    #[error("envelope decode failed: {0}")]
    Decode(#[from] events::CodecError),
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
}

/// Signs private-channel subscriptions for a socket.
#[async_trait::async_trait]
pub trait ChannelAuthorizer: Send + Sync {
    async fn authorize(&self, socket_id: &str, channel: &str) -> Result<Value, ApiError>;
}

/// Live push socket feeding a [`PushHub`].
pub struct PushConnection {
    socket_id: String,
    hub: PushHub,
    task: JoinHandle<()>,
}

impl PushConnection {
    /// Connect, complete the handshake and start pumping.
    ///
    /// # Errors
    ///
    /// Returns [`PushError`] when the socket cannot be opened or the server
    /// never announces the session.
    pub async fn connect(
        url: &str,
        hub: PushHub,
        authorizer: Arc<dyn ChannelAuthorizer>,
    ) -> Result<Self, PushError> {
        let (mut stream, _) = connect_async(url)
            .await
            .map_err(|error| PushError::Socket(Box::new(error)))?;

        let socket_id = wait_for_session_connected(&mut stream).await?;
        info!(%socket_id, "push socket connected");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        hub.attach_outbound(outbound_tx);

        let pump = Pump { stream, outbound: outbound_rx, hub: hub.clone(), authorizer, socket_id: socket_id.clone() };
        let task = tokio::spawn(pump.run());
        Ok(Self { socket_id, hub, task })
    }

    #[must_use]
    pub fn socket_id(&self) -> &str {
        &self.socket_id
    }

    /// Whether the pump has stopped (socket closed or errored).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        self.task.abort();
        self.hub.close();
    }
}

enum Step {
    Inbound(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Control(Option<Envelope>),
}

struct Pump {
    stream: PushStream,
    outbound: mpsc::UnboundedReceiver<Envelope>,
    hub: PushHub,
    authorizer: Arc<dyn ChannelAuthorizer>,
    socket_id: String,
}

impl Pump {
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                inbound = self.stream.next() => Step::Inbound(inbound),
                control = self.outbound.recv() => Step::Control(control),
            };
            match step {
                Step::Inbound(Some(Ok(Message::Close(_)))) => {
                    info!("push socket closed by server");
                    break;
                }
                Step::Inbound(Some(Ok(message))) => self.handle_inbound(&message),
                Step::Inbound(Some(Err(error))) => {
                    warn!(%error, "push socket failed");
                    break;
                }
                Step::Inbound(None) => break,
                // Transport detached or replaced; listeners stay with the hub.
                Step::Control(None) => return,
                Step::Control(Some(envelope)) => {
                    if let Err(error) = self.send_control(envelope).await {
                        warn!(%error, "push control send failed");
                        break;
                    }
                }
            }
        }
        self.hub.close();
    }

    fn handle_inbound(&self, message: &Message) {
        let Some(decoded) = decode_message(message) else {
            return;
        };
        let envelope = match decoded {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(%error, "dropping undecodable push frame");
                return;
            }
        };
        match envelope.signal {
            Signal::Event => {
                let delivered = self.hub.publish(&envelope);
                debug!(channel = %envelope.channel, event = %envelope.event, delivered, "push event");
            }
            Signal::Subscribed => debug!(channel = %envelope.channel, "push subscription confirmed"),
            Signal::Error => {
                let message = envelope.data_str("message").unwrap_or("unknown push error");
                warn!(channel = %envelope.channel, message, "push server error");
            }
            Signal::Subscribe | Signal::Unsubscribe => {}
        }
    }

    /// Private channels get the backend's signature under `data.auth`. A
    /// channel that cannot be signed is closed for its listeners.
    async fn send_control(&mut self, mut envelope: Envelope) -> Result<(), PushError> {
        if envelope.signal == Signal::Subscribe && envelope.channel.starts_with(PRIVATE_PREFIX) {
            match self.authorizer.authorize(&self.socket_id, &envelope.channel).await {
                Ok(signed) => envelope.data = signed,
                Err(error) => {
                    warn!(channel = %envelope.channel, %error, "push channel authorization failed");
                    self.hub.close_channel(&envelope.channel);
                    return Ok(());
                }
            }
        }
        self.stream
            .send(Message::Binary(events::encode_envelope(&envelope).into()))
            .await
            .map_err(|error| PushError::Socket(Box::new(error)))
    }
}

fn decode_message(message: &Message) -> Option<Result<Envelope, events::CodecError>> {
    match message {
        Message::Binary(bytes) => Some(events::decode_envelope(bytes)),
        Message::Text(text) => Some(events::decode_envelope_json(text.as_str())),
        _ => None,
    }
}

async fn wait_for_session_connected(stream: &mut PushStream) -> Result<String, PushError> {
    let handshake = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(PushError::Closed);
            };
            let message = message.map_err(|error| PushError::Socket(Box::new(error)))?;
            if matches!(message, Message::Close(_)) {
                return Err(PushError::Closed);
            }
            let Some(decoded) = decode_message(&message) else {
                continue;
            };
            let envelope = decoded?;
            if envelope.event == CONNECTED_EVENT {
                return envelope
                    .data_str("socket_id")
                    .map(ToOwned::to_owned)
                    .ok_or(PushError::MissingField("socket_id"));
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(HANDSHAKE_TIMEOUT_SECS), handshake)
        .await
        .map_err(|_| PushError::Timeout)?
}
