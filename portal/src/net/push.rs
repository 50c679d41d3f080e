//! In-process fan-out for push-channel events.
//!
//! DESIGN
//! ======
//! `PushHub` maps channel names to the live subscribers of that channel,
//! each with its own bounded queue. The socket task publishes decoded
//! envelopes into the hub; wizards and chat rooms hold [`Subscription`]
//! guards. Dropping the last guard for a channel removes the channel and
//! sends an unsubscribe to the transport, so a torn-down screen never keeps
//! listening.
//!
//! Delivery is best-effort: a subscriber whose queue is full misses the
//! event rather than stalling the socket.
//!
//! When the transport goes away the hub is closed: every queue sender is
//! dropped, so a pending `recv` returns `None` instead of waiting forever.
//! Subscriptions taken after that start on a fresh registration.

#[cfg(test)]
#[path = "push_test.rs"]
mod push_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use events::Envelope;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Private channel carrying chat notifications.
pub const CHAT_CHANNEL: &str = "private-chat";
pub const MESSAGE_SENT_EVENT: &str = "MessageSent";
/// Private channel carrying payment-gateway confirmations.
pub const PAYMENT_CHANNEL: &str = "private-paymongo.paid";
pub const PAYMENT_PAID_EVENT: &str = "PaymongoPaidEvent";

const SUBSCRIBER_QUEUE: usize = 64;

#[derive(Default)]
struct HubState {
    /// Channel name -> subscriber id -> queue.
    channels: HashMap<String, HashMap<Uuid, mpsc::Sender<Envelope>>>,
    /// Transport sink for subscribe/unsubscribe control envelopes.
    outbound: Option<mpsc::UnboundedSender<Envelope>>,
}

#[derive(Clone, Default)]
pub struct PushHub {
    state: Arc<Mutex<HubState>>,
}

impl PushHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener on `channel`. The first listener on a channel
    /// emits a subscribe envelope to the attached transport.
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);

        let mut state = self.lock();
        let listeners = state.channels.entry(channel.to_owned()).or_default();
        let first = listeners.is_empty();
        listeners.insert(id, tx);
        if first {
            if let Some(outbound) = &state.outbound {
                let _ = outbound.send(Envelope::subscribe(channel));
            }
            info!(channel, "push channel subscribed");
        }
        drop(state);

        Subscription { hub: self.clone(), channel: channel.to_owned(), id, rx }
    }

    /// Deliver `envelope` to every listener on its channel. Returns how many
    /// queues accepted it.
    pub fn publish(&self, envelope: &Envelope) -> usize {
        let state = self.lock();
        let Some(listeners) = state.channels.get(&envelope.channel) else {
            debug!(channel = %envelope.channel, event = %envelope.event, "push event with no listeners");
            return 0;
        };
        listeners
            .values()
            .filter(|tx| tx.try_send(envelope.clone()).is_ok())
            .count()
    }

    #[must_use]
    pub fn listener_count(&self, channel: &str) -> usize {
        self.lock().channels.get(channel).map_or(0, HashMap::len)
    }

    /// Channels with at least one listener.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Route control envelopes to a transport. Active channels are
    /// re-subscribed on the new transport.
    pub fn attach_outbound(&self, outbound: mpsc::UnboundedSender<Envelope>) {
        let mut state = self.lock();
        let mut active: Vec<&String> = state.channels.keys().collect();
        active.sort();
        for channel in active {
            let _ = outbound.send(Envelope::subscribe(channel));
        }
        state.outbound = Some(outbound);
    }

    /// End every listener's stream and forget the transport.
    pub fn close(&self) {
        let mut state = self.lock();
        let closed = state.channels.len();
        state.channels.clear();
        state.outbound = None;
        drop(state);
        if closed > 0 {
            info!(closed, "push hub closed");
        }
    }

    /// End the streams of one channel's listeners.
    pub fn close_channel(&self, channel: &str) {
        if self.lock().channels.remove(channel).is_some() {
            info!(channel, "push channel closed");
        }
    }

    fn release(&self, channel: &str, id: Uuid) {
        let mut state = self.lock();
        let Some(listeners) = state.channels.get_mut(channel) else {
            return;
        };
        listeners.remove(&id);
        if !listeners.is_empty() {
            return;
        }
        state.channels.remove(channel);
        if let Some(outbound) = &state.outbound {
            let _ = outbound.send(Envelope::unsubscribe(channel));
        }
        info!(channel, "push channel released");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped listener on one channel. Released on drop.
pub struct Subscription {
    hub: PushHub,
    channel: String,
    id: Uuid,
    rx: mpsc::Receiver<Envelope>,
}

impl Subscription {
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next envelope on this channel.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Next queued envelope without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Wait for the named event, skipping anything else on the channel.
    pub async fn next_event(&mut self, event: &str) -> Option<Envelope> {
        while let Some(envelope) = self.rx.recv().await {
            if envelope.is_event(&self.channel, event) {
                return Some(envelope);
            }
        }
        None
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(&self.channel, self.id);
    }
}
