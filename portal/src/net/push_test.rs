use super::*;
use serde_json::json;

fn paid(intent: &str) -> Envelope {
    Envelope::event(PAYMENT_CHANNEL, PAYMENT_PAID_EVENT, json!({ "payment_intent_id": intent }))
}

#[test]
fn publish_reaches_every_listener_on_channel_only() {
    let hub = PushHub::new();
    let mut a = hub.subscribe(PAYMENT_CHANNEL);
    let mut b = hub.subscribe(PAYMENT_CHANNEL);
    let mut chat = hub.subscribe(CHAT_CHANNEL);

    assert_eq!(hub.publish(&paid("pi_1")), 2);
    assert_eq!(a.try_recv().unwrap().data_str("payment_intent_id"), Some("pi_1"));
    assert_eq!(b.try_recv().unwrap().data_str("payment_intent_id"), Some("pi_1"));
    assert!(chat.try_recv().is_none());
}

#[test]
fn publish_without_listeners_delivers_nothing() {
    let hub = PushHub::new();
    assert_eq!(hub.publish(&paid("pi_1")), 0);
}

#[test]
fn dropping_subscription_releases_registration() {
    let hub = PushHub::new();
    let first = hub.subscribe(CHAT_CHANNEL);
    let second = hub.subscribe(CHAT_CHANNEL);
    assert_eq!(hub.listener_count(CHAT_CHANNEL), 2);

    drop(first);
    assert_eq!(hub.listener_count(CHAT_CHANNEL), 1);
    drop(second);
    assert_eq!(hub.listener_count(CHAT_CHANNEL), 0);
    assert!(hub.channels().is_empty());
}

#[test]
fn transport_sees_one_subscribe_and_one_unsubscribe_per_channel() {
    let hub = PushHub::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.attach_outbound(tx);

    let first = hub.subscribe(PAYMENT_CHANNEL);
    let second = hub.subscribe(PAYMENT_CHANNEL);
    let sub = rx.try_recv().unwrap();
    assert_eq!(sub.signal, events::Signal::Subscribe);
    assert_eq!(sub.channel, PAYMENT_CHANNEL);
    assert!(rx.try_recv().is_err());

    drop(first);
    assert!(rx.try_recv().is_err());
    drop(second);
    let unsub = rx.try_recv().unwrap();
    assert_eq!(unsub.signal, events::Signal::Unsubscribe);
    assert_eq!(unsub.channel, PAYMENT_CHANNEL);
}

#[test]
fn attaching_transport_replays_active_channels() {
    let hub = PushHub::new();
    let _chat = hub.subscribe(CHAT_CHANNEL);
    let _paid = hub.subscribe(PAYMENT_CHANNEL);

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.attach_outbound(tx);
    let replayed: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.channel).collect();
    assert_eq!(replayed, vec![CHAT_CHANNEL.to_owned(), PAYMENT_CHANNEL.to_owned()]);
}

#[test]
fn full_queue_drops_event_for_that_listener() {
    let hub = PushHub::new();
    let _slow = hub.subscribe(CHAT_CHANNEL);
    let event = Envelope::event(CHAT_CHANNEL, MESSAGE_SENT_EVENT, json!({}));
    for _ in 0..SUBSCRIBER_QUEUE {
        assert_eq!(hub.publish(&event), 1);
    }
    assert_eq!(hub.publish(&event), 0);
}

#[tokio::test]
async fn next_event_skips_other_events() {
    let hub = PushHub::new();
    let mut sub = hub.subscribe(PAYMENT_CHANNEL);
    hub.publish(&Envelope::event(PAYMENT_CHANNEL, "Other", json!({})));
    hub.publish(&paid("pi_7"));

    let envelope = sub.next_event(PAYMENT_PAID_EVENT).await.unwrap();
    assert_eq!(envelope.data_str("payment_intent_id"), Some("pi_7"));
}

#[tokio::test]
async fn close_ends_pending_streams() {
    let hub = PushHub::new();
    let mut payments = hub.subscribe(PAYMENT_CHANNEL);
    let mut chat = hub.subscribe(CHAT_CHANNEL);

    hub.close();
    assert!(payments.next_event(PAYMENT_PAID_EVENT).await.is_none());
    assert!(chat.recv().await.is_none());
    assert!(hub.channels().is_empty());

    let mut fresh = hub.subscribe(PAYMENT_CHANNEL);
    assert_eq!(hub.publish(&paid("pi_2")), 1);
    assert_eq!(fresh.try_recv().unwrap().data_str("payment_intent_id"), Some("pi_2"));
    drop(payments);
    assert_eq!(hub.listener_count(PAYMENT_CHANNEL), 1);
}

#[tokio::test]
async fn close_channel_leaves_other_channels_open() {
    let hub = PushHub::new();
    let mut payments = hub.subscribe(PAYMENT_CHANNEL);
    let mut chat = hub.subscribe(CHAT_CHANNEL);

    hub.close_channel(PAYMENT_CHANNEL);
    assert!(payments.recv().await.is_none());
    hub.publish(&Envelope::event(CHAT_CHANNEL, MESSAGE_SENT_EVENT, json!({})));
    assert!(chat.try_recv().is_some());
}
