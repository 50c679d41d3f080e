use super::*;
use crate::net::push::{CHAT_CHANNEL, MESSAGE_SENT_EVENT, PAYMENT_CHANNEL, PAYMENT_PAID_EVENT};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

// =============================================================
// Helpers
// =============================================================

type ServerStream = WebSocketStream<TcpStream>;

struct SigningAuthorizer;

#[async_trait::async_trait]
impl ChannelAuthorizer for SigningAuthorizer {
    async fn authorize(&self, socket_id: &str, channel: &str) -> Result<Value, ApiError> {
        Ok(json!({ "auth": format!("sig:{socket_id}:{channel}") }))
    }
}

async fn spawn_push_server<F, Fut>(script: F) -> String
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        script(ws).await;
    });
    format!("ws://{addr}")
}

async fn send_envelope(ws: &mut ServerStream, envelope: &Envelope) {
    ws.send(Message::Binary(events::encode_envelope(envelope).into()))
        .await
        .unwrap();
}

async fn next_envelope(ws: &mut ServerStream) -> Envelope {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Binary(bytes) => return events::decode_envelope(&bytes).unwrap(),
            Message::Text(text) => return events::decode_envelope_json(text.as_str()).unwrap(),
            _ => {}
        }
    }
}

fn connected(socket_id: &str) -> Envelope {
    Envelope::event("", CONNECTED_EVENT, json!({ "socket_id": socket_id }))
}

async fn hold_open(ws: &mut ServerStream) {
    while let Some(Ok(_)) = ws.next().await {}
}

// =============================================================
// Handshake
// =============================================================

#[tokio::test]
async fn connect_reads_socket_id_from_session_event() {
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &connected("42.1")).await;
        hold_open(&mut ws).await;
    })
    .await;

    let conn = PushConnection::connect(&url, PushHub::new(), Arc::new(SigningAuthorizer))
        .await
        .unwrap();
    assert_eq!(conn.socket_id(), "42.1");
    assert!(!conn.is_finished());
}

#[tokio::test]
async fn connect_fails_without_socket_id() {
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &Envelope::event("", CONNECTED_EVENT, json!({}))).await;
        hold_open(&mut ws).await;
    })
    .await;

    let result = PushConnection::connect(&url, PushHub::new(), Arc::new(SigningAuthorizer)).await;
    assert!(matches!(result, Err(PushError::MissingField("socket_id"))));
}

#[tokio::test]
async fn connect_fails_when_server_closes_first() {
    let url = spawn_push_server(|mut ws| async move {
        ws.close(None).await.unwrap();
    })
    .await;

    let result = PushConnection::connect(&url, PushHub::new(), Arc::new(SigningAuthorizer)).await;
    assert!(matches!(result, Err(PushError::Closed | PushError::Socket(_))));
}

// =============================================================
// Subscriptions
// =============================================================

#[tokio::test]
async fn private_subscription_is_signed_and_events_reach_listener() {
    let (seen_tx, seen_rx) = oneshot::channel();
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &connected("42.1")).await;
        let subscribe = next_envelope(&mut ws).await;
        let _ = seen_tx.send(subscribe);
        let paid = Envelope::event(PAYMENT_CHANNEL, PAYMENT_PAID_EVENT, json!({ "payment_intent_id": "pi_1" }));
        send_envelope(&mut ws, &paid).await;
        hold_open(&mut ws).await;
    })
    .await;

    let hub = PushHub::new();
    let mut sub = hub.subscribe(PAYMENT_CHANNEL);
    let _conn = PushConnection::connect(&url, hub.clone(), Arc::new(SigningAuthorizer))
        .await
        .unwrap();

    let subscribe = seen_rx.await.unwrap();
    assert_eq!(subscribe.signal, Signal::Subscribe);
    assert_eq!(subscribe.channel, PAYMENT_CHANNEL);
    assert_eq!(subscribe.data["auth"], "sig:42.1:private-paymongo.paid");

    let event = tokio::time::timeout(Duration::from_secs(2), sub.next_event(PAYMENT_PAID_EVENT))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.data_str("payment_intent_id"), Some("pi_1"));
}

#[tokio::test]
async fn json_text_frames_are_accepted() {
    let url = spawn_push_server(|mut ws| async move {
        ws.send(Message::Text(
            r#"{"event":"session:connected","data":{"socket_id":"7.7"}}"#.into(),
        ))
        .await
        .unwrap();
        let _subscribe = next_envelope(&mut ws).await;
        ws.send(Message::Text(
            r#"{"channel":"private-chat","event":"MessageSent","data":"{\"id\":5}"}"#.into(),
        ))
        .await
        .unwrap();
        hold_open(&mut ws).await;
    })
    .await;

    let hub = PushHub::new();
    let mut sub = hub.subscribe(CHAT_CHANNEL);
    let _conn = PushConnection::connect(&url, hub.clone(), Arc::new(SigningAuthorizer))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), sub.next_event(MESSAGE_SENT_EVENT))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.data["id"], 5);
}

#[tokio::test]
async fn dropping_last_listener_unsubscribes_on_socket() {
    let (seen_tx, seen_rx) = oneshot::channel();
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &connected("1.1")).await;
        let subscribe = next_envelope(&mut ws).await;
        let unsubscribe = next_envelope(&mut ws).await;
        let _ = seen_tx.send((subscribe, unsubscribe));
        hold_open(&mut ws).await;
    })
    .await;

    let hub = PushHub::new();
    let _conn = PushConnection::connect(&url, hub.clone(), Arc::new(SigningAuthorizer))
        .await
        .unwrap();
    let sub = hub.subscribe(CHAT_CHANNEL);
    drop(sub);

    let (subscribe, unsubscribe) = tokio::time::timeout(Duration::from_secs(2), seen_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscribe.signal, Signal::Subscribe);
    assert_eq!(unsubscribe.signal, Signal::Unsubscribe);
    assert_eq!(unsubscribe.channel, CHAT_CHANNEL);
}

// =============================================================
// Teardown
// =============================================================

struct RefusingAuthorizer;

#[async_trait::async_trait]
impl ChannelAuthorizer for RefusingAuthorizer {
    async fn authorize(&self, _socket_id: &str, _channel: &str) -> Result<Value, ApiError> {
        Err(ApiError::Rejected("forbidden".to_owned()))
    }
}

#[tokio::test]
async fn server_close_ends_listener_streams() {
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &connected("9.9")).await;
        ws.close(None).await.unwrap();
    })
    .await;

    let hub = PushHub::new();
    let mut sub = hub.subscribe(PAYMENT_CHANNEL);
    let conn = PushConnection::connect(&url, hub.clone(), Arc::new(SigningAuthorizer))
        .await
        .unwrap();

    let next = tokio::time::timeout(Duration::from_secs(2), sub.next_event(PAYMENT_PAID_EVENT))
        .await
        .unwrap();
    assert!(next.is_none());
    assert!(hub.channels().is_empty());
    drop(conn);
}

#[tokio::test]
async fn refused_authorization_ends_that_channel() {
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &connected("3.3")).await;
        hold_open(&mut ws).await;
    })
    .await;

    let hub = PushHub::new();
    let mut sub = hub.subscribe(CHAT_CHANNEL);
    let conn = PushConnection::connect(&url, hub.clone(), Arc::new(RefusingAuthorizer))
        .await
        .unwrap();

    let next = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
    assert!(next.is_none());
    assert_eq!(hub.listener_count(CHAT_CHANNEL), 0);
    assert!(!conn.is_finished());
}

#[tokio::test]
async fn dropping_connection_ends_listener_streams() {
    let url = spawn_push_server(|mut ws| async move {
        send_envelope(&mut ws, &connected("5.5")).await;
        hold_open(&mut ws).await;
    })
    .await;

    let hub = PushHub::new();
    let mut sub = hub.subscribe(CHAT_CHANNEL);
    let conn = PushConnection::connect(&url, hub.clone(), Arc::new(SigningAuthorizer))
        .await
        .unwrap();
    drop(conn);

    let next = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
    assert!(next.is_none());
}
