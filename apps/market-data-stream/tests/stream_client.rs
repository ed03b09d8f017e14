//! Stream Client Integration Tests
//!
//! Drives `MarketDataClient` against a local WebSocket gateway that records
//! every frame the client sends and lets each test push frames or close the
//! socket from the server side.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use market_data_stream::infrastructure::stream::{HeartbeatConfig, ReconnectConfig};
use market_data_stream::{
    ConnectionState, EventKind, MarketDataClient, StreamClientConfig, StreamClientError,
    StreamEvent, SubscribeOutcome, UnsubscribeOutcome,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const WAIT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(300);

// =============================================================================
// Mock Gateway
// =============================================================================

/// Local gateway accepting any number of WebSocket connections.
struct MockGateway {
    url: String,
    connections: mpsc::UnboundedReceiver<GatewayConnection>,
}

/// Server side of one accepted connection.
///
/// Dropping it drops the socket without a close handshake.
struct GatewayConnection {
    to_client: mpsc::UnboundedSender<Message>,
    from_client: mpsc::UnboundedReceiver<Message>,
}

impl MockGateway {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/api/v1/ws", listener.local_addr().unwrap());
        let (conn_tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                let (to_client, mut outbound) = mpsc::unbounded_channel::<Message>();
                let (inbound, from_client) = mpsc::unbounded_channel::<Message>();
                if conn_tx
                    .send(GatewayConnection {
                        to_client,
                        from_client,
                    })
                    .is_err()
                {
                    return;
                }

                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            message = outbound.recv() => match message {
                                Some(message) => {
                                    if write.send(message).await.is_err() {
                                        return;
                                    }
                                }
                                None => return,
                            },
                            frame = read.next() => match frame {
                                Some(Ok(message)) => {
                                    let _ = inbound.send(message);
                                }
                                _ => return,
                            },
                        }
                    }
                });
            }
        });

        Self { url, connections }
    }

    async fn next_connection(&mut self) -> GatewayConnection {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("gateway stopped")
    }

    async fn expect_no_connection(&mut self, window: Duration) {
        if let Ok(Some(_)) = timeout(window, self.connections.recv()).await {
            panic!("unexpected connection");
        }
    }
}

impl GatewayConnection {
    fn send_json(&self, value: &Value) {
        self.send_text(&value.to_string());
    }

    fn send_text(&self, text: &str) {
        self.to_client
            .send(Message::text(text.to_string()))
            .unwrap();
    }

    fn close(&self, code: u16, reason: &str) {
        self.to_client
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            })))
            .unwrap();
    }

    /// Next JSON text frame from the client.
    async fn next_json(&mut self) -> Value {
        loop {
            let message = timeout(WAIT, self.from_client.recv())
                .await
                .expect("timed out waiting for a client message")
                .expect("connection closed");
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Next JSON frame of the given type, skipping others.
    async fn next_of_type(&mut self, message_type: &str) -> Value {
        loop {
            let value = self.next_json().await;
            if value["type"] == message_type {
                return value;
            }
        }
    }

    /// Close code the client sent, if any.
    async fn next_close(&mut self) -> Option<u16> {
        loop {
            let message = timeout(WAIT, self.from_client.recv())
                .await
                .expect("timed out waiting for a close frame")?;
            if let Message::Close(frame) = message {
                return frame.map(|f| u16::from(f.code));
            }
        }
    }

    async fn expect_silence(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        loop {
            match timeout_at(deadline, self.from_client.recv()).await {
                Err(_) | Ok(None) => return,
                Ok(Some(Message::Text(text))) => panic!("unexpected message: {text}"),
                Ok(Some(_)) => {}
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn fast_config(url: &str) -> StreamClientConfig {
    StreamClientConfig {
        url: url.to_string(),
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 3,
        },
        heartbeat: HeartbeatConfig::default(),
    }
}

/// Forward every event of `kinds` into a channel, in dispatch order.
fn record(client: &MarketDataClient, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<StreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    for kind in kinds {
        let tx = tx.clone();
        client.add_listener(kind.clone(), move |event| {
            let _ = tx.send(event.clone());
        });
    }
    rx
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("listener dropped")
}

async fn connected(
    gateway: &mut MockGateway,
    config: StreamClientConfig,
) -> (MarketDataClient, GatewayConnection) {
    let client = MarketDataClient::new(config).unwrap();
    let attempt = client.connect();
    let conn = gateway.next_connection().await;
    timeout(WAIT, attempt.opened()).await.unwrap().unwrap();
    (client, conn)
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn test_queued_symbol_sent_once_on_open() {
    let mut gateway = MockGateway::start().await;
    let client = MarketDataClient::new(fast_config(&gateway.url)).unwrap();
    let mut events = record(&client, &[EventKind::Connected]);

    assert_eq!(client.subscribe("infy"), Some(SubscribeOutcome::Queued));
    assert_eq!(client.status().state, ConnectionState::Connecting);

    let mut conn = gateway.next_connection().await;
    assert_eq!(next_event(&mut events).await, StreamEvent::Connected);

    let message = conn.next_json().await;
    assert_eq!(message["type"], "subscribe");
    assert_eq!(message["symbol"], "INFY");
    assert!(message["timestamp"].is_i64());

    conn.expect_silence(QUIET).await;

    let status = client.status();
    assert!(status.is_connected);
    assert_eq!(status.subscribed_symbols, vec!["INFY".to_string()]);
    assert!(status.pending_symbols.is_empty());

    client.disconnect();
}

#[tokio::test]
async fn test_duplicate_subscribe_sends_one_message() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, mut conn) = connected(&mut gateway, config).await;

    assert_eq!(client.subscribe("TCS"), Some(SubscribeOutcome::Subscribed));
    assert_eq!(client.subscribe(" tcs "), Some(SubscribeOutcome::AlreadySubscribed));

    let message = conn.next_json().await;
    assert_eq!(message["type"], "subscribe");
    assert_eq!(message["symbol"], "TCS");
    conn.expect_silence(QUIET).await;

    client.disconnect();
}

#[tokio::test]
async fn test_unsubscribe_sends_only_for_tracked_symbols() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, mut conn) = connected(&mut gateway, config).await;

    client.subscribe("TCS");
    assert_eq!(conn.next_json().await["type"], "subscribe");

    assert_eq!(client.unsubscribe("tcs"), Some(UnsubscribeOutcome::Unsubscribed));
    let message = conn.next_json().await;
    assert_eq!(message["type"], "unsubscribe");
    assert_eq!(message["symbol"], "TCS");

    assert_eq!(client.unsubscribe("XYZ"), Some(UnsubscribeOutcome::NotTracked));
    conn.expect_silence(QUIET).await;
    assert!(client.status().subscribed_symbols.is_empty());

    client.disconnect();
}

// =============================================================================
// Inbound Dispatch
// =============================================================================

#[tokio::test]
async fn test_market_data_reaches_listeners() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Message, EventKind::MarketData]);

    conn.send_json(&json!({
        "type": "market_data",
        "symbol": "TCS",
        "data": {"price": 100, "change_percent": 1.5},
        "timestamp": "2024-01-15T10:00:00"
    }));

    let StreamEvent::Message(raw) = next_event(&mut events).await else {
        panic!("catch-all listener should run first");
    };
    assert_eq!(raw["symbol"], "TCS");

    let StreamEvent::MarketData(update) = next_event(&mut events).await else {
        panic!("expected market data");
    };
    assert_eq!(update.symbol, "TCS");
    assert_eq!(update.get("price"), Some(&json!(100)));
    assert_eq!(update.quote().unwrap().price, Decimal::from(100));

    client.disconnect();
}

#[tokio::test]
async fn test_panicking_listener_does_not_starve_others() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;

    client.add_listener(EventKind::MarketData, |_| panic!("listener bug"));
    let mut events = record(&client, &[EventKind::MarketData]);

    conn.send_json(&json!({"type": "market_data", "symbol": "TCS", "data": {"price": 100}}));
    assert!(matches!(
        next_event(&mut events).await,
        StreamEvent::MarketData(_)
    ));

    conn.send_json(&json!({"type": "market_data", "symbol": "INFY", "data": {"price": 1500}}));
    let StreamEvent::MarketData(update) = next_event(&mut events).await else {
        panic!("expected market data");
    };
    assert_eq!(update.symbol, "INFY");
    assert!(client.is_connected());

    client.disconnect();
}

#[tokio::test]
async fn test_non_object_frames_dispatch_nothing() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Message, EventKind::Error]);

    conn.send_text("not json");
    conn.send_text("[1, 2]");
    conn.send_json(&json!({"type": "pong", "timestamp": "2024-01-15T10:00:00"}));

    let StreamEvent::Message(raw) = next_event(&mut events).await else {
        panic!("expected the pong message");
    };
    assert_eq!(raw["type"], "pong");
    assert!(client.is_connected());

    client.disconnect();
}

#[tokio::test]
async fn test_server_error_message() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Error]);

    conn.send_json(&json!({
        "type": "error",
        "symbol": "XYZ",
        "message": "Failed to fetch market data",
        "code": 404
    }));

    let StreamEvent::Error(error) = next_event(&mut events).await else {
        panic!("expected an error event");
    };
    assert_eq!(error.message, "Failed to fetch market data");
    assert_eq!(error.code, Some(json!(404)));
    assert!(client.is_connected());

    client.disconnect();
}

#[tokio::test]
async fn test_custom_message_type_passes_through() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::from("portfolio_update")]);

    conn.send_json(&json!({"type": "portfolio_update", "value": 125_000}));

    let event = next_event(&mut events).await;
    assert_eq!(event.kind(), EventKind::Custom("portfolio_update".to_string()));
    assert_eq!(event.payload()["value"], 125_000);

    client.disconnect();
}

#[tokio::test]
async fn test_server_type_named_connected_reaches_string_listener() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::from("connected")]);

    conn.send_json(&json!({"type": "connected", "session": "abc"}));

    let StreamEvent::Custom { event_type, payload } = next_event(&mut events).await else {
        panic!("expected the pass-through message");
    };
    assert_eq!(event_type, "connected");
    assert_eq!(payload["session"], "abc");

    client.disconnect();
}

// =============================================================================
// Connection Lifecycle
// =============================================================================

#[tokio::test]
async fn test_disconnect_does_not_reconnect() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, mut conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Disconnected]);

    client.disconnect();

    let StreamEvent::Disconnected(info) = next_event(&mut events).await else {
        panic!("expected disconnected");
    };
    assert_eq!(info.code, 1000);
    assert_eq!(info.reason, "User initiated disconnect");
    assert_eq!(conn.next_close().await, Some(1000));

    gateway.expect_no_connection(QUIET).await;
    let status = client.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.reconnect_attempts, 0);
}

#[tokio::test]
async fn test_connect_replaces_open_session() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, mut first) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Connected, EventKind::Disconnected]);

    let attempt = client.connect();

    let StreamEvent::Disconnected(info) = next_event(&mut events).await else {
        panic!("expected disconnected");
    };
    assert_eq!(info.code, 1000);
    assert_eq!(first.next_close().await, Some(1000));

    let _second = gateway.next_connection().await;
    timeout(WAIT, attempt.opened()).await.unwrap().unwrap();
    assert_eq!(next_event(&mut events).await, StreamEvent::Connected);

    client.disconnect();
}

#[tokio::test]
async fn test_abnormal_close_reconnects_and_resubscribes() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, mut conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Connected, EventKind::Disconnected]);

    client.subscribe("TCS");
    assert_eq!(conn.next_json().await["symbol"], "TCS");

    drop(conn);

    let StreamEvent::Disconnected(info) = next_event(&mut events).await else {
        panic!("expected disconnected");
    };
    assert_eq!(info.code, 1006);

    let mut conn = gateway.next_connection().await;
    assert_eq!(next_event(&mut events).await, StreamEvent::Connected);

    let message = conn.next_of_type("subscribe").await;
    assert_eq!(message["symbol"], "TCS");
    conn.expect_silence(QUIET).await;

    let status = client.status();
    assert!(status.is_connected);
    assert_eq!(status.reconnect_attempts, 0);
    assert_eq!(status.subscribed_symbols, vec!["TCS".to_string()]);

    client.disconnect();
}

#[tokio::test]
async fn test_normal_server_close_does_not_reconnect() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Disconnected]);

    conn.close(1000, "server shutdown");

    let StreamEvent::Disconnected(info) = next_event(&mut events).await else {
        panic!("expected disconnected");
    };
    assert_eq!(info.code, 1000);
    assert_eq!(info.reason, "server shutdown");

    gateway.expect_no_connection(QUIET).await;
    assert_eq!(client.status().state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_server_going_away_reconnects() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Disconnected]);

    conn.close(1001, "restarting");

    let StreamEvent::Disconnected(info) = next_event(&mut events).await else {
        panic!("expected disconnected");
    };
    assert_eq!(info.code, 1001);

    let _conn = gateway.next_connection().await;
    client.disconnect();
}

#[tokio::test]
async fn test_reconnect_exhaustion_against_closed_port() {
    let url = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("ws://{}/api/v1/ws", listener.local_addr().unwrap())
    };

    let mut config = fast_config(&url);
    config.reconnect.initial_delay = Duration::from_millis(20);
    config.reconnect.max_attempts = 2;

    let client = MarketDataClient::new(config).unwrap();
    let disconnects = Arc::new(AtomicUsize::new(0));
    let seen = disconnects.clone();
    client.add_listener(EventKind::Disconnected, move |event| {
        if let StreamEvent::Disconnected(info) = event {
            assert_eq!(info.code, 1006);
        }
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let mut failures = record(&client, &[EventKind::ReconnectFailed]);
    let mut errors = record(&client, &[EventKind::Error]);

    let result = timeout(WAIT, client.connect().opened()).await.unwrap();
    assert!(matches!(result, Err(StreamClientError::ConnectionFailed(_))));
    assert!(matches!(next_event(&mut errors).await, StreamEvent::Error(_)));

    assert_eq!(
        next_event(&mut failures).await,
        StreamEvent::ReconnectFailed { attempts: 2 }
    );
    assert_eq!(disconnects.load(Ordering::SeqCst), 3);

    let status = client.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.reconnect_attempts, 2);

    // Exhausted: a queued subscribe no longer starts a connection.
    assert_eq!(client.subscribe("TCS"), Some(SubscribeOutcome::Queued));
    assert_eq!(client.status().state, ConnectionState::Disconnected);
}

// =============================================================================
// Heartbeat
// =============================================================================

#[tokio::test]
async fn test_heartbeat_sends_ping() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config(&gateway.url);
    config.heartbeat = HeartbeatConfig::new(Duration::from_millis(100), Duration::from_secs(10));
    let (client, mut conn) = connected(&mut gateway, config).await;

    let ping = conn.next_json().await;
    assert_eq!(ping["type"], "ping");
    assert!(ping["timestamp"].is_i64());

    client.disconnect();
}

#[tokio::test]
async fn test_pong_updates_last_pong() {
    let mut gateway = MockGateway::start().await;
    let config = fast_config(&gateway.url);
    let (client, conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Pong]);
    assert!(client.status().last_pong.is_none());

    conn.send_json(&json!({"type": "pong", "timestamp": "2024-01-15T10:00:00"}));

    let StreamEvent::Pong { timestamp } = next_event(&mut events).await else {
        panic!("expected pong");
    };
    assert_eq!(timestamp, Some(json!("2024-01-15T10:00:00")));
    assert!(client.status().last_pong.is_some());

    client.disconnect();
}

#[tokio::test]
async fn test_heartbeat_timeout_reconnects() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config(&gateway.url);
    config.heartbeat = HeartbeatConfig::new(Duration::from_millis(50), Duration::from_millis(120));
    let (client, mut conn) = connected(&mut gateway, config).await;
    let mut events = record(&client, &[EventKind::Disconnected]);

    assert_eq!(conn.next_close().await, Some(4000));

    let StreamEvent::Disconnected(info) = next_event(&mut events).await else {
        panic!("expected disconnected");
    };
    assert_eq!(info.code, 4000);
    assert!(info.reason.starts_with("heartbeat timeout"));

    let _conn = gateway.next_connection().await;
    client.disconnect();
}

#[tokio::test]
async fn test_answered_pings_keep_session_alive() {
    let mut gateway = MockGateway::start().await;
    let mut config = fast_config(&gateway.url);
    config.heartbeat = HeartbeatConfig::new(Duration::from_millis(50), Duration::from_millis(120));
    let (client, mut conn) = connected(&mut gateway, config).await;

    for _ in 0..6 {
        let ping = conn.next_of_type("ping").await;
        conn.send_json(&json!({"type": "pong", "timestamp": ping["timestamp"]}));
    }

    assert!(client.is_connected());
    gateway.expect_no_connection(Duration::from_millis(50)).await;

    client.disconnect();
}
