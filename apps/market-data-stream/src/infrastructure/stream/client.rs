//! Market Data Stream Client
//!
//! Keeps one WebSocket session to the market data gateway, tracks symbol
//! subscriptions across reconnects, and fans inbound messages out to
//! listeners.
//!
//! # Stream URL
//!
//! `{ws|wss}://{host}:{port}/api/v1/ws` (see `EndpointSettings::url`).
//!
//! # Sessions
//!
//! Every `connect()` (user-initiated or scheduled reconnect) starts a new
//! session with its own generation number, cancellation token and outbound
//! queue. All state transitions happen under one lock and first check that
//! the calling session is still the current one, so a superseded socket can
//! never change state or emit events.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;

use super::codec::JsonCodec;
use super::heartbeat::{
    HeartbeatConfig, HeartbeatError, HeartbeatEvent, HeartbeatManager, HeartbeatState,
};
use super::lifecycle::{CloseDecision, ConnectionLifecycle};
use super::messages::ClientMessage;
use super::reconnect::ReconnectConfig;
use super::router::MessageRouter;
use crate::application::ports::{Clock, SystemClock, to_datetime};
use crate::application::services::{ListenerHandle, ListenerId, ListenerRegistry};
use crate::domain::connection::{
    ABNORMAL_CLOSURE, ConnectionState, HEARTBEAT_TIMEOUT, NO_STATUS_RECEIVED, NORMAL_CLOSURE,
    USER_DISCONNECT_REASON,
};
use crate::domain::events::{CloseInfo, ErrorEvent, EventKind, StreamEvent};
use crate::domain::subscription::{
    SubscribeOutcome, SubscriptionBook, Symbol, UnsubscribeOutcome,
};
use crate::infrastructure::config::StreamConfig;
use crate::infrastructure::metrics;

const CLOSE_SEND_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// Error Type
// =============================================================================

/// Errors surfaced by the stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// The client was created outside a Tokio runtime.
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// The WebSocket could not be established.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// A later `connect()` or `disconnect()` replaced this attempt.
    #[error("connection attempt superseded")]
    Superseded,
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the stream client.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// WebSocket URL.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
}

impl StreamClientConfig {
    /// Create a configuration with default reconnect and heartbeat behavior.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Create configuration from the loaded `StreamConfig`.
    #[must_use]
    pub fn from_stream_config(config: &StreamConfig) -> Self {
        Self {
            url: config.endpoint.url(),
            reconnect: ReconnectConfig::from_websocket_settings(&config.websocket),
            heartbeat: HeartbeatConfig::from_websocket_settings(&config.websocket),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Point-in-time view of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    /// Whether the socket is open.
    pub is_connected: bool,
    /// Connection state.
    pub state: ConnectionState,
    /// Subscribed symbols, sorted.
    pub subscribed_symbols: Vec<String>,
    /// Symbols waiting for the connection to open, sorted.
    pub pending_symbols: Vec<String>,
    /// Reconnect attempts since the last successful open.
    pub reconnect_attempts: u32,
    /// When the last `pong` arrived.
    pub last_pong: Option<DateTime<Utc>>,
}

// =============================================================================
// Connect Attempt
// =============================================================================

type OpenWaiter = oneshot::Sender<Result<(), StreamClientError>>;

/// Handle to one `connect()` call.
///
/// Dropping it is fine; the connection proceeds either way.
#[derive(Debug)]
pub struct ConnectAttempt {
    rx: oneshot::Receiver<Result<(), StreamClientError>>,
}

impl ConnectAttempt {
    /// Wait until this session opens.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the socket could not be established and
    /// `Superseded` if another `connect()` or `disconnect()` replaced the
    /// session before it opened.
    pub async fn opened(self) -> Result<(), StreamClientError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(StreamClientError::Superseded))
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct SessionHandle {
    generation: u64,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<ClientMessage>,
}

struct ScheduledReconnect {
    id: u64,
    cancel: CancellationToken,
}

struct ClientState {
    lifecycle: ConnectionLifecycle,
    book: SubscriptionBook,
    next_id: u64,
    session: Option<SessionHandle>,
    reconnect: Option<ScheduledReconnect>,
    last_pong: Option<DateTime<Utc>>,
}

impl ClientState {
    fn new(reconnect: ReconnectConfig) -> Self {
        Self {
            lifecycle: ConnectionLifecycle::new(reconnect),
            book: SubscriptionBook::new(),
            next_id: 0,
            session: None,
            reconnect: None,
            last_pong: None,
        }
    }

    const fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.generation == generation)
    }

    fn is_open(&self) -> bool {
        self.lifecycle.is_connected() && self.session.is_some()
    }

    fn should_auto_connect(&self) -> bool {
        self.lifecycle.state() == ConnectionState::Disconnected
            && self.session.is_none()
            && self.reconnect.is_none()
            && self.lifecycle.can_retry()
    }

    fn queue(&self, message: ClientMessage) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.outbound.send(message).is_ok())
    }

    fn cancel_reconnect(&mut self) {
        if let Some(scheduled) = self.reconnect.take() {
            scheduled.cancel.cancel();
        }
    }

    fn teardown_session(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    config: StreamClientConfig,
    router: MessageRouter,
    codec: JsonCodec,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    listeners: ListenerRegistry,
    state: Mutex<ClientState>,
}

impl Inner {
    fn emit(&self, event: &StreamEvent) {
        let report = self.listeners.notify(event);
        metrics::record_listener_panics(report.panicked);
    }
}

// =============================================================================
// Market Data Client
// =============================================================================

/// Reconnecting market data stream client.
///
/// Cloning is cheap and shares the same connection. Sessions and reconnect
/// timers run as Tokio tasks until `disconnect()` is called.
///
/// # Example
///
/// ```rust,no_run
/// use market_data_stream::domain::events::{EventKind, StreamEvent};
/// use market_data_stream::infrastructure::stream::{MarketDataClient, StreamClientConfig};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let client = MarketDataClient::new(StreamClientConfig::new("ws://localhost:8000/api/v1/ws"))?;
///
///     client.add_listener(EventKind::MarketData, |event| {
///         if let StreamEvent::MarketData(update) = event {
///             println!("{} {:?}", update.symbol, update.get("price"));
///         }
///     });
///
///     client.subscribe("tcs");
///     client.connect().opened().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MarketDataClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MarketDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataClient")
            .field("url", &self.inner.config.url)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl MarketDataClient {
    /// Create a client that stamps messages with the system clock.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` when called outside a Tokio runtime.
    pub fn new(config: StreamClientConfig) -> Result<Self, StreamClientError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` when called outside a Tokio runtime.
    pub fn with_clock(
        config: StreamClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StreamClientError> {
        let runtime = Handle::try_current()?;
        let state = ClientState::new(config.reconnect.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                router: MessageRouter::new(),
                codec: JsonCodec::new(),
                clock,
                runtime,
                listeners: ListenerRegistry::new(),
                state: Mutex::new(state),
            }),
        })
    }

    /// The configured WebSocket URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    // -------------------------------------------------------------------------
    // Connection management
    // -------------------------------------------------------------------------

    /// Open a new session, replacing any existing one.
    ///
    /// A scheduled reconnect is cancelled. If a session was open or opening,
    /// listeners see `disconnected` (1000) before the new session starts.
    pub fn connect(&self) -> ConnectAttempt {
        let (tx, rx) = oneshot::channel();

        let had_session = self.inner.state.lock().teardown_session();
        if had_session {
            self.emit_user_disconnect();
        }

        let session = {
            let mut state = self.inner.state.lock();
            state.cancel_reconnect();
            state.teardown_session();
            self.open_session(&mut state, Some(tx))
        };
        self.inner.runtime.spawn(session);

        ConnectAttempt { rx }
    }

    /// Close the connection without reconnecting.
    pub fn disconnect(&self) {
        let had_session = {
            let mut state = self.inner.state.lock();
            state.cancel_reconnect();
            state.lifecycle.mark_disconnected();
            state.teardown_session()
        };

        if had_session {
            self.emit_user_disconnect();
        }
    }

    fn emit_user_disconnect(&self) {
        metrics::set_connection_up(false);
        tracing::info!("Disconnected from market data stream");
        self.inner.emit(&StreamEvent::Disconnected(CloseInfo::new(
            NORMAL_CLOSURE,
            USER_DISCONNECT_REASON,
        )));
    }

    /// Register a session in `state` and return the task that drives it.
    fn open_session(
        &self,
        state: &mut ClientState,
        waiter: Option<OpenWaiter>,
    ) -> impl Future<Output = ()> + Send + use<> {
        let generation = state.next_id();
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        state.session = Some(SessionHandle {
            generation,
            cancel: cancel.clone(),
            outbound: outbound_tx,
        });
        state.lifecycle.begin_connect();

        let client = self.clone();
        async move {
            client
                .run_session(generation, cancel, outbound_rx, waiter)
                .await;
        }
    }

    async fn run_session(
        self,
        generation: u64,
        cancel: CancellationToken,
        mut outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
        waiter: Option<OpenWaiter>,
    ) {
        let url = self.inner.config.url.clone();
        tracing::info!(url = %url, generation, "Connecting to market data stream");

        let connected = tokio::select! {
            () = cancel.cancelled() => return,
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
        };

        let ws_stream = match connected {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Market data stream connection failed");
                if !self.is_current(generation) {
                    return;
                }
                self.inner
                    .emit(&StreamEvent::Error(ErrorEvent::transport(e.to_string())));
                if let Some(waiter) = waiter {
                    let _ = waiter.send(Err(StreamClientError::ConnectionFailed(e.to_string())));
                }
                self.handle_close(generation, ABNORMAL_CLOSURE, e.to_string());
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        if !self.handle_open(generation) {
            let frame = close_frame(NORMAL_CLOSURE, USER_DISCONNECT_REASON);
            let _ = tokio::time::timeout(CLOSE_SEND_TIMEOUT, write.send(Message::Close(Some(frame))))
                .await;
            return;
        }
        if let Some(waiter) = waiter {
            let _ = waiter.send(Ok(()));
        }

        // Heartbeat stops with the session.
        let heartbeat_state = Arc::new(HeartbeatState::new());
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel::<HeartbeatEvent>(8);
        let heartbeat_cancel = cancel.child_token();
        let _heartbeat_guard = heartbeat_cancel.clone().drop_guard();
        self.inner.runtime.spawn(
            HeartbeatManager::new(
                self.inner.config.heartbeat.clone(),
                heartbeat_state.clone(),
                heartbeat_tx,
                heartbeat_cancel,
            )
            .run(),
        );

        let (code, reason) = loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    let frame = close_frame(NORMAL_CLOSURE, USER_DISCONNECT_REASON);
                    let _ = tokio::time::timeout(
                        CLOSE_SEND_TIMEOUT,
                        write.send(Message::Close(Some(frame))),
                    )
                    .await;
                    return;
                }
                Some(message) = outbound_rx.recv() => {
                    self.send_message(&mut write, &message).await;
                }
                Some(event) = heartbeat_rx.recv() => match event {
                    HeartbeatEvent::SendPing => {
                        heartbeat_state.mark_ping_sent();
                        let ping = ClientMessage::ping(self.inner.clock.as_ref());
                        self.send_message(&mut write, &ping).await;
                    }
                    HeartbeatEvent::Timeout => {
                        let reason =
                            HeartbeatError::Timeout(self.inner.config.heartbeat.pong_timeout)
                                .to_string();
                        tracing::warn!(reason = %reason, "Closing unresponsive session");
                        let frame = close_frame(HEARTBEAT_TIMEOUT, reason.clone());
                        let _ = tokio::time::timeout(
                            CLOSE_SEND_TIMEOUT,
                            write.send(Message::Close(Some(frame))),
                        )
                        .await;
                        break (HEARTBEAT_TIMEOUT, reason);
                    }
                },
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_text(generation, text.as_str(), &heartbeat_state);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        heartbeat_state.record_pong();
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (NO_STATUS_RECEIVED, String::new()),
                            |f| (u16::from(f.code), f.reason.to_string()),
                        );
                        tracing::info!(code, reason = %reason, "Server sent close frame");
                        break (code, reason);
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(bytes = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Market data stream error");
                        if self.is_current(generation) {
                            self.inner
                                .emit(&StreamEvent::Error(ErrorEvent::transport(e.to_string())));
                        }
                        break (ABNORMAL_CLOSURE, e.to_string());
                    }
                    None => {
                        tracing::info!("Market data stream ended");
                        break (ABNORMAL_CLOSURE, String::new());
                    }
                },
            }
        };

        self.handle_close(generation, code, reason);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.lock().is_current(generation)
    }

    /// Mark the session open and queue the resubscription pass.
    ///
    /// Returns `false` if the session was superseded while connecting.
    fn handle_open(&self, generation: u64) -> bool {
        let resubscribed = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return false;
            }

            state.lifecycle.on_open();
            let symbols = state.book.flush_on_open();
            for symbol in &symbols {
                let _ = state.queue(ClientMessage::subscribe(symbol, self.inner.clock.as_ref()));
            }
            metrics::set_subscribed_symbols(state.book.subscribed_count());
            symbols.len()
        };

        metrics::set_connection_up(true);
        tracing::info!(generation, resubscribed, "Connected to market data stream");
        self.inner.emit(&StreamEvent::Connected);
        true
    }

    fn handle_text(&self, generation: u64, text: &str, heartbeat: &HeartbeatState) {
        let started = std::time::Instant::now();

        let events = match self.inner.router.route(text) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable message");
                metrics::record_decode_error();
                return;
            }
        };

        if let Some(StreamEvent::Message(raw)) = events.first() {
            let message_type = raw.get("type").and_then(serde_json::Value::as_str);
            tracing::debug!(message_type = ?message_type, "Received message");
            metrics::record_message_received(message_type.unwrap_or_default());
        }

        let is_pong = events
            .iter()
            .any(|event| matches!(event, StreamEvent::Pong { .. }));

        {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return;
            }
            if is_pong {
                heartbeat.record_pong();
                state.last_pong = to_datetime(self.inner.clock.now_millis());
            }
        }

        for event in &events {
            self.inner.emit(event);
        }
        metrics::record_dispatch_duration(started.elapsed());
    }

    /// Run the close path for `generation`.
    fn handle_close(&self, generation: u64, code: u16, reason: String) {
        let decision = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return;
            }

            state.session = None;
            let decision = state.lifecycle.on_close(code);
            if let CloseDecision::Reconnect { attempt, delay } = decision {
                self.schedule_reconnect(&mut state, attempt, delay);
            }
            decision
        };

        metrics::set_connection_up(false);
        tracing::info!(code, reason = %reason, "Disconnected from market data stream");
        self.inner
            .emit(&StreamEvent::Disconnected(CloseInfo::new(code, reason)));

        if let CloseDecision::Exhausted { attempts } = decision {
            tracing::error!(attempts, "Market data stream reconnect attempts exhausted");
            metrics::record_reconnect_exhausted();
            self.inner.emit(&StreamEvent::ReconnectFailed { attempts });
        }
    }

    fn schedule_reconnect(&self, state: &mut ClientState, attempt: u32, delay: Duration) {
        let id = state.next_id();
        let cancel = CancellationToken::new();
        state.reconnect = Some(ScheduledReconnect {
            id,
            cancel: cancel.clone(),
        });

        tracing::info!(
            attempt,
            delay_ms = delay.as_millis(),
            "Reconnecting to market data stream"
        );
        metrics::record_reconnect();

        let client = self.clone();
        self.inner.runtime.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => client.fire_reconnect(id),
            }
        });
    }

    fn fire_reconnect(&self, id: u64) {
        let session = {
            let mut state = self.inner.state.lock();
            if state.reconnect.as_ref().map(|scheduled| scheduled.id) != Some(id) {
                return;
            }
            state.reconnect = None;
            self.open_session(&mut state, None)
        };
        self.inner.runtime.spawn(session);
    }

    async fn send_message<W>(&self, write: &mut W, message: &ClientMessage)
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let message_type = message.message_type();
        let json = match self.inner.codec.encode(message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(message_type, error = %e, "Failed to encode message");
                return;
            }
        };

        match write.send(Message::Text(json.into())).await {
            Ok(()) => {
                tracing::debug!(message_type, "Sent message");
                metrics::record_message_sent(message_type);
            }
            Err(e) => {
                tracing::warn!(message_type, error = %e, "Failed to send message");
                self.inner.emit(&StreamEvent::Error(ErrorEvent::transport(format!(
                    "failed to send {message_type}: {e}"
                ))));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Subscribe to a symbol.
    ///
    /// Returns `None` for a blank symbol. While disconnected the symbol is
    /// queued and, if nothing else is connecting or scheduled, a connection
    /// is started.
    pub fn subscribe(&self, symbol: &str) -> Option<SubscribeOutcome> {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring subscribe request");
                return None;
            }
        };

        let mut auto_connect = None;
        let outcome = {
            let mut state = self.inner.state.lock();
            let connected = state.is_open();
            let mut outcome = state.book.subscribe(symbol.clone(), connected);

            match outcome {
                SubscribeOutcome::Subscribed => {
                    let message = ClientMessage::subscribe(&symbol, self.inner.clock.as_ref());
                    if !state.queue(message) {
                        state.book.requeue(symbol.clone());
                        outcome = SubscribeOutcome::Queued;
                    }
                }
                SubscribeOutcome::Queued => {
                    if state.should_auto_connect() {
                        auto_connect = Some(self.open_session(&mut state, None));
                    }
                }
                SubscribeOutcome::AlreadySubscribed => {}
            }

            metrics::set_subscribed_symbols(state.book.subscribed_count());
            outcome
        };

        tracing::debug!(symbol = %symbol, outcome = ?outcome, "Subscribe requested");
        if let Some(session) = auto_connect {
            tracing::info!(symbol = %symbol, "Connecting for queued subscription");
            self.inner.runtime.spawn(session);
        }

        Some(outcome)
    }

    /// Unsubscribe from a symbol.
    ///
    /// Returns `None` for a blank symbol. An `unsubscribe` message is sent
    /// only when the symbol was subscribed on an open connection.
    pub fn unsubscribe(&self, symbol: &str) -> Option<UnsubscribeOutcome> {
        let symbol = match Symbol::parse(symbol) {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unsubscribe request");
                return None;
            }
        };

        let outcome = {
            let mut state = self.inner.state.lock();
            let connected = state.is_open();
            let outcome = state.book.unsubscribe(&symbol, connected);

            if outcome == UnsubscribeOutcome::Unsubscribed {
                let message = ClientMessage::unsubscribe(&symbol, self.inner.clock.as_ref());
                if !state.queue(message) {
                    tracing::debug!(symbol = %symbol, "Session closing, unsubscribe not sent");
                }
            }

            metrics::set_subscribed_symbols(state.book.subscribed_count());
            outcome
        };

        tracing::debug!(symbol = %symbol, outcome = ?outcome, "Unsubscribe requested");
        Some(outcome)
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register a listener for an event kind.
    pub fn add_listener<K, F>(&self, kind: K, callback: F) -> ListenerHandle
    where
        K: Into<EventKind>,
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(kind.into(), callback)
    }

    /// Unregister a listener.
    ///
    /// Returns `true` if it was registered.
    pub fn remove_listener(&self, kind: &EventKind, id: ListenerId) -> bool {
        self.inner.listeners.remove(kind, id)
    }

    /// The listener registry.
    #[must_use]
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Snapshot of the connection and subscriptions.
    #[must_use]
    pub fn status(&self) -> ClientStatus {
        let state = self.inner.state.lock();
        ClientStatus {
            is_connected: state.is_open(),
            state: state.lifecycle.state(),
            subscribed_symbols: state.book.subscribed(),
            pending_symbols: state.book.pending(),
            reconnect_attempts: state.lifecycle.attempts(),
            last_pong: state.last_pong,
        }
    }

    /// Whether the socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().is_open()
    }
}

fn close_frame(code: u16, reason: impl Into<Utf8Bytes>) -> CloseFrame {
    CloseFrame {
        code: CloseCode::from(code),
        reason: reason.into(),
    }
}
