//! Stream Events
//!
//! Events the client delivers to registered listeners.
//!
//! Known event names form the closed `EventKind` enum. Server-defined
//! message types that the client does not interpret pass through as
//! `EventKind::Custom`.
//!
//! Every event also has a JSON payload view (`StreamEvent::payload`) that
//! matches what UI code consumes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// =============================================================================
// Event Kind
// =============================================================================

/// Name of an event listeners can register for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The socket opened.
    Connected,
    /// The socket closed.
    Disconnected,
    /// Transport or server-reported error.
    Error,
    /// Reconnect attempts ran out.
    ReconnectFailed,
    /// Catch-all: every valid inbound message.
    Message,
    /// Market data update for a symbol.
    MarketData,
    /// Server confirmed a subscription.
    Subscribed,
    /// Server confirmed an unsubscription.
    Unsubscribed,
    /// Server answered a ping.
    Pong,
    /// Any other server-defined message type.
    Custom(String),
}

impl EventKind {
    /// Get the wire name of the event.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::ReconnectFailed => "reconnect_failed",
            Self::Message => "message",
            Self::MarketData => "market_data",
            Self::Subscribed => "subscribed",
            Self::Unsubscribed => "unsubscribed",
            Self::Pong => "pong",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "connected" => Self::Connected,
            "disconnected" => Self::Disconnected,
            "error" => Self::Error,
            "reconnect_failed" => Self::ReconnectFailed,
            "message" => Self::Message,
            "market_data" => Self::MarketData,
            "subscribed" => Self::Subscribed,
            "unsubscribed" => Self::Unsubscribed,
            "pong" => Self::Pong,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Custom(_) => Self::Custom(name),
            known => known,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event Payloads
// =============================================================================

/// Close code and reason of a finished connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseInfo {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Create close info.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Where an error event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    /// Socket-level failure.
    Transport,
    /// `error` message sent by the server.
    Server,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    /// Where the error came from.
    pub origin: ErrorOrigin,
    /// Human-readable message.
    pub message: String,
    /// Server error code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    /// Server error details, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEvent {
    /// Create a transport error event.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            origin: ErrorOrigin::Transport,
            message: message.into(),
            code: None,
            details: None,
        }
    }

    /// Create a server error event.
    #[must_use]
    pub fn server(message: impl Into<String>, code: Option<Value>, details: Option<Value>) -> Self {
        Self {
            origin: ErrorOrigin::Server,
            message: message.into(),
            code,
            details,
        }
    }
}

/// A `market_data` update: the symbol plus the fields of its data payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataUpdate {
    /// Symbol the update is for.
    pub symbol: String,
    /// Fields of the `data` object, as sent by the server.
    pub fields: Map<String, Value>,
}

impl MarketDataUpdate {
    /// Create an update.
    #[must_use]
    pub const fn new(symbol: String, fields: Map<String, Value>) -> Self {
        Self { symbol, fields }
    }

    /// Get a single data field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Symbol merged with the data fields. Data fields win on collision.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut merged = Map::with_capacity(self.fields.len() + 1);
        merged.insert("symbol".to_owned(), Value::String(self.symbol.clone()));
        merged.extend(self.fields.clone());
        Value::Object(merged)
    }

    /// Decode the gateway's quote fields into a typed snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if `price` is missing or any field has the wrong type.
    pub fn quote(&self) -> Result<QuoteSnapshot, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// Typed view of the quote fields the market data gateway publishes.
///
/// # Wire Format (JSON)
/// ```json
/// {"price": 3850.5, "change": 12.5, "change_percent": 0.33, "volume": 120000,
///  "high": 3861.0, "low": 3822.0, "open": 3830.0, "previous_close": 3838.0}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Last traded price.
    pub price: Decimal,
    /// Absolute change from previous close.
    #[serde(default)]
    pub change: Option<Decimal>,
    /// Percent change from previous close.
    #[serde(default)]
    pub change_percent: Option<Decimal>,
    /// Session volume.
    #[serde(default)]
    pub volume: Option<u64>,
    /// Session high.
    #[serde(default)]
    pub high: Option<Decimal>,
    /// Session low.
    #[serde(default)]
    pub low: Option<Decimal>,
    /// Session open.
    #[serde(default)]
    pub open: Option<Decimal>,
    /// Previous session close.
    #[serde(default)]
    pub previous_close: Option<Decimal>,
}

// =============================================================================
// Stream Event
// =============================================================================

/// An event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The socket opened and subscriptions were re-sent.
    Connected,
    /// The socket closed.
    Disconnected(CloseInfo),
    /// Transport or server-reported error.
    Error(ErrorEvent),
    /// Reconnect attempts were exhausted.
    ReconnectFailed {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// Raw inbound message (catch-all).
    Message(Value),
    /// Market data update.
    MarketData(MarketDataUpdate),
    /// Subscription confirmed by the server.
    Subscribed {
        /// Confirmed symbol.
        symbol: String,
    },
    /// Unsubscription confirmed by the server.
    Unsubscribed {
        /// Confirmed symbol.
        symbol: String,
    },
    /// Heartbeat answer.
    Pong {
        /// Server timestamp, as sent.
        timestamp: Option<Value>,
    },
    /// Server-defined message type passed through verbatim.
    Custom {
        /// The message `type` field.
        event_type: String,
        /// The full message.
        payload: Value,
    },
}

impl StreamEvent {
    /// The kind listeners register for to receive this event.
    ///
    /// A pass-through message is delivered under the kind its `type` names,
    /// even when that name is one the client also emits itself.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Disconnected(_) => EventKind::Disconnected,
            Self::Error(_) => EventKind::Error,
            Self::ReconnectFailed { .. } => EventKind::ReconnectFailed,
            Self::Message(_) => EventKind::Message,
            Self::MarketData(_) => EventKind::MarketData,
            Self::Subscribed { .. } => EventKind::Subscribed,
            Self::Unsubscribed { .. } => EventKind::Unsubscribed,
            Self::Pong { .. } => EventKind::Pong,
            Self::Custom { event_type, .. } => EventKind::from(event_type.as_str()),
        }
    }

    /// JSON payload of the event.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Connected => json!({}),
            Self::Disconnected(info) => json!({ "code": info.code, "reason": info.reason }),
            Self::Error(error) => serde_json::to_value(error).unwrap_or(Value::Null),
            Self::ReconnectFailed { attempts } => json!({ "attempts": attempts }),
            Self::Message(raw) | Self::Custom { payload: raw, .. } => raw.clone(),
            Self::MarketData(update) => update.to_value(),
            Self::Subscribed { symbol } | Self::Unsubscribed { symbol } => {
                json!({ "symbol": symbol })
            }
            Self::Pong { timestamp } => json!({ "timestamp": timestamp }),
        }
    }
}
