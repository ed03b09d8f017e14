//! Market Data Gateway Message Types
//!
//! Wire format types for the JSON messages exchanged with the market data
//! gateway at `/api/v1/ws`.
//!
//! # Message Types
//!
//! ## Client → Server
//! - `subscribe`: Start streaming a symbol
//! - `unsubscribe`: Stop streaming a symbol
//! - `ping`: Heartbeat probe
//!
//! ## Server → Client
//! - `market_data`: Quote update for a symbol
//! - `error`: Server-side failure (bad request, data fetch failure)
//! - `pong`: Heartbeat answer
//! - `subscribed` / `unsubscribed`: Subscription confirmations
//! - anything else: passed through by `type`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::ports::Clock;
use crate::domain::subscription::Symbol;

// =============================================================================
// Client Messages
// =============================================================================

/// Message sent by the client.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "subscribe", "symbol": "TCS", "timestamp": 1700000000000}
/// {"type": "unsubscribe", "symbol": "TCS", "timestamp": 1700000000000}
/// {"type": "ping", "timestamp": 1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start streaming a symbol.
    Subscribe {
        /// Normalized symbol.
        symbol: String,
        /// Epoch milliseconds.
        timestamp: i64,
    },
    /// Stop streaming a symbol.
    Unsubscribe {
        /// Normalized symbol.
        symbol: String,
        /// Epoch milliseconds.
        timestamp: i64,
    },
    /// Heartbeat probe.
    Ping {
        /// Epoch milliseconds.
        timestamp: i64,
    },
}

impl ClientMessage {
    /// Create a subscribe message stamped by the clock.
    #[must_use]
    pub fn subscribe(symbol: &Symbol, clock: &dyn Clock) -> Self {
        Self::Subscribe {
            symbol: symbol.as_str().to_owned(),
            timestamp: clock.now_millis(),
        }
    }

    /// Create an unsubscribe message stamped by the clock.
    #[must_use]
    pub fn unsubscribe(symbol: &Symbol, clock: &dyn Clock) -> Self {
        Self::Unsubscribe {
            symbol: symbol.as_str().to_owned(),
            timestamp: clock.now_millis(),
        }
    }

    /// Create a ping message stamped by the clock.
    #[must_use]
    pub fn ping(clock: &dyn Clock) -> Self {
        Self::Ping {
            timestamp: clock.now_millis(),
        }
    }

    /// Wire name of the message type.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Ping { .. } => "ping",
        }
    }
}

// =============================================================================
// Server Messages
// =============================================================================

/// `market_data` message.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "market_data", "symbol": "TCS", "data": {"price": 3850.5}, "timestamp": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketDataMessage {
    /// Symbol of the update.
    pub symbol: String,
    /// Quote fields.
    pub data: Map<String, Value>,
}

/// Message received from the server, classified by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Market data update.
    MarketData(MarketDataMessage),
    /// Server-reported error.
    Error {
        /// Message text (`message`, else `error`, else `Unknown error`).
        message: String,
        /// Error code, if any.
        code: Option<Value>,
        /// Error details, if any.
        details: Option<Value>,
    },
    /// Heartbeat answer.
    Pong {
        /// Server timestamp, as sent.
        timestamp: Option<Value>,
    },
    /// Subscription confirmation.
    Subscribed {
        /// Confirmed symbol.
        symbol: String,
    },
    /// Unsubscription confirmation.
    Unsubscribed {
        /// Confirmed symbol.
        symbol: String,
    },
    /// Any other message type.
    Other {
        /// The `type` field.
        message_type: String,
    },
}

/// Reasons a decoded JSON object is not a usable server message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// No string `type` field.
    #[error("message has no usable type")]
    MissingType,
    /// `market_data` without a symbol or data object.
    #[error("invalid market_data message: {0}")]
    InvalidMarketData(String),
    /// Confirmation without a symbol.
    #[error("{0} message has no symbol")]
    MissingSymbol(String),
}

impl ServerMessage {
    /// Classify a decoded JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the `type` is missing or a known type is
    /// missing required fields.
    pub fn classify(raw: &Value) -> Result<Self, MessageError> {
        let message_type = raw
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(MessageError::MissingType)?;

        match message_type {
            "market_data" => {
                let message: MarketDataMessage = serde_json::from_value(raw.clone())
                    .map_err(|e| MessageError::InvalidMarketData(e.to_string()))?;
                if message.symbol.is_empty() {
                    return Err(MessageError::InvalidMarketData(
                        "empty symbol".to_string(),
                    ));
                }
                Ok(Self::MarketData(message))
            }
            "error" => Ok(Self::Error {
                message: non_empty_str(raw, "message")
                    .or_else(|| non_empty_str(raw, "error"))
                    .unwrap_or("Unknown error")
                    .to_owned(),
                code: present(raw, "code"),
                details: present(raw, "details"),
            }),
            "pong" => Ok(Self::Pong {
                timestamp: present(raw, "timestamp"),
            }),
            "subscribed" | "unsubscribed" => {
                let symbol = non_empty_str(raw, "symbol")
                    .ok_or_else(|| MessageError::MissingSymbol(message_type.to_owned()))?
                    .to_owned();
                if message_type == "subscribed" {
                    Ok(Self::Subscribed { symbol })
                } else {
                    Ok(Self::Unsubscribed { symbol })
                }
            }
            other => Ok(Self::Other {
                message_type: other.to_owned(),
            }),
        }
    }
}

fn non_empty_str<'a>(raw: &'a Value, field: &str) -> Option<&'a str> {
    raw.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn present(raw: &Value, field: &str) -> Option<Value> {
    raw.get(field).filter(|v| !v.is_null()).cloned()
}
