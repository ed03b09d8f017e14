//! Inbound Message Router
//!
//! Turns a text frame from the gateway into the events listeners receive.
//!
//! Every valid JSON object produces a `message` event first, followed by at
//! most one type-specific event. Frames that fail to decode produce nothing.

use super::codec::{CodecError, JsonCodec};
use super::messages::ServerMessage;
use crate::domain::events::{ErrorEvent, MarketDataUpdate, StreamEvent};

/// Routes inbound frames to stream events.
#[derive(Debug, Default, Clone)]
pub struct MessageRouter {
    codec: JsonCodec,
}

impl MessageRouter {
    /// Create a new router.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            codec: JsonCodec::new(),
        }
    }

    /// Route a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object. Objects with a
    /// missing or malformed type still yield the `message` event.
    pub fn route(&self, text: &str) -> Result<Vec<StreamEvent>, CodecError> {
        let raw = self.codec.decode(text)?;

        let classified = ServerMessage::classify(&raw);
        let mut events = vec![StreamEvent::Message(raw.clone())];

        match classified {
            Ok(ServerMessage::MarketData(message)) => {
                events.push(StreamEvent::MarketData(MarketDataUpdate::new(
                    message.symbol,
                    message.data,
                )));
            }
            Ok(ServerMessage::Error {
                message,
                code,
                details,
            }) => {
                tracing::error!(error = %message, code = ?code, "Market data server error");
                events.push(StreamEvent::Error(ErrorEvent::server(message, code, details)));
            }
            Ok(ServerMessage::Pong { timestamp }) => {
                events.push(StreamEvent::Pong { timestamp });
            }
            Ok(ServerMessage::Subscribed { symbol }) => {
                tracing::info!(symbol = %symbol, "Subscription confirmed");
                events.push(StreamEvent::Subscribed { symbol });
            }
            Ok(ServerMessage::Unsubscribed { symbol }) => {
                tracing::info!(symbol = %symbol, "Unsubscription confirmed");
                events.push(StreamEvent::Unsubscribed { symbol });
            }
            Ok(ServerMessage::Other { message_type }) => {
                events.push(StreamEvent::Custom {
                    event_type: message_type,
                    payload: raw,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping inbound message");
            }
        }

        Ok(events)
    }
}
