//! Market Data Gateway Stream
//!
//! WebSocket client for the market data gateway.
//!
//! # Components
//!
//! - `client`: Session management, subscriptions and listener fan-out
//! - `lifecycle`: Connection state machine and close decisions
//! - `reconnect`: Exponential backoff policy
//! - `heartbeat`: Ping schedule and pong timeout
//! - `router`: Inbound frame to event routing
//! - `messages`: Wire message types
//! - `codec`: JSON encoding/decoding

pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod lifecycle;
pub mod messages;
pub mod reconnect;
pub mod router;

pub use client::{
    ClientStatus, ConnectAttempt, MarketDataClient, StreamClientConfig, StreamClientError,
};
pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatError};
pub use lifecycle::{CloseDecision, ConnectionLifecycle};
pub use messages::{ClientMessage, MessageError, ServerMessage};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use router::MessageRouter;
