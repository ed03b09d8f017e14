//! Configuration Module
//!
//! Configuration loading for the market data stream client.

mod settings;

pub use settings::{ConfigError, EndpointSettings, ServerSettings, StreamConfig, WebSocketSettings};
