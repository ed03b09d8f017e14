#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Market Data Stream - Reconnecting Market Data Client
//!
//! A WebSocket client that keeps a single connection to the market data
//! gateway, tracks per-symbol subscriptions across reconnects, and fans
//! inbound messages out to registered listeners.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `connection`: Connection states and close codes
//!   - `events`: Event kinds and payloads delivered to listeners
//!   - `subscription`: Symbol normalization and the subscribed/pending book
//!
//! - **Application**: Ports and services
//!   - `ports`: Clock interface
//!   - `services`: Listener registry with panic-isolated dispatch
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `stream`: WebSocket client, lifecycle, backoff, heartbeat, routing
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing and OpenTelemetry setup
//!
//! # Data Flow
//!
//! ```text
//!                       subscribe / unsubscribe / ping
//!   MarketDataClient ───────────────────────────────────► Gateway WS
//!          ▲                                                  │
//!          │ listeners                   market_data, pong,   │
//!   ListenerRegistry ◄── MessageRouter ◄── error, ... ────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no external I/O.
pub mod domain;

/// Application layer - Ports and services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::ConnectionState;
pub use domain::events::{CloseInfo, ErrorEvent, EventKind, MarketDataUpdate, QuoteSnapshot, StreamEvent};
pub use domain::subscription::{
    SubscribeOutcome, SubscriptionBook, Symbol, SymbolError, UnsubscribeOutcome,
};

// Application
pub use application::ports::{Clock, SystemClock};
pub use application::services::{DispatchReport, ListenerHandle, ListenerId, ListenerRegistry};

// Stream client
pub use infrastructure::stream::{
    ClientStatus, ConnectAttempt, MarketDataClient, StreamClientConfig, StreamClientError,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, EndpointSettings, ServerSettings, StreamConfig, WebSocketSettings,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
