//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the WebSocket adapter for the market data gateway
//! and the operational surfaces around it.

/// Market data gateway WebSocket client.
pub mod stream;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
