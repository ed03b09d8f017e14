//! Domain Layer - Core streaming types and business logic.
//!
//! This layer contains the core domain types for the market data stream
//! client with no I/O. All types here are plain Rust with serialization
//! support.

/// Connection states and WebSocket close codes.
pub mod connection;

/// Events delivered to registered listeners.
pub mod events;

/// Symbol normalization and subscription tracking.
pub mod subscription;
