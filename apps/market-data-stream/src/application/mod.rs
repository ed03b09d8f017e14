//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that sit between the domain types and the WebSocket adapter.

/// Port interfaces for external systems (clock).
pub mod ports;

/// Application services (listener registry).
pub mod services;
