//! Application Services
//!
//! Listener registration and event dispatch for the stream client.

mod listeners;

pub use listeners::{DispatchReport, ListenerHandle, ListenerId, ListenerRegistry};
