//! Connection State
//!
//! The three states a stream connection moves through and the close codes
//! the client distinguishes when a connection ends.

use serde::Serialize;

/// Normal closure. The only close code that never triggers a reconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close frame arrived without a status code.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Connection dropped without a close frame (or never opened).
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Application code used when the heartbeat goes unanswered.
pub const HEARTBEAT_TIMEOUT: u16 = 4000;

/// Close reason sent by a user-initiated disconnect.
pub const USER_DISCONNECT_REASON: &str = "User initiated disconnect";

/// Connection state of the stream client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No socket, or the last socket has closed.
    #[default]
    Disconnected,
    /// A socket is being opened.
    Connecting,
    /// The socket is open and subscriptions can be sent.
    Connected,
}

impl ConnectionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Check if the connection is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a close code marks an intentional shutdown.
#[must_use]
pub const fn is_normal_closure(code: u16) -> bool {
    code == NORMAL_CLOSURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connecting).unwrap(),
            "\"connecting\""
        );
    }

    #[test]
    fn normal_closure_detection() {
        assert!(is_normal_closure(NORMAL_CLOSURE));
        assert!(!is_normal_closure(ABNORMAL_CLOSURE));
        assert!(!is_normal_closure(NO_STATUS_RECEIVED));
        assert!(!is_normal_closure(HEARTBEAT_TIMEOUT));
    }
}
