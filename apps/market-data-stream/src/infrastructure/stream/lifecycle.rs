//! Connection Lifecycle
//!
//! Synchronous state machine for the stream connection. It owns the
//! connection state and the reconnect policy and decides what a close means,
//! but never sleeps or spawns. The client turns a [`CloseDecision`] into a
//! timer.

use std::time::Duration;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::domain::connection::{ConnectionState, is_normal_closure};

/// What the client should do after a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Normal closure; stay disconnected.
    Intentional,
    /// Reconnect after `delay`.
    Reconnect {
        /// 1-based attempt number.
        attempt: u32,
        /// Backoff delay.
        delay: Duration,
    },
    /// No attempts left.
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },
}

/// Connection state plus reconnect bookkeeping.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    policy: ReconnectPolicy,
}

impl ConnectionLifecycle {
    /// Create a disconnected lifecycle.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy: ReconnectPolicy::new(config),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.policy.attempt_count()
    }

    /// Whether another reconnect attempt is allowed.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.policy.should_retry()
    }

    /// A session is being opened.
    pub const fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// The session opened.
    pub const fn on_open(&mut self) {
        self.state = ConnectionState::Connected;
        self.policy.reset();
    }

    /// The session closed with `code`.
    pub fn on_close(&mut self, code: u16) -> CloseDecision {
        self.state = ConnectionState::Disconnected;

        if is_normal_closure(code) {
            return CloseDecision::Intentional;
        }

        match self.policy.next_delay() {
            Some(delay) => CloseDecision::Reconnect {
                attempt: self.policy.attempt_count(),
                delay,
            },
            None => CloseDecision::Exhausted {
                attempts: self.policy.attempt_count(),
            },
        }
    }

    /// The user tore the connection down.
    pub const fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::{
        ABNORMAL_CLOSURE, HEARTBEAT_TIMEOUT, NO_STATUS_RECEIVED, NORMAL_CLOSURE,
    };
    use proptest::prelude::*;

    fn lifecycle(max_attempts: u32) -> ConnectionLifecycle {
        ConnectionLifecycle::new(ReconnectConfig {
            max_attempts,
            ..ReconnectConfig::default()
        })
    }

    #[test]
    fn walks_through_states() {
        let mut lifecycle = lifecycle(10);
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);

        lifecycle.begin_connect();
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);
        assert!(!lifecycle.is_connected());

        lifecycle.on_open();
        assert!(lifecycle.is_connected());

        lifecycle.mark_disconnected();
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn normal_closure_does_not_reconnect() {
        let mut lifecycle = lifecycle(10);
        lifecycle.begin_connect();
        lifecycle.on_open();

        assert_eq!(lifecycle.on_close(NORMAL_CLOSURE), CloseDecision::Intentional);
        assert_eq!(lifecycle.attempts(), 0);
    }

    #[test]
    fn abnormal_closes_reconnect_with_backoff() {
        let mut lifecycle = lifecycle(10);

        assert_eq!(
            lifecycle.on_close(ABNORMAL_CLOSURE),
            CloseDecision::Reconnect {
                attempt: 1,
                delay: Duration::from_secs(3)
            }
        );
        assert_eq!(
            lifecycle.on_close(NO_STATUS_RECEIVED),
            CloseDecision::Reconnect {
                attempt: 2,
                delay: Duration::from_millis(4500)
            }
        );
        assert!(matches!(
            lifecycle.on_close(HEARTBEAT_TIMEOUT),
            CloseDecision::Reconnect { attempt: 3, .. }
        ));
    }

    #[test]
    fn open_resets_attempts() {
        let mut lifecycle = lifecycle(10);
        let _ = lifecycle.on_close(ABNORMAL_CLOSURE);
        let _ = lifecycle.on_close(ABNORMAL_CLOSURE);
        assert_eq!(lifecycle.attempts(), 2);

        lifecycle.begin_connect();
        lifecycle.on_open();
        assert_eq!(lifecycle.attempts(), 0);
        assert_eq!(
            lifecycle.on_close(ABNORMAL_CLOSURE),
            CloseDecision::Reconnect {
                attempt: 1,
                delay: Duration::from_secs(3)
            }
        );
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let mut lifecycle = lifecycle(2);
        assert!(matches!(lifecycle.on_close(ABNORMAL_CLOSURE), CloseDecision::Reconnect { .. }));
        assert!(matches!(lifecycle.on_close(ABNORMAL_CLOSURE), CloseDecision::Reconnect { .. }));
        assert!(!lifecycle.can_retry());
        assert_eq!(
            lifecycle.on_close(ABNORMAL_CLOSURE),
            CloseDecision::Exhausted { attempts: 2 }
        );
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
    }

    proptest! {
        #[test]
        fn abnormal_close_sequence_is_bounded(max_attempts in 1u32..20, extra in 1u32..5) {
            let mut lifecycle = lifecycle(max_attempts);
            let mut last = Duration::ZERO;

            for expected in 1..=max_attempts {
                match lifecycle.on_close(ABNORMAL_CLOSURE) {
                    CloseDecision::Reconnect { attempt, delay } => {
                        prop_assert_eq!(attempt, expected);
                        prop_assert!(delay >= last);
                        prop_assert!(delay <= Duration::from_secs(30));
                        last = delay;
                    }
                    other => prop_assert!(false, "unexpected decision {:?}", other),
                }
            }

            for _ in 0..extra {
                prop_assert_eq!(
                    lifecycle.on_close(ABNORMAL_CLOSURE),
                    CloseDecision::Exhausted { attempts: max_attempts }
                );
            }
        }
    }
}
