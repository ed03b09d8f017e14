//! Listener Registry
//!
//! Maps event kinds to the callbacks registered for them.
//!
//! - Keys are created on first registration and removed once empty.
//! - Dispatch iterates a snapshot of the callbacks with no lock held, so a
//!   callback may add or remove listeners (itself included) while running.
//! - Each callback runs under `catch_unwind`; a panicking listener is logged
//!   and skipped, the remaining listeners still receive the event.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::domain::events::{EventKind, StreamEvent};

type Callback = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(ListenerId, Callback)>>,
}

impl Registry {
    fn remove(&mut self, kind: &EventKind, id: ListenerId) -> bool {
        let Some(callbacks) = self.listeners.get_mut(kind) else {
            return false;
        };

        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        let removed = callbacks.len() != before;

        if callbacks.is_empty() {
            self.listeners.remove(kind);
        }

        removed
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that returned normally.
    pub delivered: usize,
    /// Listeners that panicked.
    pub panicked: usize,
}

/// Registry of event listeners.
///
/// Cloning shares the underlying registry.
///
/// # Example
///
/// ```rust
/// use market_data_stream::application::services::ListenerRegistry;
/// use market_data_stream::domain::events::{EventKind, StreamEvent};
///
/// let registry = ListenerRegistry::new();
/// let handle = registry.add(EventKind::Connected, |_event| {});
///
/// let report = registry.notify(&StreamEvent::Connected);
/// assert_eq!(report.delivered, 1);
///
/// assert!(handle.remove());
/// assert!(!registry.has_listeners(&EventKind::Connected));
/// ```
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event kind.
    ///
    /// Returns a handle that can unregister the callback later.
    pub fn add<F>(&self, kind: EventKind, callback: F) -> ListenerHandle
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        let mut registry = self.inner.write();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);

        registry
            .listeners
            .entry(kind.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        ListenerHandle {
            kind,
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Unregister a callback.
    ///
    /// Returns `true` if the callback was registered.
    pub fn remove(&self, kind: &EventKind, id: ListenerId) -> bool {
        self.inner.write().remove(kind, id)
    }

    /// Deliver an event to every listener registered for its kind.
    pub fn notify(&self, event: &StreamEvent) -> DispatchReport {
        let kind = event.kind();

        let snapshot: Vec<Callback> = {
            let registry = self.inner.read();
            match registry.listeners.get(&kind) {
                Some(callbacks) => callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return DispatchReport::default(),
            }
        };

        let mut report = DispatchReport::default();
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => report.delivered += 1,
                Err(panic) => {
                    report.panicked += 1;
                    tracing::error!(
                        event = %kind,
                        panic = panic_message(panic.as_ref()),
                        "Listener panicked"
                    );
                }
            }
        }

        report
    }

    /// Number of listeners registered for a kind.
    #[must_use]
    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.inner.read().listeners.get(kind).map_or(0, Vec::len)
    }

    /// Check if a kind has any listeners (i.e. its key exists).
    #[must_use]
    pub fn has_listeners(&self, kind: &EventKind) -> bool {
        self.inner.read().listeners.contains_key(kind)
    }

    /// Number of event kinds with at least one listener.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.inner.read().listeners.len()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.read();
        let mut counts: Vec<(String, usize)> = registry
            .listeners
            .iter()
            .map(|(kind, callbacks)| (kind.to_string(), callbacks.len()))
            .collect();
        counts.sort();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

/// Handle to a registered listener.
///
/// Dropping the handle leaves the listener registered; call
/// [`ListenerHandle::remove`] to unregister it.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    kind: EventKind,
    id: ListenerId,
    registry: Weak<RwLock<Registry>>,
}

impl ListenerHandle {
    /// The listener's identifier.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// The event kind the listener is registered for.
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Unregister the listener.
    ///
    /// Returns `false` if it was already removed or the registry is gone.
    pub fn remove(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.write().remove(&self.kind, self.id))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
