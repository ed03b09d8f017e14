//! Subscription Tracking
//!
//! Domain types for the symbols a client wants to stream.
//!
//! # Design
//!
//! The subscription book keeps two disjoint sets:
//! - **subscribed**: symbols the server has been (or will be, on reconnect)
//!   told about
//! - **pending**: symbols requested while the connection was down
//!
//! A symbol lives in at most one of the two sets. Pending symbols are
//! flushed into the subscribed set when a connection opens.

use std::borrow::Borrow;
use std::collections::BTreeSet;

use serde::Serialize;

// =============================================================================
// Symbol
// =============================================================================

/// A normalized ticker symbol (trimmed, uppercase, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize a raw ticker.
    ///
    /// # Errors
    ///
    /// Returns `SymbolError::Empty` if nothing is left after trimming.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(SymbolError::Empty);
        }
        Ok(Self(normalized))
    }

    /// Get the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Symbol {
    type Error = SymbolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Symbol validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// The symbol was empty or whitespace only.
    #[error("symbol must be a non-empty string")]
    Empty,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a subscribe request against the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Symbol was already subscribed; nothing to send.
    AlreadySubscribed,
    /// Connection is down; symbol was queued in the pending set.
    Queued,
    /// Symbol moved into the subscribed set; a subscribe message is due.
    Subscribed,
}

/// Result of an unsubscribe request against the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    /// Symbol was neither subscribed nor pending.
    NotTracked,
    /// Symbol was removed from tracking only; nothing to send.
    Forgotten,
    /// Symbol was subscribed on an open connection; an unsubscribe is due.
    Unsubscribed,
}

// =============================================================================
// Subscription Book
// =============================================================================

/// Tracks subscribed and pending symbols.
///
/// # Example
///
/// ```rust
/// use market_data_stream::domain::subscription::{
///     SubscribeOutcome, SubscriptionBook, Symbol,
/// };
///
/// let mut book = SubscriptionBook::new();
/// let infy = Symbol::parse(" infy ").unwrap();
///
/// // Disconnected: the symbol waits in the pending set
/// assert_eq!(book.subscribe(infy.clone(), false), SubscribeOutcome::Queued);
/// assert!(book.is_pending("INFY"));
///
/// // Connection opens: pending is flushed into subscribed
/// let resubscribe = book.flush_on_open();
/// assert_eq!(resubscribe, vec![infy]);
/// assert!(book.is_subscribed("INFY"));
/// assert!(!book.is_pending("INFY"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SubscriptionBook {
    subscribed: BTreeSet<Symbol>,
    pending: BTreeSet<Symbol>,
}

impl SubscriptionBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscribe request.
    pub fn subscribe(&mut self, symbol: Symbol, connected: bool) -> SubscribeOutcome {
        if self.subscribed.contains(&symbol) {
            return SubscribeOutcome::AlreadySubscribed;
        }

        if !connected {
            self.pending.insert(symbol);
            return SubscribeOutcome::Queued;
        }

        self.pending.remove(&symbol);
        self.subscribed.insert(symbol);
        SubscribeOutcome::Subscribed
    }

    /// Record an unsubscribe request.
    pub fn unsubscribe(&mut self, symbol: &Symbol, connected: bool) -> UnsubscribeOutcome {
        let was_pending = self.pending.remove(symbol);
        let was_subscribed = self.subscribed.remove(symbol);

        match (was_subscribed, was_pending) {
            (true, _) if connected => UnsubscribeOutcome::Unsubscribed,
            (true, _) | (false, true) => UnsubscribeOutcome::Forgotten,
            (false, false) => UnsubscribeOutcome::NotTracked,
        }
    }

    /// Move a symbol back to pending after its subscribe could not be sent.
    pub fn requeue(&mut self, symbol: Symbol) {
        self.subscribed.remove(&symbol);
        self.pending.insert(symbol);
    }

    /// Flush pending symbols into the subscribed set.
    ///
    /// Returns every symbol that needs a subscribe message on the new
    /// connection: previously subscribed symbols first, then the newly
    /// flushed pending ones, each group in sorted order.
    pub fn flush_on_open(&mut self) -> Vec<Symbol> {
        let mut resubscribe: Vec<Symbol> = self.subscribed.iter().cloned().collect();
        let pending = std::mem::take(&mut self.pending);

        for symbol in pending {
            if self.subscribed.insert(symbol.clone()) {
                resubscribe.push(symbol);
            }
        }

        resubscribe
    }

    /// Check if a symbol is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.subscribed.contains(symbol)
    }

    /// Check if a symbol is pending.
    #[must_use]
    pub fn is_pending(&self, symbol: &str) -> bool {
        self.pending.contains(symbol)
    }

    /// Subscribed symbols in sorted order.
    #[must_use]
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.iter().map(|s| s.as_str().to_owned()).collect()
    }

    /// Pending symbols in sorted order.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.pending.iter().map(|s| s.as_str().to_owned()).collect()
    }

    /// Number of subscribed symbols.
    #[must_use]
    pub fn subscribed_count(&self) -> usize {
        self.subscribed.len()
    }

    /// Number of pending symbols.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
