//! Prometheus Metrics Module
//!
//! Exposes client metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Messages**: Inbound and outbound messages by type, decode failures
//! - **Connection**: Up/down gauge, reconnect attempts and exhaustion
//! - **Subscriptions**: Subscribed symbol count
//! - **Dispatch**: Listener panics and dispatch latency
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! functions are no-ops until [`init_metrics`] installs a recorder.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Calling this again returns the handle installed by the first call.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed, for example when
/// another global recorder is already set.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "market_stream_messages_received_total",
        "Total messages received from the market data gateway"
    );
    describe_counter!(
        "market_stream_messages_sent_total",
        "Total messages sent to the market data gateway"
    );
    describe_counter!(
        "market_stream_decode_errors_total",
        "Total inbound frames dropped because they were not JSON objects"
    );

    describe_gauge!(
        "market_stream_connection_up",
        "1 while the gateway connection is open, 0 otherwise"
    );
    describe_counter!(
        "market_stream_reconnects_total",
        "Total scheduled reconnection attempts"
    );
    describe_counter!(
        "market_stream_reconnects_exhausted_total",
        "Times reconnection gave up after the maximum attempts"
    );

    describe_gauge!(
        "market_stream_subscribed_symbols",
        "Number of symbols currently subscribed"
    );

    describe_counter!(
        "market_stream_listener_panics_total",
        "Total listener callbacks that panicked"
    );
    describe_histogram!(
        "market_stream_dispatch_seconds",
        "Time to route and dispatch one inbound frame"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Label for an inbound message type.
///
/// Server-defined types collapse into `other` to keep label cardinality bounded.
#[must_use]
pub fn inbound_type_label(message_type: &str) -> &'static str {
    match message_type {
        "market_data" => "market_data",
        "error" => "error",
        "pong" => "pong",
        "subscribed" => "subscribed",
        "unsubscribed" => "unsubscribed",
        _ => "other",
    }
}

/// Record a message received from the gateway.
pub fn record_message_received(message_type: &str) {
    counter!(
        "market_stream_messages_received_total",
        "message_type" => inbound_type_label(message_type)
    )
    .increment(1);
}

/// Record a message sent to the gateway.
pub fn record_message_sent(message_type: &'static str) {
    counter!(
        "market_stream_messages_sent_total",
        "message_type" => message_type
    )
    .increment(1);
}

/// Record an inbound frame that failed to decode.
pub fn record_decode_error() {
    counter!("market_stream_decode_errors_total").increment(1);
}

/// Update the connection gauge.
pub fn set_connection_up(up: bool) {
    gauge!("market_stream_connection_up").set(if up { 1.0 } else { 0.0 });
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect() {
    counter!("market_stream_reconnects_total").increment(1);
}

/// Record that reconnection gave up.
pub fn record_reconnect_exhausted() {
    counter!("market_stream_reconnects_exhausted_total").increment(1);
}

/// Update the subscribed symbol gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribed_symbols(count: usize) {
    gauge!("market_stream_subscribed_symbols").set(count as f64);
}

/// Record listener panics from one dispatch.
pub fn record_listener_panics(count: usize) {
    if count > 0 {
        counter!("market_stream_listener_panics_total").increment(count as u64);
    }
}

/// Record how long routing and dispatching a frame took.
pub fn record_dispatch_duration(duration: Duration) {
    histogram!("market_stream_dispatch_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
