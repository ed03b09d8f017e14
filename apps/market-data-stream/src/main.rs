//! Market Data Stream Binary
//!
//! Connects to the market data gateway, subscribes the configured symbols
//! and logs updates until shutdown.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data-stream
//! ```
//!
//! # Environment Variables
//!
//! - `MARKET_STREAM_HOST`: Gateway host (default: localhost)
//! - `MARKET_STREAM_PORT`: Gateway port (default: 8000)
//! - `MARKET_STREAM_PATH`: WebSocket path (default: /api/v1/ws)
//! - `MARKET_STREAM_SECURE`: Use wss (default: false)
//! - `MARKET_STREAM_SYMBOLS`: Comma-separated symbols to subscribe at startup
//! - `MARKET_STREAM_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `MARKET_STREAM_HEARTBEAT_INTERVAL_SECS`, `MARKET_STREAM_HEARTBEAT_TIMEOUT_SECS`
//! - `MARKET_STREAM_RECONNECT_DELAY_INITIAL_MS`, `MARKET_STREAM_RECONNECT_DELAY_MAX_SECS`,
//!   `MARKET_STREAM_RECONNECT_DELAY_MULTIPLIER`, `MARKET_STREAM_MAX_RECONNECT_ATTEMPTS`
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: market-data-stream)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use market_data_stream::domain::events::{EventKind, StreamEvent};
use market_data_stream::infrastructure::health::{HealthServer, HealthServerState};
use market_data_stream::infrastructure::telemetry;
use market_data_stream::{MarketDataClient, StreamClientConfig, StreamConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting market data stream");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder not installed");
    }

    let config = StreamConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let client = MarketDataClient::new(StreamClientConfig::from_stream_config(&config))?;
    register_log_listeners(&client);

    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        client.clone(),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    let attempt = client.connect();
    for symbol in &config.symbols {
        client.subscribe(symbol);
    }
    tokio::spawn(async move {
        if let Err(e) = attempt.opened().await {
            tracing::warn!(error = %e, "Initial connection attempt did not open");
        }
    });

    tracing::info!("Market data stream ready");

    await_shutdown(shutdown_token).await;
    client.disconnect();

    tracing::info!("Market data stream stopped");
    Ok(())
}

fn register_log_listeners(client: &MarketDataClient) {
    client.add_listener(EventKind::MarketData, |event| {
        if let StreamEvent::MarketData(update) = event {
            match update.quote() {
                Ok(quote) => tracing::info!(
                    symbol = %update.symbol,
                    price = %quote.price,
                    change_percent = ?quote.change_percent,
                    "Quote"
                ),
                Err(e) => tracing::debug!(symbol = %update.symbol, error = %e, "Untyped market data"),
            }
        }
    });

    client.add_listener(EventKind::Error, |event| {
        if let StreamEvent::Error(error) = event {
            tracing::warn!(origin = ?error.origin, error = %error.message, "Stream error");
        }
    });

    client.add_listener(EventKind::ReconnectFailed, |event| {
        if let StreamEvent::ReconnectFailed { attempts } = event {
            tracing::error!(attempts, "Gave up reconnecting to market data gateway");
        }
    });
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &StreamConfig) {
    tracing::info!(
        url = %config.endpoint.url(),
        health_port = config.server.health_port,
        symbols = ?config.symbols,
        "Configuration loaded"
    );
    tracing::debug!(
        heartbeat_interval_secs = config.websocket.heartbeat_interval.as_secs(),
        heartbeat_timeout_secs = config.websocket.heartbeat_timeout.as_secs(),
        reconnect_delay_initial_ms = config.websocket.reconnect_delay_initial.as_millis(),
        max_reconnect_attempts = config.websocket.max_reconnect_attempts,
        "WebSocket settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
