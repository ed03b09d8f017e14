//! Stream Configuration Settings
//!
//! Configuration types for the market data stream client, loaded from
//! environment variables. Unparseable values fall back to defaults.

use std::time::Duration;

/// Gateway endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// WebSocket path.
    pub path: String,
    /// Use `wss` instead of `ws`.
    pub secure: bool,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            path: "/api/v1/ws".to_string(),
            secure: false,
        }
    }
}

impl EndpointSettings {
    /// Get the WebSocket URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let path = self.path.trim_start_matches('/');
        format!("{scheme}://{}:{}/{path}", self.host, self.port)
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Heartbeat timeout before considering connection dead.
    pub heartbeat_timeout: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(60),
            reconnect_delay_initial: Duration::from_millis(3000),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 1.5,
            max_reconnect_attempts: 10,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete stream configuration.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Gateway endpoint.
    pub endpoint: EndpointSettings,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Symbols to subscribe at startup.
    pub symbols: Vec<String>,
}

impl StreamConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty or a port is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty or a port is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let default_endpoint = EndpointSettings::default();
        let host = env.get("MARKET_STREAM_HOST").unwrap_or(default_endpoint.host);
        if host.trim().is_empty() {
            return Err(ConfigError::EmptyValue("MARKET_STREAM_HOST".to_string()));
        }

        let endpoint = EndpointSettings {
            host: host.trim().to_string(),
            port: env.parse("MARKET_STREAM_PORT", default_endpoint.port),
            path: env
                .get("MARKET_STREAM_PATH")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(default_endpoint.path),
            secure: env.parse_bool("MARKET_STREAM_SECURE", default_endpoint.secure),
        };
        if endpoint.port == 0 {
            return Err(ConfigError::InvalidPort("MARKET_STREAM_PORT".to_string()));
        }

        let server = ServerSettings {
            health_port: env.parse(
                "MARKET_STREAM_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };
        if server.health_port == 0 {
            return Err(ConfigError::InvalidPort(
                "MARKET_STREAM_HEALTH_PORT".to_string(),
            ));
        }

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            heartbeat_interval: env.duration_secs(
                "MARKET_STREAM_HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval,
            ),
            heartbeat_timeout: env.duration_secs(
                "MARKET_STREAM_HEARTBEAT_TIMEOUT_SECS",
                defaults.heartbeat_timeout,
            ),
            reconnect_delay_initial: env.duration_millis(
                "MARKET_STREAM_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: env.duration_secs(
                "MARKET_STREAM_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: env
                .get("MARKET_STREAM_RECONNECT_DELAY_MULTIPLIER")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|m| m.is_finite() && *m >= 1.0)
                .unwrap_or(defaults.reconnect_delay_multiplier),
            max_reconnect_attempts: env.parse(
                "MARKET_STREAM_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
        };

        let symbols = env
            .get("MARKET_STREAM_SYMBOLS")
            .map(|raw| parse_symbol_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            endpoint,
            websocket,
            server,
            symbols,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Port variable is zero.
    #[error("environment variable {0} must be a non-zero port")]
    InvalidPort(String),
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn parse_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .map_or(default, Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn load(vars: &[(&str, &str)]) -> Result<StreamConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StreamConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let config = load(&[]).unwrap();

        assert_eq!(config.endpoint, EndpointSettings::default());
        assert_eq!(config.endpoint.url(), "ws://localhost:8000/api/v1/ws");
        assert_eq!(config.server.health_port, 8083);
        assert!(config.symbols.is_empty());

        let ws = &config.websocket;
        assert_eq!(ws.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(ws.heartbeat_timeout, Duration::from_secs(60));
        assert_eq!(ws.reconnect_delay_initial, Duration::from_millis(3000));
        assert_eq!(ws.reconnect_delay_max, Duration::from_secs(30));
        assert!((ws.reconnect_delay_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(ws.max_reconnect_attempts, 10);
    }

    #[test]
    fn secure_endpoint_uses_wss() {
        let config = load(&[
            ("MARKET_STREAM_HOST", "quotes.example.com"),
            ("MARKET_STREAM_PORT", "443"),
            ("MARKET_STREAM_SECURE", "true"),
        ])
        .unwrap();
        assert_eq!(config.endpoint.url(), "wss://quotes.example.com:443/api/v1/ws");
    }

    #[test]
    fn custom_path_is_normalized() {
        let config = load(&[("MARKET_STREAM_PATH", "stream")]).unwrap();
        assert_eq!(config.endpoint.url(), "ws://localhost:8000/stream");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = load(&[
            ("MARKET_STREAM_PORT", "not-a-port"),
            ("MARKET_STREAM_SECURE", "maybe"),
            ("MARKET_STREAM_HEARTBEAT_INTERVAL_SECS", "-5"),
            ("MARKET_STREAM_RECONNECT_DELAY_MULTIPLIER", "0.5"),
            ("MARKET_STREAM_MAX_RECONNECT_ATTEMPTS", "lots"),
        ])
        .unwrap();

        assert_eq!(config.endpoint.port, 8000);
        assert!(!config.endpoint.secure);
        assert_eq!(config.websocket.heartbeat_interval, Duration::from_secs(30));
        assert!((config.websocket.reconnect_delay_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.websocket.max_reconnect_attempts, 10);
    }

    #[test]
    fn websocket_overrides() {
        let config = load(&[
            ("MARKET_STREAM_HEARTBEAT_INTERVAL_SECS", "10"),
            ("MARKET_STREAM_HEARTBEAT_TIMEOUT_SECS", "25"),
            ("MARKET_STREAM_RECONNECT_DELAY_INITIAL_MS", "250"),
            ("MARKET_STREAM_RECONNECT_DELAY_MAX_SECS", "5"),
            ("MARKET_STREAM_RECONNECT_DELAY_MULTIPLIER", "2"),
            ("MARKET_STREAM_MAX_RECONNECT_ATTEMPTS", "0"),
        ])
        .unwrap();

        let ws = &config.websocket;
        assert_eq!(ws.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(ws.heartbeat_timeout, Duration::from_secs(25));
        assert_eq!(ws.reconnect_delay_initial, Duration::from_millis(250));
        assert_eq!(ws.reconnect_delay_max, Duration::from_secs(5));
        assert!((ws.reconnect_delay_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(ws.max_reconnect_attempts, 0);
    }

    #[test_case("MARKET_STREAM_PORT" ; "gateway port")]
    #[test_case("MARKET_STREAM_HEALTH_PORT" ; "health port")]
    fn zero_port_is_rejected(key: &str) {
        let error = load(&[(key, "0")]).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidPort(ref k) if k == key));
    }

    #[test]
    fn blank_host_is_rejected() {
        let error = load(&[("MARKET_STREAM_HOST", "  ")]).unwrap_err();
        assert!(matches!(error, ConfigError::EmptyValue(_)));
    }

    #[test_case("TCS,INFY", &["TCS", "INFY"] ; "plain list")]
    #[test_case(" tcs , ,infy ", &["tcs", "infy"] ; "whitespace and blanks")]
    #[test_case("", &[] ; "empty")]
    fn symbol_list_parsing(raw: &str, expected: &[&str]) {
        assert_eq!(parse_symbol_list(raw), expected);
    }
}
