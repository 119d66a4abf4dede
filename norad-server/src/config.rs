use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Addresses of the tracking and reverse-geocoding services.
///
/// Every field is optional here; a missing one is reported by the resolver
/// the first time it is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub position_url: Option<String>,

    #[serde(default)]
    pub geocode_url: Option<String>,

    #[serde(default)]
    pub geocode_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Interval between events when the client does not pass `dealy`
    #[serde(default = "default_delay_secs")]
    pub default_delay_secs: u64,

    /// Reconnection hint sent with every event
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_geolocation_times")]
    pub geolocation_times: u64,

    #[serde(default = "default_geolocation_window_secs")]
    pub geolocation_window_secs: u64,

    /// Redis URL for counters shared across processes; in memory when unset
    #[serde(default)]
    pub store_url: Option<String>,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer
    /// address. Enable only behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    25544
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_delay_secs() -> u64 {
    1
}

fn default_retry_ms() -> u64 {
    1500
}

fn default_geolocation_times() -> u64 {
    1
}

fn default_geolocation_window_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            upstream: UpstreamConfig::default(),
            stream: StreamConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            position_url: None,
            geocode_url: None,
            geocode_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_delay_secs: default_delay_secs(),
            retry_ms: default_retry_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            geolocation_times: default_geolocation_times(),
            geolocation_window_secs: default_geolocation_window_secs(),
            store_url: None,
            trust_forwarded_for: false,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StreamConfig {
    pub fn retry(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }
}

impl RateLimitConfig {
    pub fn geolocation_window(&self) -> Duration {
        Duration::from_secs(self.geolocation_window_secs)
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` if it exists, otherwise start from defaults, then apply
    /// `NORAD_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Override settings from an environment lookup.
    ///
    /// The upstream settings also accept the older unprefixed names
    /// (`axis`, `geocode`, `blackbox`) when the `NORAD_*` one is unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup_or_legacy = |name: &str, legacy: &str| lookup(name).or_else(|| lookup(legacy));

        if let Some(url) = lookup_or_legacy("NORAD_POSITION_URL", "axis") {
            self.upstream.position_url = Some(url);
        }
        if let Some(url) = lookup_or_legacy("NORAD_GEOCODE_URL", "geocode") {
            self.upstream.geocode_url = Some(url);
        }
        if let Some(key) = lookup_or_legacy("NORAD_GEOCODE_KEY", "blackbox") {
            self.upstream.geocode_key = Some(key);
        }
        if let Some(url) = lookup("NORAD_RATE_LIMIT_STORE_URL") {
            self.rate_limit.store_url = Some(url);
        }
        if let Some(flag) = lookup("NORAD_TRUST_FORWARDED_FOR") {
            self.rate_limit.trust_forwarded_for =
                flag.parse().map_err(|_| ConfigError::InvalidEnv {
                    name: "NORAD_TRUST_FORWARDED_FOR",
                    value: flag,
                })?;
        }
        if let Some(host) = lookup("NORAD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("NORAD_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "NORAD_PORT",
                value: port,
            })?;
        }
        if let Some(level) = lookup("NORAD_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server_address(), "0.0.0.0:25544");
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
        assert_eq!(config.stream.default_delay_secs, 1);
        assert_eq!(config.stream.retry(), Duration::from_millis(1500));
        assert_eq!(config.rate_limit.geolocation_times, 1);
        assert_eq!(config.rate_limit.geolocation_window(), Duration::from_secs(60));
        assert!(config.rate_limit.store_url.is_none());
        assert!(!config.rate_limit.trust_forwarded_for);
        assert!(config.upstream.position_url.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 8080

            [upstream]
            position_url = "https://api.wheretheiss.at/v1/satellites/25544"

            [rate_limit]
            geolocation_window_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(
            config.upstream.position_url.as_deref(),
            Some("https://api.wheretheiss.at/v1/satellites/25544")
        );
        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(config.rate_limit.geolocation_times, 1);
        assert_eq!(config.rate_limit.geolocation_window_secs, 30);
        assert!(config.rate_limit.store_url.is_none());
    }

    #[test]
    fn test_parse_rate_limit_store() {
        let config: ServerConfig = toml::from_str(
            r#"
            [rate_limit]
            store_url = "redis://cache.local:6379/2"
            trust_forwarded_for = true
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.store_url.as_deref(), Some("redis://cache.local:6379/2"));
        assert!(config.rate_limit.trust_forwarded_for);
        assert_eq!(config.rate_limit.geolocation_times, 1);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("NORAD_POSITION_URL", "http://tracker.local/iss"),
            ("NORAD_GEOCODE_URL", "http://geocoder.local/json"),
            ("NORAD_GEOCODE_KEY", "secret"),
            ("NORAD_PORT", "9000"),
        ]);

        let mut config = ServerConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.upstream.position_url.as_deref(), Some("http://tracker.local/iss"));
        assert_eq!(config.upstream.geocode_url.as_deref(), Some("http://geocoder.local/json"));
        assert_eq!(config.upstream.geocode_key.as_deref(), Some("secret"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_level, "info");
        assert!(config.rate_limit.store_url.is_none());
    }

    #[test]
    fn test_rate_limit_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("NORAD_RATE_LIMIT_STORE_URL", "redis://127.0.0.1:6379/0"),
            ("NORAD_TRUST_FORWARDED_FOR", "true"),
        ]);

        let mut config = ServerConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.rate_limit.store_url.as_deref(), Some("redis://127.0.0.1:6379/0"));
        assert!(config.rate_limit.trust_forwarded_for);

        let result = config.apply_env(|name| {
            (name == "NORAD_TRUST_FORWARDED_FOR").then(|| "sometimes".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "NORAD_TRUST_FORWARDED_FOR", .. })
        ));
    }

    #[test]
    fn test_legacy_env_names() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("axis", "http://tracker.local/iss"),
            ("geocode", "http://geocoder.local/json"),
            ("blackbox", "legacy-key"),
            ("NORAD_GEOCODE_KEY", "current-key"),
        ]);

        let mut config = ServerConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.upstream.position_url.as_deref(), Some("http://tracker.local/iss"));
        assert_eq!(config.upstream.geocode_url.as_deref(), Some("http://geocoder.local/json"));
        assert_eq!(config.upstream.geocode_key.as_deref(), Some("current-key"));
    }

    #[test]
    fn test_invalid_port_env() {
        let mut config = ServerConfig::default();
        let result = config.apply_env(|name| (name == "NORAD_PORT").then(|| "http".to_string()));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "NORAD_PORT", .. })
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load("does-not-exist.toml").unwrap();
        assert_eq!(config.rate_limit.geolocation_window_secs, 60);
    }
}
