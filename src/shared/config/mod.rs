//! Server configuration module
//!
//! Settings are read from environment variables (a `.env` file is loaded by
//! the binary first). Every value has a development default except the
//! Redis URL, whose absence selects the in-process pub/sub backend.

use std::time::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub port: u16,
    /// Distributed pub/sub backend, `None` for single-node operation
    pub redis_url: Option<String>,
    /// HMAC secret used to sign and verify session tokens
    pub jwt_secret: String,
    /// Lifetime of cached auth entries
    pub auth_cache_ttl: Duration,
    /// Deadline for delivering one message to a subscriber's queue
    pub send_timeout: Duration,
    /// WebSocket keep-alive probe interval
    pub ping_interval: Duration,
    /// Bound of each connection's outbound queue
    pub outbound_capacity: usize,
    /// Delay before the broker announces a join on the channel itself
    pub join_announce_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            redis_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            auth_cache_ttl: Duration::from_secs(3600),
            send_timeout: Duration::from_millis(2000),
            ping_interval: Duration::from_secs(54),
            outbound_capacity: 256,
            join_announce_delay: Duration::from_millis(250),
        }
    }
}

impl ServerConfig {
    /// Create a new builder seeded with defaults
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(port) = parse_var::<u16>(&lookup, "SERVER_PORT")? {
            builder = builder.port(port);
        }
        if let Some(url) = lookup("REDIS_URL").filter(|url| !url.trim().is_empty()) {
            builder = builder.redis_url(url);
        }
        match lookup("JWT_SECRET") {
            Some(secret) => builder = builder.jwt_secret(secret),
            None => tracing::warn!("[Server] JWT_SECRET not set, using the development secret"),
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "AUTH_CACHE_TTL_SECS")? {
            builder = builder.auth_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "SEND_TIMEOUT_MS")? {
            builder = builder.send_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PING_INTERVAL_SECS")? {
            builder = builder.ping_interval(Duration::from_secs(secs));
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "OUTBOUND_CAPACITY")? {
            builder = builder.outbound_capacity(capacity);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "JOIN_ANNOUNCE_DELAY_MS")? {
            builder = builder.join_announce_delay(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "OUTBOUND_CAPACITY",
                value: "0".to_string(),
            });
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "SEND_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }
        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn auth_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.auth_cache_ttl = ttl;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    pub fn join_announce_delay(mut self, delay: Duration) -> Self {
        self.config.join_announce_delay = delay;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
