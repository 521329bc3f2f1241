//! Configuration module - environment variable parsing

mod race;

use std::env;
use std::net::SocketAddr;

pub use race::{RaceConfig, RaceEndPolicy, VelocityModel};

use crate::util::rate_limit::DEFAULT_INPUT_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Public base URL players use to reach the server (join link)
    pub public_base_url: String,
    /// Allowed client origins for CORS, comma-separated; `*` allows any
    pub client_origin: String,
    /// Max client messages per second per connection
    pub input_rate_limit: u32,

    /// Race policy applied to every race
    pub race: RaceConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let input_rate_limit = match lookup("INPUT_RATE_LIMIT") {
            Some(raw) => parse_number("INPUT_RATE_LIMIT", &raw)?,
            None => DEFAULT_INPUT_RATE_LIMIT,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            public_base_url: lookup("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            input_rate_limit,

            race: RaceConfig::from_lookup(&lookup)?,
        })
    }
}

/// Parse a numeric variable, reporting the variable name on failure
pub(crate) fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, raw.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format")]
    InvalidAddress,
}
