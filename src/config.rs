use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://quickpoll.db";
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process settings, read from the environment (and `.env` via dotenvy in
/// `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub command_prefix: String,
    pub utc_offset_secs: i64,
    pub store_timeout: Duration,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let command_prefix = lookup("COMMAND_PREFIX")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        let bind_addr = parse_or(&lookup, "BIND_ADDR", || SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let utc_offset_secs = parse_or(&lookup, "UTC_OFFSET_SECS", || 0)?;
        let store_timeout_secs =
            parse_or(&lookup, "STORE_TIMEOUT_SECS", || DEFAULT_STORE_TIMEOUT_SECS)?;
        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", || DEFAULT_MAX_CONNECTIONS)?;

        Ok(Config {
            database_url,
            bind_addr,
            command_prefix,
            utc_offset_secs,
            store_timeout: Duration::from_secs(store_timeout_secs),
            max_connections,
        })
    }
}

fn parse_or<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default()),
    }
}
