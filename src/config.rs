//! Configuration Module
//!
//! Loads cache and server settings from environment variables.

use std::env;
use std::str::FromStr;

/// Cache and server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// LRU capacity of the memory adapter, 0 disables eviction
    pub capacity: usize,
    /// Period of the expiry janitor in milliseconds
    pub janitor_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// TTL in milliseconds for HTTP writes without one, 0 for no expiry
    pub default_ttl_ms: i64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - LRU capacity (default: 0, unbounded)
    /// - `JANITOR_INTERVAL_MS` - Janitor period in milliseconds (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL_MS` - Default TTL for HTTP writes (default: 0, never expires)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            janitor_interval_ms: env_or("JANITOR_INTERVAL_MS", defaults.janitor_interval_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 0,
            janitor_interval_ms: 1000,
            server_port: 3000,
            default_ttl_ms: 0,
        }
    }
}

/// Parses `name`, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.capacity, 0);
        assert_eq!(config.janitor_interval_ms, 1000);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl_ms, 0);
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("CACHE_CAPACITY", "128");
        env::set_var("JANITOR_INTERVAL_MS", "250");
        env::remove_var("SERVER_PORT");
        env::set_var("DEFAULT_TTL_MS", "not-a-number");

        let config = Config::from_env();
        assert_eq!(config.capacity, 128);
        assert_eq!(config.janitor_interval_ms, 250);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl_ms, 0);

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("JANITOR_INTERVAL_MS");
        env::remove_var("DEFAULT_TTL_MS");
    }
}
