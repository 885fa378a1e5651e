//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/ragstore/config.toml` (XDG) or platform config dir
//! 2. Project config: `.ragstore.toml`
//! 3. Environment variables: `RAGSTORE_*`
//!
//! Example:
//!
//! ```toml
//! [graph]
//! host = "localhost"
//! port = 7687
//! user = "neo4j"
//! password = "secret"
//! tls = false
//! max_connection_retries = 3
//! retry_delay_ms = 1000
//! ```

use std::ops::Deref;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub graph: GraphConfig,
}

/// Neo4j connection configuration.
///
/// The repository consumes this; it does not own or persist it.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Database host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bolt port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username.
    #[serde(default = "default_user")]
    pub user: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Use an encrypted Bolt connection (`bolt+s://`).
    #[serde(default)]
    pub tls: bool,
    /// Target database name. `None` uses the server default.
    #[serde(default)]
    pub database: Option<String>,
    /// Driver fetch size for result streaming.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
    /// Attempts when establishing a connection before giving up.
    #[serde(default = "default_max_connection_retries")]
    pub max_connection_retries: u32,
    /// Fixed delay between connection attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    7687
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_fetch_size() -> usize {
    500
}

fn default_max_connection_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            tls: false,
            database: None,
            fetch_size: default_fetch_size(),
            max_connection_retries: default_max_connection_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl GraphConfig {
    /// Bolt URI derived from host, port and the TLS toggle.
    pub fn uri(&self) -> String {
        let scheme = if self.tls { "bolt+s" } else { "bolt" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Delay between connection attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        let user_config = Self::user_config_path();

        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(".ragstore.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("RAGSTORE_").split("_"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// User config path: ~/.config/ragstore/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("ragstore").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("ragstore").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_respects_tls_toggle() {
        let mut config = GraphConfig::default();
        assert_eq!(config.uri(), "bolt://localhost:7687");

        config.tls = true;
        config.host = "db.internal".to_string();
        config.port = 7474;
        assert_eq!(config.uri(), "bolt+s://db.internal:7474");
    }

    #[test]
    fn retry_defaults_are_bounded() {
        let config = GraphConfig::default();
        assert_eq!(config.max_connection_retries, 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
    }
}
