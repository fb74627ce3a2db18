//! # Sifter Configuration
//!
//! TOML configuration with serde defaults and startup validation. The
//! file has five tables: `server`, `resolver`, `filter`, `collector`,
//! and `log`; every field is optional and falls back to a sensible
//! default.
//!
//! ```toml
//! [server]
//! address = "127.0.0.1:53"
//! network = "udp"
//! cache_enabled = true
//!
//! [resolver]
//! mode = "f"
//! upstream = "1.1.1.1"
//!
//! [filter]
//! mode = "NULL"
//! ttl = 300
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;

/// Accepted `server.network` values.
const NETWORKS: &[&str] = &["udp", "udp4", "udp6", "tcp", "tcp4", "tcp6"];

/// Accepted `resolver.mode` values.
const RESOLVER_MODES: &[&str] = &["r", "i", "f"];

/// Accepted `filter.mode` values.
const FILTER_MODES: &[&str] = &["NXDOMAIN", "LOCALIP", "NODATA", "NULL"];

/// Accepted `collector.backend` values.
const COLLECTOR_BACKENDS: &[&str] = &["default", "mysql", "mariadb"];

/// Accepted `log.mode` values.
const LOG_MODES: &[&str] = &["dev", "prod"];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// `server.address` is not a valid `ip:port` pair.
    #[error("invalid server address: {0}")]
    InvalidServerAddress(String),

    /// `server.network` is not a recognized network.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// `resolver.mode` is not `r`, `i`, or `f`.
    #[error("invalid resolver mode: {0}")]
    InvalidResolverMode(String),

    /// `resolver.upstream` is missing or invalid in forwarding mode.
    #[error("invalid resolver upstream: {0}")]
    InvalidResolverUpstream(String),

    /// `filter.mode` is not a recognized response mode.
    #[error("invalid filter mode: {0}")]
    InvalidFilterMode(String),

    /// `collector.backend` is not a recognized backend.
    #[error("invalid collector backend: {0}")]
    InvalidCollectorBackend(String),

    /// `log.mode` is not `dev` or `prod`.
    #[error("invalid log mode: {0}")]
    InvalidLogMode(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listener options.
    pub server: ServerOptions,
    /// Resolver options.
    pub resolver: ResolverOptions,
    /// Filter options.
    pub filter: FilterOptions,
    /// Collector options.
    pub collector: CollectorOptions,
    /// Logging options.
    pub log: LogOptions,
}

/// `[server]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerOptions {
    /// Listen address as an `ip:port` string.
    pub address: String,
    /// Listener network: `udp`, `udp4`, `udp6`, `tcp`, `tcp4`, `tcp6`.
    pub network: String,
    /// Whether the handler consults the answer cache.
    pub cache_enabled: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:53".to_string(),
            network: "udp".to_string(),
            cache_enabled: true,
        }
    }
}

impl ServerOptions {
    /// Returns the parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address
            .parse()
            .map_err(|_| ConfigError::InvalidServerAddress(self.address.clone()))
    }

    /// Returns true for the TCP network variants.
    pub fn is_tcp(&self) -> bool {
        self.network.starts_with("tcp")
    }
}

/// `[resolver]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverOptions {
    /// Resolution mode: `r` (recursive), `i` (iterative), `f` (forwarding).
    pub mode: String,
    /// Upstream IP; required when `mode = "f"`.
    pub upstream: String,
    /// Path to a root hint file; built-in hints when empty.
    pub hint_path: String,
    /// Stale-serving window in seconds after natural expiry.
    pub max_expire: u64,
    /// Whether the resolver consults and populates the cache.
    pub cache_enabled: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            mode: "r".to_string(),
            upstream: String::new(),
            hint_path: String::new(),
            max_expire: 300,
            cache_enabled: true,
        }
    }
}

impl ResolverOptions {
    /// Returns the parsed upstream address (forwarding mode).
    pub fn upstream_ip(&self) -> Result<IpAddr> {
        self.upstream
            .parse()
            .map_err(|_| ConfigError::InvalidResolverUpstream(self.upstream.clone()))
    }
}

/// `[filter]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
    /// Response mode: `NXDOMAIN`, `LOCALIP`, `NODATA`, `NULL`.
    pub mode: String,
    /// TTL of synthesized filter answers, in seconds.
    pub ttl: u32,
    /// Rule list sources: file paths, or URLs with the http feature.
    pub lists: Vec<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            mode: "NULL".to_string(),
            ttl: 300,
            lists: Vec::new(),
        }
    }
}

/// `[collector]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorOptions {
    /// Whether query telemetry is collected at all.
    pub enabled: bool,
    /// Whether client addresses are anonymized before storage.
    pub anonymize: bool,
    /// Buffer capacity; reaching it triggers an immediate flush.
    pub max_entries: usize,
    /// Periodic flush interval in seconds.
    pub interval: u64,
    /// Persistence backend: `default`, `mysql`, or `mariadb`.
    pub backend: String,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            anonymize: false,
            max_entries: 1000,
            interval: 900,
            backend: "default".to_string(),
        }
    }
}

/// `[log]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogOptions {
    /// Whether logging is enabled.
    pub enabled: bool,
    /// Output mode: `dev` (human-readable) or `prod` (JSON).
    pub mode: String,
    /// Level directive passed to the subscriber filter.
    pub level: String,
    /// Output targets: `stdout`, `stderr`, or file paths.
    pub outputs: Vec<String>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: "prod".to_string(),
            level: "error".to_string(),
            outputs: vec!["stdout".to_string()],
        }
    }
}

impl Config {
    /// Reads and parses a TOML config file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Validates the configuration, applying fallback defaults for
    /// empty optional fields first.
    pub fn validate(&mut self) -> Result<()> {
        self.apply_defaults();

        self.server.socket_addr()?;

        if !NETWORKS.contains(&self.server.network.as_str()) {
            return Err(ConfigError::InvalidNetwork(self.server.network.clone()));
        }

        if !RESOLVER_MODES.contains(&self.resolver.mode.as_str()) {
            return Err(ConfigError::InvalidResolverMode(self.resolver.mode.clone()));
        }

        if self.resolver.mode == "f" {
            self.resolver.upstream_ip()?;
        }

        if !FILTER_MODES.contains(&self.filter.mode.as_str()) {
            return Err(ConfigError::InvalidFilterMode(self.filter.mode.clone()));
        }

        if self.collector.enabled
            && !COLLECTOR_BACKENDS.contains(&self.collector.backend.as_str())
        {
            return Err(ConfigError::InvalidCollectorBackend(
                self.collector.backend.clone(),
            ));
        }

        if self.log.enabled && !LOG_MODES.contains(&self.log.mode.as_str()) {
            return Err(ConfigError::InvalidLogMode(self.log.mode.clone()));
        }

        Ok(())
    }

    fn apply_defaults(&mut self) {
        if self.collector.max_entries == 0 {
            self.collector.max_entries = CollectorOptions::default().max_entries;
        }
        if self.collector.interval == 0 {
            self.collector.interval = CollectorOptions::default().interval;
        }
        if self.log.level.is_empty() {
            self.log.level = LogOptions::default().level;
        }
        if self.log.outputs.is_empty() {
            self.log.outputs = LogOptions::default().outputs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.address, "127.0.0.1:53");
        assert_eq!(config.resolver.mode, "r");
        assert_eq!(config.filter.mode, "NULL");
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
            [server]
            address = "0.0.0.0:5353"
            network = "udp4"
            cache_enabled = false

            [resolver]
            mode = "f"
            upstream = "1.1.1.1"
            max_expire = 120

            [filter]
            mode = "NXDOMAIN"
            ttl = 60
            lists = ["/etc/sifter/ads.list"]

            [collector]
            enabled = true
            anonymize = true
            max_entries = 500
            interval = 60
            backend = "default"

            [log]
            enabled = true
            mode = "dev"
            level = "debug"
            outputs = ["stdout", "/var/log/sifter.log"]
        "#;

        let mut config: Config = toml::from_str(text).unwrap();
        config.validate().unwrap();

        assert_eq!(
            config.server.socket_addr().unwrap(),
            "0.0.0.0:5353".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            config.resolver.upstream_ip().unwrap(),
            "1.1.1.1".parse::<IpAddr>().unwrap()
        );
        assert!(config.collector.anonymize);
        assert_eq!(config.filter.lists.len(), 1);
    }

    #[test]
    fn test_invalid_server_address() {
        let mut config = Config::default();
        config.server.address = "not-an-address".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServerAddress(_))
        ));
    }

    #[test]
    fn test_invalid_network() {
        let mut config = Config::default();
        config.server.network = "sctp".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNetwork(_))
        ));
    }

    #[test]
    fn test_forwarding_requires_upstream() {
        let mut config = Config::default();
        config.resolver.mode = "f".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidResolverUpstream(_))
        ));

        config.resolver.upstream = "9.9.9.9".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_filter_mode() {
        let mut config = Config::default();
        config.filter.mode = "BLACKHOLE".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFilterMode(_))
        ));
    }

    #[test]
    fn test_invalid_collector_backend() {
        let mut config = Config::default();
        config.collector.backend = "postgres".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCollectorBackend(_))
        ));

        // A disabled collector skips backend validation.
        config.collector.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_fall_back() {
        let mut config = Config::default();
        config.collector.max_entries = 0;
        config.collector.interval = 0;
        config.log.outputs.clear();
        config.validate().unwrap();

        assert_eq!(config.collector.max_entries, 1000);
        assert_eq!(config.collector.interval, 900);
        // An explicitly empty output list falls back to the same default
        // as an omitted [log] table.
        assert_eq!(config.log.outputs, LogOptions::default().outputs);
    }
}
