//! Service configuration with validation.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. [`Config::load`] runs all three and validates the
//! result, so a bad timeout or network name stops the process at startup.
//!
//! # Config File Format
//!
//! ```toml
//! [logging]
//! level = "info"
//! healthchecks = false
//!
//! [api]
//! address = "0.0.0.0"
//! port = 8090
//!
//! [metrics]
//! port = 8081
//!
//! [node]
//! network = "preprod"
//! socket_path = "/node-ipc/node.socket"
//! timeout = 30
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use submit_telemetry::LoggingConfig;

use crate::domain::types::NodeTarget;

/// Socket used when neither a socket path nor a TCP endpoint is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/node-ipc/node.socket";

/// Largest accepted timeout: `i64::MAX` nanoseconds, in whole seconds.
pub const MAX_TIMEOUT_SECS: i64 = i64::MAX / 1_000_000_000;

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level and format
    pub logging: LoggingConfig,
    /// Public HTTP listener
    pub api: ApiConfig,
    /// Prometheus listener
    pub metrics: MetricsConfig,
    /// Node connection
    pub node: NodeConfig,
}

/// Public HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub address: String,
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_request_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8090,
            max_request_size: 64 * 1024,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        bind_address(&self.address, self.port)
    }
}

/// Prometheus listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Empty means all interfaces
    pub address: String,
    pub port: u16,
    /// Requests slower than this are counted in `http_slow_requests_total`
    pub slow_request_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8081,
            slow_request_ms: 5000,
        }
    }
}

impl MetricsConfig {
    pub fn bind_address(&self) -> String {
        bind_address(&self.address, self.port)
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}

/// Node connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Named network, used to derive the magic when `network_magic` is 0
    pub network: String,
    /// Explicit network magic; 0 means derive from `network`
    pub network_magic: u32,
    /// TCP host of the node
    pub address: Option<String>,
    /// TCP port of the node; 0 disables TCP
    pub port: u16,
    /// UNIX socket of the node; wins over TCP when set
    pub socket_path: Option<PathBuf>,
    /// Skip the startup connectivity check
    pub skip_check: bool,
    /// Per-request timeout in seconds
    pub timeout: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            network_magic: 0,
            address: None,
            port: 0,
            socket_path: None,
            skip_check: false,
            timeout: 30,
        }
    }
}

impl NodeConfig {
    /// Where to dial. A non-empty socket path wins, then host and port, then
    /// [`DEFAULT_SOCKET_PATH`].
    pub fn target(&self) -> NodeTarget {
        if let Some(path) = self.socket_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return NodeTarget::Unix(path.clone());
        }
        match &self.address {
            Some(host) if !host.is_empty() && self.port > 0 => NodeTarget::Tcp {
                host: host.clone(),
                port: self.port,
            },
            _ => NodeTarget::Unix(PathBuf::from(DEFAULT_SOCKET_PATH)),
        }
    }

    /// The configured magic, or the one of the named network.
    pub fn network_magic(&self) -> Result<u32, ConfigError> {
        if self.network_magic != 0 {
            return Ok(self.network_magic);
        }
        network_magic_for(&self.network)
            .ok_or_else(|| ConfigError::UnknownNetwork(self.network.clone()))
    }

    /// The request timeout, rejected if it is not positive or does not fit
    /// a nanosecond `i64`.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        if self.timeout <= 0 {
            return Err(ConfigError::InvalidTimeout(format!(
                "timeout must be positive, got {}",
                self.timeout
            )));
        }
        if self.timeout > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidTimeout(format!(
                "given timeout too large: {} (max {})",
                self.timeout, MAX_TIMEOUT_SECS
            )));
        }
        Ok(Duration::from_secs(self.timeout as u64))
    }
}

/// Magic numbers of the well-known networks.
pub fn network_magic_for(network: &str) -> Option<u32> {
    match network {
        "mainnet" => Some(764_824_073),
        "preprod" => Some(1),
        "preview" => Some(2),
        "sanchonet" => Some(4),
        "testnet" => Some(1_097_911_063),
        _ => None,
    }
}

impl Config {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Overrides values from environment variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        if let Some(level) = env.string("LOGGING_LEVEL") {
            self.logging.level = level;
        }
        env.parse_bool("LOGGING_HEALTHCHECKS", &mut self.logging.healthchecks)?;
        env.parse_bool("LOGGING_JSON", &mut self.logging.json)?;

        if let Some(address) = env.string("API_LISTEN_ADDRESS") {
            self.api.address = address;
        }
        env.parse_number("API_LISTEN_PORT", &mut self.api.port)?;
        env.parse_number("API_MAX_REQUEST_SIZE", &mut self.api.max_request_size)?;

        if let Some(address) = env.string("METRICS_LISTEN_ADDRESS") {
            self.metrics.address = address;
        }
        env.parse_number("METRICS_LISTEN_PORT", &mut self.metrics.port)?;

        if let Some(network) = env.string("CARDANO_NETWORK") {
            self.node.network = network;
        }
        env.parse_number("CARDANO_NODE_NETWORK_MAGIC", &mut self.node.network_magic)?;
        if let Some(host) = env.string("CARDANO_NODE_SOCKET_TCP_HOST") {
            self.node.address = Some(host);
        }
        env.parse_number("CARDANO_NODE_SOCKET_TCP_PORT", &mut self.node.port)?;
        // an empty path counts as unset
        if let Some(path) = env.string("CARDANO_NODE_SOCKET_PATH").filter(|p| !p.is_empty()) {
            self.node.socket_path = Some(PathBuf::from(path));
        }
        env.parse_bool("CARDANO_NODE_SKIP_CHECK", &mut self.node.skip_check)?;
        env.parse_number("CARDANO_NODE_SOCKET_TIMEOUT", &mut self.node.timeout)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        submit_telemetry::parse_level(&self.logging.level)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.api.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        self.node.network_magic()?;
        self.node.timeout()?;

        Ok(())
    }
}

fn bind_address(address: &str, port: u16) -> String {
    match address {
        "" => format!("0.0.0.0:{}", port),
        v6 if v6.contains(':') && !v6.starts_with('[') => format!("[{}]:{}", v6, port),
        host => format!("{}:{}", host, port),
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }

    fn parse_number<T>(&self, name: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.string(name) {
            *target = value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
                name: name.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn parse_bool(&self, name: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = self.string(name) {
            *target = parse_bool(&value).ok_or_else(|| ConfigError::Env {
                name: name.to_string(),
                value: value.clone(),
                reason: "expected a boolean".into(),
            })?;
        }
        Ok(())
    }
}

/// Boolean spellings accepted in environment variables.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("error reading config file {path}: {error}")]
    Io { path: String, error: String },
    /// Config file is not valid TOML for this schema
    #[error("error parsing config file: {0}")]
    Parse(String),
    /// Environment variable with an unparseable value
    #[error("invalid value {value:?} for {name}: {reason}")]
    Env {
        name: String,
        value: String,
        reason: String,
    },
    /// Network name with no known magic
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
