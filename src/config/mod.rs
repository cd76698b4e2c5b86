//! Configuration management
//!
//! `Config` is the on-disk / command-line shape (TOML, every key optional).
//! It is validated once and turned into an immutable `ClientConfig` that
//! every client in the pool gets its own copy of.

use crate::client::{LineEnding, SizeRange};
use crate::proxy::ProxyEndpoint;
use crate::transport::TransportConfig;
use crate::{Error, DEFAULT_PORT, DEFAULT_TLS_PORT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to connect to
    pub target: TargetConfig,
    /// How hard and how slowly to push
    pub attack: AttackConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml_string(&self) -> Result<String, Error> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Effective target port: explicit, else 443 with TLS, else 80
    pub fn port(&self) -> u16 {
        self.target.port.unwrap_or(if self.target.ssl {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        })
    }

    /// Check every option, failing on the first invalid one
    pub fn validate(&self) -> Result<(), Error> {
        let host = &self.target.host;
        if host.is_empty() {
            return Err(Error::Config("target host is required".to_string()));
        }
        if host.chars().any(|c| c.is_whitespace() || c == '\0') {
            return Err(Error::Config(format!("invalid target host '{}'", host.escape_debug())));
        }
        if !self.target.path.starts_with('/') {
            return Err(Error::Config(format!(
                "path must start with '/', got '{}'",
                self.target.path
            )));
        }
        if self.attack.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.attack.min_chunk_size == 0 {
            return Err(Error::Config("min chunk size must be at least 1".to_string()));
        }

        self.chunk_size()?;
        self.body_size()?;
        seconds("body send delay", self.attack.body_send_delay)?;
        seconds("connection delay", self.attack.connection_delay)?;
        if let Some(timeout) = self.target.connect_timeout {
            seconds("connect timeout", timeout)?;
        }
        self.proxy()?;

        Ok(())
    }

    fn chunk_size(&self) -> Result<SizeRange, Error> {
        SizeRange::new(self.attack.min_chunk_size, self.attack.max_chunk_size).ok_or_else(|| {
            Error::Config(format!(
                "min chunk size {} exceeds max chunk size {}",
                self.attack.min_chunk_size, self.attack.max_chunk_size
            ))
        })
    }

    fn body_size(&self) -> Result<SizeRange, Error> {
        SizeRange::new(self.attack.min_body_size, self.attack.max_body_size).ok_or_else(|| {
            Error::Config(format!(
                "min body size {} exceeds max body size {}",
                self.attack.min_body_size, self.attack.max_body_size
            ))
        })
    }

    fn proxy(&self) -> Result<Option<ProxyEndpoint>, Error> {
        self.target
            .socks_proxy
            .as_deref()
            .filter(|proxy| !proxy.is_empty())
            .map(|proxy| proxy.parse::<ProxyEndpoint>().map_err(|e| Error::Config(e.to_string())))
            .transpose()
    }

    /// Build the immutable client template. Validates first.
    pub fn client_config(&self) -> Result<ClientConfig, Error> {
        self.validate()?;

        Ok(ClientConfig {
            name: String::new(),
            host: self.target.host.clone(),
            port: self.port(),
            path: self.target.path.clone(),
            tls: self.target.ssl,
            proxy: self.proxy()?,
            chunk_size: self.chunk_size()?,
            body_size: self.body_size()?,
            body_send_delay: seconds("body send delay", self.attack.body_send_delay)?,
            connection_delay: seconds("connection delay", self.attack.connection_delay)?,
            user_agent: self
                .target
                .user_agent
                .clone()
                .filter(|user_agent| !user_agent.is_empty()),
            line_ending: self.target.line_ending,
        })
    }

    /// Transport settings shared by every client
    pub fn transport_config(&self) -> Result<TransportConfig, Error> {
        let connect_timeout = self
            .target
            .connect_timeout
            .map(|timeout| seconds("connect timeout", timeout))
            .transpose()?;

        Ok(TransportConfig {
            connect_timeout,
            insecure: self.target.insecure,
            ..TransportConfig::default()
        })
    }
}

fn seconds(what: &str, value: f64) -> Result<Duration, Error> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| Error::Config(format!("{} must be a non-negative number of seconds, got {}", what, value)))
}

/// Target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Target hostname or IP address
    pub host: String,
    /// Target port, defaults to 80 (443 with `ssl`)
    pub port: Option<u16>,
    /// Request path
    pub path: String,
    /// Wrap connections in TLS
    pub ssl: bool,
    /// Accept any server certificate
    pub insecure: bool,
    /// SOCKS4 proxy as `HOST:PORT`
    pub socks_proxy: Option<String>,
    /// User-Agent header value, omitted when empty
    pub user_agent: Option<String>,
    /// Header line terminator
    pub line_ending: LineEnding,
    /// TCP connect timeout in seconds
    pub connect_timeout: Option<f64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            path: "/".to_string(),
            ssl: false,
            insecure: false,
            socks_proxy: None,
            user_agent: None,
            line_ending: LineEnding::Lf,
            connect_timeout: None,
        }
    }
}

/// Load shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Number of simultaneous clients
    pub concurrency: usize,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub min_body_size: usize,
    pub max_body_size: usize,
    /// Seconds between a chunk draining and the next chunk
    pub body_send_delay: f64,
    /// Base seconds before reconnecting, hard failures wait five times longer
    pub connection_delay: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            min_chunk_size: 1,
            max_chunk_size: 10,
            min_body_size: 1_000_000,
            max_body_size: 10_000_000,
            body_send_delay: 10.0,
            connection_delay: 1.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Immutable per-client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Display name used in log lines
    pub name: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub tls: bool,
    pub proxy: Option<ProxyEndpoint>,
    pub chunk_size: SizeRange,
    pub body_size: SizeRange,
    pub body_send_delay: Duration,
    pub connection_delay: Duration,
    pub user_agent: Option<String>,
    pub line_ending: LineEnding,
}

impl ClientConfig {
    /// Config with default sizes and delays
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        let attack = AttackConfig::default();
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            path: "/".to_string(),
            tls: false,
            proxy: None,
            chunk_size: SizeRange::exactly(attack.min_chunk_size),
            body_size: SizeRange::exactly(attack.min_body_size),
            body_send_delay: Duration::from_secs_f64(attack.body_send_delay),
            connection_delay: Duration::from_secs_f64(attack.connection_delay),
            user_agent: None,
            line_ending: LineEnding::Lf,
        }
    }

    /// Same configuration under another display name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// `host:port` of the target
    pub fn target_addr(&self) -> String {
        ProxyEndpoint::new(self.host.clone(), self.port).addr()
    }

    /// Where the TCP connection goes: the proxy if one is set, else the target
    pub fn connect_addr(&self) -> String {
        match &self.proxy {
            Some(proxy) => proxy.addr(),
            None => self.target_addr(),
        }
    }
}

/// Generate example configuration
pub fn generate_example_config() -> Config {
    Config {
        target: TargetConfig {
            host: "localhost".to_string(),
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64)".to_string()),
            ..TargetConfig::default()
        },
        ..Config::default()
    }
}
