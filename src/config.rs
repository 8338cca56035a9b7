//! Server configuration.
//!
//! Values come from an optional YAML file, then environment overrides.
//! Every field has a default, so an empty or missing file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::gemini::connection::ConnectionSettings;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "GEMSERVE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "gemserve.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tls: TlsConfig,
    pub static_files: StaticFilesConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub idle_timeout_ms: u64,
    pub max_request_len: usize,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Document root
    pub root: PathBuf,
    /// File tried first for every path
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tls: TlsConfig::default(),
            static_files: StaticFilesConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1965,
            idle_timeout_ms: 1000,
            max_request_len: 1024,
            chunk_size: 32 * 1024,
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("gemini.crt"),
            key_path: PathBuf::from("gemini.key"),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: "index.gmi".to_string(),
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads the file named by `GEMSERVE_CONFIG` (or `gemserve.yaml`),
    /// falling back to defaults when it does not exist, then applies
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_file_or_default(Path::new(&path))?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Applies `LISTEN` (`host:port`), `GEMSERVE_ROOT`, `GEMSERVE_CERT`
    /// and `GEMSERVE_KEY`. A `LISTEN` without a valid port is an error.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(listen) = std::env::var("LISTEN") {
            match listen.rsplit_once(':').map(|(h, p)| (h, p.parse::<u16>())) {
                Some((host, Ok(port))) => {
                    self.server.host = host.trim_matches(['[', ']']).to_string();
                    self.server.port = port;
                }
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "LISTEN must be host:port, got {:?}",
                        listen
                    )));
                }
            }
        }
        if let Ok(root) = std::env::var("GEMSERVE_ROOT") {
            self.static_files.root = PathBuf::from(root);
        }
        if let Ok(cert) = std::env::var("GEMSERVE_CERT") {
            self.tls.cert_path = PathBuf::from(cert);
        }
        if let Ok(key) = std::env::var("GEMSERVE_KEY") {
            self.tls.key_path = PathBuf::from(key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::Invalid("server.host is empty".into()));
        }
        if self.server.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid("server.idle_timeout_ms must be > 0".into()));
        }
        if self.server.max_request_len == 0 {
            return Err(ConfigError::Invalid("server.max_request_len must be > 0".into()));
        }
        if self.server.chunk_size == 0 {
            return Err(ConfigError::Invalid("server.chunk_size must be > 0".into()));
        }
        if self.static_files.index.is_empty() {
            return Err(ConfigError::Invalid("static_files.index is empty".into()));
        }
        Ok(())
    }

    /// `host:port` string for binding.
    pub fn listen_addr(&self) -> String {
        if self.server.host.contains(':') {
            format!("[{}]:{}", self.server.host, self.server.port)
        } else {
            format!("{}:{}", self.server.host, self.server.port)
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            idle_timeout: Duration::from_millis(self.server.idle_timeout_ms),
            max_request_len: self.server.max_request_len,
            chunk_size: self.server.chunk_size,
        }
    }
}
