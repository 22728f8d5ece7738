//! Configuration loading for SynRoute.
//! Reads synroute.toml from the current directory or the path in SYNROUTE_CONFIG.
//! A missing file is not an error: every field has a default that matches the
//! stock deployment, so the server runs without any configuration at all.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub depiction: DepictionConfig,
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 8501 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Hosts the client may contact. Empty means unrestricted.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

fn default_endpoint()             -> String { "https://rxnmapper.ai/api/route".to_string() }
fn default_timeout_secs()         -> u64    { 30 }
fn default_connect_timeout_secs() -> u64    { 10 }

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            allowed_hosts: Vec::new(),
        }
    }
}

impl RouteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepictionConfig {
    /// Edge length of the square structure image, in pixels.
    #[serde(default = "default_depiction_size")]
    pub size: u32,
    /// Longest SMILES string accepted, in characters after trimming.
    /// Parsing, layout and drawing cost grows with input length.
    #[serde(default = "default_max_smiles_len")]
    pub max_smiles_len: usize,
}

fn default_depiction_size() -> u32   { 300 }
fn default_max_smiles_len() -> usize { 500 }

impl Default for DepictionConfig {
    fn default() -> Self {
        Self { size: default_depiction_size(), max_smiles_len: default_max_smiles_len() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageConfig {
    #[serde(default = "default_smiles")]
    pub default_smiles: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_caption")]
    pub caption: String,
}

fn default_smiles()  -> String { "CC(=O)Oc1ccccc1C(=O)O".to_string() }
fn default_title()   -> String { "Synthesis route planning for biomedical compounds".to_string() }
fn default_caption() -> String { "AI platform for the synthesis of biomedical compounds © 2025".to_string() }

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            default_smiles: default_smiles(),
            title: default_title(),
            caption: default_caption(),
        }
    }
}

#[cfg(test)]
mod tests;

impl Config {
    /// Load configuration.
    /// Reads `.env` if present, then SYNROUTE_CONFIG (or ./synroute.toml), then
    /// applies individual environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("SYNROUTE_CONFIG")
            .unwrap_or_else(|_| "synroute.toml".to_string());

        let mut config = Self::from_path_or_default(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `path` if it exists, otherwise fall back to defaults.
    pub fn from_path_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply SYNROUTE_* overrides. `lookup` abstracts the environment so tests
    /// don't have to mutate process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SYNROUTE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SYNROUTE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "SYNROUTE_PORT", value: port })?;
        }
        if let Some(endpoint) = lookup("SYNROUTE_ROUTE_ENDPOINT") {
            self.route.endpoint = endpoint;
        }
        if let Some(secs) = lookup("SYNROUTE_ROUTE_TIMEOUT_SECS") {
            self.route.timeout_secs = secs
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "SYNROUTE_ROUTE_TIMEOUT_SECS", value: secs })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.route.timeout_secs == 0 {
            return Err(ConfigError::Invalid("route.timeout_secs must be greater than zero".into()));
        }
        if self.route.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("route.connect_timeout_secs must be greater than zero".into()));
        }
        if !(64..=2048).contains(&self.depiction.size) {
            return Err(ConfigError::Invalid(format!(
                "depiction.size must be between 64 and 2048, got {}",
                self.depiction.size
            )));
        }
        if self.depiction.max_smiles_len == 0 {
            return Err(ConfigError::Invalid("depiction.max_smiles_len must be greater than zero".into()));
        }
        if self.route.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("route.endpoint must not be empty".into()));
        }
        Ok(())
    }

    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
