//! Gateway configuration.
//!
//! Sources, later wins: built-in defaults, an optional TOML file, then
//! `SM_GATEWAY_*` environment variables. The CLI applies its own flags last.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::peer::{PeerProbeConfig, DEFAULT_PEER_PORT, DEFAULT_PEER_TIMEOUT};
use crate::protocol::client::{
    DEFAULT_ACK_ATTEMPTS, DEFAULT_ACK_TIMEOUT, DEFAULT_CLIENT_SOCKET_PATH,
    DEFAULT_ENGINE_SOCKET_PATH,
};
use crate::protocol::ProtocolConfig;

pub const ENV_PREFIX: &str = "SM_GATEWAY_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime settings for one gateway instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// This node's hostname; peers with this name are never probed as
    /// alternates during the lock check.
    pub local_hostname: String,
    pub engine_socket_path: PathBuf,
    pub client_socket_path: PathBuf,
    pub ack_timeout_ms: u64,
    pub ack_attempts: u32,
    pub peer_port: u16,
    pub peer_timeout_ms: u64,
    /// Forwarded to peers as `X-Auth-Token` when a request carries none.
    pub auth_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            local_hostname: String::new(),
            engine_socket_path: PathBuf::from(DEFAULT_ENGINE_SOCKET_PATH),
            client_socket_path: PathBuf::from(DEFAULT_CLIENT_SOCKET_PATH),
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT.as_millis() as u64,
            ack_attempts: DEFAULT_ACK_ATTEMPTS,
            peer_port: DEFAULT_PEER_PORT,
            peer_timeout_ms: DEFAULT_PEER_TIMEOUT.as_millis() as u64,
            auth_token: None,
        }
    }
}

impl GatewayConfig {
    pub fn new(local_hostname: impl Into<String>) -> Self {
        Self {
            local_hostname: local_hostname.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Override fields from `SM_GATEWAY_*` variables resolved by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let var = format!("{ENV_PREFIX}{name}");
            lookup(&var).map(|value| (var, value))
        };

        if let Some((_, v)) = get("LOCAL_HOSTNAME") {
            self.local_hostname = v;
        }
        if let Some((_, v)) = get("ENGINE_SOCKET_PATH") {
            self.engine_socket_path = PathBuf::from(v);
        }
        if let Some((_, v)) = get("CLIENT_SOCKET_PATH") {
            self.client_socket_path = PathBuf::from(v);
        }
        if let Some((var, v)) = get("ACK_TIMEOUT_MS") {
            self.ack_timeout_ms = parse_env(var, v)?;
        }
        if let Some((var, v)) = get("ACK_ATTEMPTS") {
            self.ack_attempts = parse_env(var, v)?;
        }
        if let Some((var, v)) = get("PEER_PORT") {
            self.peer_port = parse_env(var, v)?;
        }
        if let Some((var, v)) = get("PEER_TIMEOUT_MS") {
            self.peer_timeout_ms = parse_env(var, v)?;
        }
        if let Some((_, v)) = get("AUTH_TOKEN") {
            self.auth_token = Some(v);
        }
        Ok(())
    }

    pub fn with_local_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.local_hostname = hostname.into();
        self
    }

    pub fn with_engine_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_socket_path = path.into();
        self
    }

    pub fn with_client_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_socket_path = path.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_hostname.is_empty() {
            return Err(ConfigError::Missing("local_hostname"));
        }
        if self.ack_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "ack_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn protocol_config(&self) -> ProtocolConfig {
        ProtocolConfig {
            engine_socket_path: self.engine_socket_path.clone(),
            client_socket_path: self.client_socket_path.clone(),
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            ack_attempts: self.ack_attempts,
        }
    }

    pub fn peer_config(&self) -> PeerProbeConfig {
        PeerProbeConfig {
            port: self.peer_port,
            timeout: Duration::from_millis(self.peer_timeout_ms),
            ..PeerProbeConfig::default()
        }
    }
}

fn parse_env<T: FromStr>(var: String, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
