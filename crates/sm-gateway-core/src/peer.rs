//! Peer state probe.
//!
//! Asks a peer node's own gateway for one service's desired and current
//! state over `GET /v1/services/{name}`. Any failure (connection, timeout,
//! non-2xx, undecodable body) is reported as [`PeerServiceState::Unavailable`]
//! rather than an error, so the lock check can branch on data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::GatewayError;
use crate::obs;

pub const DEFAULT_PEER_PORT: u16 = 7777;
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(10);
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// What a peer reported about a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerServiceState {
    Found { desired_state: String, state: String },
    Unavailable,
}

impl PeerServiceState {
    /// Desired and actual state are both `enabled-active`.
    pub fn is_enabled_active(&self) -> bool {
        match self {
            PeerServiceState::Found {
                desired_state,
                state,
            } => {
                desired_state == sm_state::schema::service_state::ENABLED_ACTIVE
                    && state == sm_state::schema::service_state::ENABLED_ACTIVE
            }
            PeerServiceState::Unavailable => false,
        }
    }
}

/// Source of per-service state on other nodes.
#[async_trait]
pub trait PeerStateProbe: Send + Sync {
    async fn service_state(
        &self,
        node_name: &str,
        service_name: &str,
        auth_token: Option<&str>,
    ) -> PeerServiceState;
}

/// Why a probe produced no data; logged, never returned to callers.
#[derive(Debug, Error)]
enum ProbeFailure {
    #[error("invalid peer url: {0}")]
    Url(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("peer answered {0}")]
    Status(reqwest::StatusCode),
}

/// Peer probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerProbeConfig {
    pub scheme: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for PeerProbeConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            port: DEFAULT_PEER_PORT,
            timeout: DEFAULT_PEER_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceBody {
    desired_state: Option<String>,
    state: Option<String>,
}

/// `reqwest`-based peer probe. One request per call, no retry.
#[derive(Debug, Clone)]
pub struct HttpPeerStateClient {
    config: PeerProbeConfig,
    http_client: reqwest::Client,
}

impl HttpPeerStateClient {
    pub fn new(config: PeerProbeConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("sm-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// URL of a service resource on a peer's gateway.
    pub fn service_url(&self, node_name: &str, service_name: &str) -> Result<Url, String> {
        let mut url = Url::parse(&format!(
            "{}://{}:{}/",
            self.config.scheme, node_name, self.config.port
        ))
        .map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| "url cannot be a base".to_string())?
            .pop_if_empty()
            .extend(["v1", "services", service_name]);
        Ok(url)
    }

    async fn fetch(
        &self,
        node_name: &str,
        service_name: &str,
        auth_token: Option<&str>,
    ) -> Result<ServiceBody, ProbeFailure> {
        let url = self
            .service_url(node_name, service_name)
            .map_err(ProbeFailure::Url)?;
        debug!(url = %url, "probing peer service state");

        let mut request = self.http_client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = auth_token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ProbeFailure::Status(response.status()));
        }
        Ok(response.json::<ServiceBody>().await?)
    }
}

#[async_trait]
impl PeerStateProbe for HttpPeerStateClient {
    async fn service_state(
        &self,
        node_name: &str,
        service_name: &str,
        auth_token: Option<&str>,
    ) -> PeerServiceState {
        match self.fetch(node_name, service_name, auth_token).await {
            Ok(ServiceBody {
                desired_state: Some(desired_state),
                state: Some(state),
            }) => PeerServiceState::Found {
                desired_state,
                state,
            },
            Ok(_) => {
                obs::emit_peer_probe_unavailable(node_name, service_name, &"state fields missing");
                PeerServiceState::Unavailable
            }
            Err(e) => {
                obs::emit_peer_probe_unavailable(node_name, service_name, &e);
                PeerServiceState::Unavailable
            }
        }
    }
}
