//! Unix datagram client for the SM engine's SET_NODE protocol.
//!
//! One exchange is: bind a client socket path, send the request to the
//! engine's well-known path, then receive until an ack with a matching seqno
//! arrives. Receives are bounded both by a total time budget and by an
//! attempt ceiling; non-matching acks are discarded. The client socket path
//! is removed on every exit path.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UnixDatagram;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::codec::{peek_seqno, AckFields, CodecError, SetNodeRequest, MAX_MSG_SIZE};
use super::NodeStateSender;
use crate::obs;

pub const DEFAULT_ENGINE_SOCKET_PATH: &str = "/tmp/.sm_server_api";
pub const DEFAULT_CLIENT_SOCKET_PATH: &str = "/tmp/.sm_client_api";
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(6);
pub const DEFAULT_ACK_ATTEMPTS: u32 = 5;

/// Failures of a single protocol exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("no ack for seqno {seqno} within {timeout:?}")]
    Timeout { seqno: u64, timeout: Duration },

    #[error("no matching ack for seqno {seqno} after {attempts} receives")]
    Exhausted { seqno: u64, attempts: u32 },
}

/// Socket paths and receive bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Well-known path the engine listens on.
    pub engine_socket_path: PathBuf,
    /// Base path for the client's own socket; suffixed with the seqno.
    pub client_socket_path: PathBuf,
    /// Total receive budget per exchange.
    pub ack_timeout: Duration,
    /// Maximum receives per exchange.
    pub ack_attempts: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            engine_socket_path: PathBuf::from(DEFAULT_ENGINE_SOCKET_PATH),
            client_socket_path: PathBuf::from(DEFAULT_CLIENT_SOCKET_PATH),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            ack_attempts: DEFAULT_ACK_ATTEMPTS,
        }
    }
}

/// Removes the bound client socket path when dropped.
struct BoundPath(PathBuf);

impl BoundPath {
    /// Clear any stale file at `path` and claim it.
    fn claim(path: PathBuf) -> io::Result<Self> {
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale client socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for BoundPath {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.0.display(), error = %e, "failed to remove client socket");
            }
        }
    }
}

/// Client for the engine's SET_NODE protocol.
///
/// Owns the sequence counter: callers that share one client share the
/// counter, and every value handed out is strictly greater than the last.
#[derive(Debug)]
pub struct CommandProtocolClient {
    config: ProtocolConfig,
    seqno: AtomicU64,
}

impl CommandProtocolClient {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            seqno: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Increment the counter and return the new value.
    pub fn next_seqno(&self) -> u64 {
        self.seqno.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last value handed out by [`next_seqno`](Self::next_seqno).
    pub fn current_seqno(&self) -> u64 {
        self.seqno.load(Ordering::SeqCst)
    }

    /// Relay a node state change to the engine.
    ///
    /// Never fails: any socket, timeout or decode problem yields
    /// [`AckFields::unknown`] so callers always get comparable fields.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_node_state(
        &self,
        origin: &str,
        hostname: &str,
        action: &str,
        admin: &str,
        avail: &str,
        oper: &str,
        seqno: u64,
    ) -> AckFields {
        let request = SetNodeRequest {
            seqno,
            origin: origin.to_string(),
            node_name: hostname.to_string(),
            action: action.to_string(),
            admin: admin.to_string(),
            oper: oper.to_string(),
            avail: avail.to_string(),
        };
        self.send(&request).await
    }

    /// Send an already-built request; see [`set_node_state`](Self::set_node_state).
    pub async fn send(&self, request: &SetNodeRequest) -> AckFields {
        match self.exchange(request).await {
            Ok(ack) => {
                obs::emit_ack_received(request.seqno, &ack.node_name, &ack.admin, &ack.oper);
                ack
            }
            Err(e) => {
                obs::emit_protocol_failure(request.seqno, &request.node_name, &e);
                AckFields::unknown(&request.node_name, &request.action)
            }
        }
    }

    #[instrument(skip(self, request), fields(seqno = request.seqno, node = %request.node_name))]
    async fn exchange(&self, request: &SetNodeRequest) -> Result<AckFields, ProtocolError> {
        let message = request.encode()?;
        debug!(message = %message, "sending to SM engine");

        let bound = BoundPath::claim(self.client_path(request.seqno))?;
        let socket = UnixDatagram::bind(bound.path())?;
        socket
            .send_to(message.as_bytes(), &self.config.engine_socket_path)
            .await?;

        self.await_ack(&socket, request.seqno).await
    }

    async fn await_ack(
        &self,
        socket: &UnixDatagram,
        seqno: u64,
    ) -> Result<AckFields, ProtocolError> {
        let deadline = Instant::now() + self.config.ack_timeout;
        let mut buf = vec![0u8; MAX_MSG_SIZE];
        let expected = seqno.to_string();

        for attempt in 1..=self.config.ack_attempts {
            let len = match tokio::time::timeout_at(deadline, socket.recv(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => {
                    return Err(ProtocolError::Timeout {
                        seqno,
                        timeout: self.config.ack_timeout,
                    })
                }
            };
            let datagram = &buf[..len];

            match AckFields::decode(datagram) {
                Ok(ack) if ack.seqno == expected => return Ok(ack),
                Ok(ack) => {
                    debug!(attempt, rx_seqno = %ack.seqno, "discarding ack with mismatched seqno");
                }
                Err(e) if peek_seqno(datagram).as_deref() == Some(expected.as_str()) => {
                    // our reply, but unusable
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "discarding malformed datagram");
                }
            }
        }

        Err(ProtocolError::Exhausted {
            seqno,
            attempts: self.config.ack_attempts,
        })
    }

    fn client_path(&self, seqno: u64) -> PathBuf {
        let mut path = self.config.client_socket_path.clone().into_os_string();
        path.push(format!(".{seqno}"));
        PathBuf::from(path)
    }
}

impl Default for CommandProtocolClient {
    fn default() -> Self {
        Self::new(ProtocolConfig::default())
    }
}

#[async_trait]
impl NodeStateSender for CommandProtocolClient {
    fn next_seqno(&self) -> u64 {
        CommandProtocolClient::next_seqno(self)
    }

    async fn send(&self, request: SetNodeRequest) -> AckFields {
        CommandProtocolClient::send(self, &request).await
    }
}
