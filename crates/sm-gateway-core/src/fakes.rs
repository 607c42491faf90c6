//! In-memory fakes for the gateway's outbound seams (testing only)
//!
//! Provides `StaticPeerProbe` and `RecordingSender` that satisfy the
//! `PeerStateProbe` and `NodeStateSender` contracts without sockets or HTTP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::peer::{PeerServiceState, PeerStateProbe};
use crate::protocol::codec::MSG_TYPE_SET_NODE_ACK;
use crate::protocol::{AckFields, NodeStateSender, SetNodeRequest};

// ---------------------------------------------------------------------------
// StaticPeerProbe
// ---------------------------------------------------------------------------

/// One recorded probe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCall {
    pub node_name: String,
    pub service_name: String,
    pub auth_token: Option<String>,
}

/// Peer probe answering from a fixed `(node, service)` table.
///
/// Unlisted pairs answer `Unavailable`.
#[derive(Debug, Default)]
pub struct StaticPeerProbe {
    states: Mutex<HashMap<(String, String), PeerServiceState>>,
    calls: Mutex<Vec<ProbeCall>>,
}

impl StaticPeerProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node_name: &str, service_name: &str, state: PeerServiceState) {
        self.states
            .lock()
            .unwrap()
            .insert((node_name.to_string(), service_name.to_string()), state);
    }

    /// Shorthand for a service reported enabled-active/enabled-active.
    pub fn set_enabled_active(&self, node_name: &str, service_name: &str) {
        self.set(
            node_name,
            service_name,
            PeerServiceState::Found {
                desired_state: sm_state::schema::service_state::ENABLED_ACTIVE.to_string(),
                state: sm_state::schema::service_state::ENABLED_ACTIVE.to_string(),
            },
        );
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerStateProbe for StaticPeerProbe {
    async fn service_state(
        &self,
        node_name: &str,
        service_name: &str,
        auth_token: Option<&str>,
    ) -> PeerServiceState {
        self.calls.lock().unwrap().push(ProbeCall {
            node_name: node_name.to_string(),
            service_name: service_name.to_string(),
            auth_token: auth_token.map(str::to_string),
        });
        self.states
            .lock()
            .unwrap()
            .get(&(node_name.to_string(), service_name.to_string()))
            .cloned()
            .unwrap_or(PeerServiceState::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// RecordingSender
// ---------------------------------------------------------------------------

/// How `RecordingSender` answers a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckBehavior {
    /// Echo the request back as the engine would on success.
    Echo,
    /// Echo, but report these admin/oper values instead.
    Override { admin: String, oper: String },
    /// Behave as if no ack arrived.
    Unknown,
}

/// Engine transport that records requests instead of sending them.
#[derive(Debug)]
pub struct RecordingSender {
    seqno: AtomicU64,
    behavior: Mutex<AckBehavior>,
    sent: Mutex<Vec<SetNodeRequest>>,
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new(AckBehavior::Echo)
    }
}

impl RecordingSender {
    pub fn new(behavior: AckBehavior) -> Self {
        Self {
            seqno: AtomicU64::new(0),
            behavior: Mutex::new(behavior),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: AckBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn sent(&self) -> Vec<SetNodeRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NodeStateSender for RecordingSender {
    fn next_seqno(&self) -> u64 {
        self.seqno.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn send(&self, request: SetNodeRequest) -> AckFields {
        self.sent.lock().unwrap().push(request.clone());

        let (admin, oper) = match self.behavior.lock().unwrap().clone() {
            AckBehavior::Echo => (request.admin.clone(), request.oper.clone()),
            AckBehavior::Override { admin, oper } => (admin, oper),
            AckBehavior::Unknown => {
                return AckFields::unknown(&request.node_name, &request.action)
            }
        };
        AckFields {
            version: "1".to_string(),
            revision: "1".to_string(),
            seqno: request.seqno.to_string(),
            msg_type: MSG_TYPE_SET_NODE_ACK.to_string(),
            origin: "sm".to_string(),
            node_name: request.node_name,
            action: request.action,
            admin,
            oper,
            avail: request.avail,
        }
    }
}
