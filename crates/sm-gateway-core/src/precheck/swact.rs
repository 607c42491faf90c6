//! Swact pre-check.
//!
//! Decides whether service can safely move away from a node: every peer
//! assignment must sit on an unlocked, enabled node, and each non
//! active-active service group on the peer must be settled and healthy
//! enough to take over. The first failing row, in service-group order, wins.

use std::collections::HashMap;

use sm_state::schema::{group_condition, group_state, group_status};
use sm_state::{ServiceGroupAssignment, StateStore};
use thiserror::Error;
use tracing::{debug, info};

/// Why a swact away from a node is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwactRefusal {
    #[error("{peer} is not ready to take service, {peer} is locked")]
    PeerLocked { peer: String },

    #[error("{peer} is not ready to take service, {peer} is disabled")]
    PeerDisabled { peer: String },

    #[error(
        "{group} on {peer} is not ready to take service, \
         service not in the active or standby state"
    )]
    NotActiveOrStandby { group: String, peer: String },

    #[error("{group} on {peer} is not ready to take service, services transitioning state")]
    Transitioning { group: String, peer: String },

    #[error("{group} on {peer} is not ready to take service, service is failed")]
    Failed { group: String, peer: String },

    #[error("{group} on {peer} is not ready to take service, service is syncing data")]
    SyncingData { group: String, peer: String },

    #[error("{group} on {peer} is not ready to take service, service is degraded, {condition}")]
    DegradedCondition {
        group: String,
        peer: String,
        condition: String,
    },

    #[error("{group} on {peer} is not ready to take service, service is degraded")]
    Degraded { group: String, peer: String },

    #[error("no peer available")]
    NoPeerAvailable,
}

const DEGRADED_CONDITIONS: [&str; 4] = [
    group_condition::DATA_INCONSISTENT,
    group_condition::DATA_OUTDATED,
    group_condition::DATA_CONSISTENT,
    group_condition::DATA_STANDALONE,
];

/// Swact safety check over a state store.
pub struct SwactPreCheck<'a> {
    store: &'a dyn StateStore,
}

impl<'a> SwactPreCheck<'a> {
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self { store }
    }

    /// `Ok(None)` means it is safe to swact away from `hostname`.
    pub async fn check(&self, hostname: &str) -> sm_state::Result<Option<SwactRefusal>> {
        let assignments = self.store.assignments().await?;
        let origin_state = collect_origin_state(&assignments, hostname);
        debug!(?origin_state, "origin service-group states");

        let active_active: HashMap<(String, String), bool> = self
            .store
            .domain_members()
            .await?
            .into_iter()
            .map(|m| {
                let aa = m.is_active_active();
                ((m.domain, m.service_group_name), aa)
            })
            .collect();

        let mut have_destination = false;
        for row in assignments.iter().filter(|a| a.node_name != hostname) {
            have_destination = true;

            if let Some(refusal) = self.check_peer_node(&row.node_name).await? {
                return Ok(Some(log_refusal(hostname, refusal)));
            }

            let key = (row.domain.clone(), row.service_group_name.clone());
            if active_active.get(&key).copied().unwrap_or(false) {
                debug!(
                    group = %row.service_group_name,
                    peer = %row.node_name,
                    "active-active group, skipping readiness checks"
                );
                continue;
            }

            if let Some(refusal) = check_group_readiness(row, &origin_state) {
                return Ok(Some(log_refusal(hostname, refusal)));
            }
        }

        if !have_destination {
            return Ok(Some(log_refusal(hostname, SwactRefusal::NoPeerAvailable)));
        }
        Ok(None)
    }

    async fn check_peer_node(&self, peer: &str) -> sm_state::Result<Option<SwactRefusal>> {
        // a peer with no node row reads as unknown and passes both checks
        let Some(node) = self.store.node(peer).await? else {
            return Ok(None);
        };
        if node.is_locked() {
            return Ok(Some(SwactRefusal::PeerLocked {
                peer: peer.to_string(),
            }));
        }
        if node.is_disabled() {
            return Ok(Some(SwactRefusal::PeerDisabled {
                peer: peer.to_string(),
            }));
        }
        Ok(None)
    }
}

/// service group -> state, for rows on the node giving up service.
fn collect_origin_state<'r>(
    assignments: &'r [ServiceGroupAssignment],
    hostname: &str,
) -> HashMap<&'r str, &'r str> {
    assignments
        .iter()
        .filter(|a| a.node_name == hostname)
        .map(|a| (a.service_group_name.as_str(), a.state.as_str()))
        .collect()
}

fn check_group_readiness(
    row: &ServiceGroupAssignment,
    origin_state: &HashMap<&str, &str>,
) -> Option<SwactRefusal> {
    let group = || row.service_group_name.clone();
    let peer = || row.node_name.clone();

    let settled = row.state == group_state::ACTIVE || row.state == group_state::STANDBY;
    let state_matches_origin = match origin_state.get(row.service_group_name.as_str()) {
        None => true,
        Some(origin) => *origin == row.state,
    };
    if !settled && !state_matches_origin {
        return Some(SwactRefusal::NotActiveOrStandby {
            group: group(),
            peer: peer(),
        });
    }

    if row.desired_state != row.state {
        return Some(SwactRefusal::Transitioning {
            group: group(),
            peer: peer(),
        });
    }

    if row.status == group_status::FAILED {
        return Some(SwactRefusal::Failed {
            group: group(),
            peer: peer(),
        });
    }

    if row.status == group_status::DEGRADED {
        if row.condition == group_condition::DATA_SYNC {
            return Some(SwactRefusal::SyncingData {
                group: group(),
                peer: peer(),
            });
        }
        if DEGRADED_CONDITIONS.contains(&row.condition.as_str()) {
            return Some(SwactRefusal::DegradedCondition {
                group: group(),
                peer: peer(),
                condition: row.condition.clone(),
            });
        }
        return Some(SwactRefusal::Degraded {
            group: group(),
            peer: peer(),
        });
    }

    None
}

fn log_refusal(hostname: &str, refusal: SwactRefusal) -> SwactRefusal {
    info!(hostname = %hostname, reason = %refusal, "swact pre-check failed");
    refusal
}
