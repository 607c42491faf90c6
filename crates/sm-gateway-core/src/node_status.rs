//! Node status query: the node's own state plus whether it currently hosts
//! active, and swactable, service groups.

use serde::{Deserialize, Serialize};
use sm_state::schema::{group_state, STATE_UNKNOWN};
use sm_state::{RedundancyModel, ServiceGroupAssignment, StateStore};
use tracing::debug;

use crate::domain::ORIGIN_SM;
use crate::obs;

pub const YES: &str = "yes";
pub const NO: &str = "no";

/// Group states that count as hosting service, current or in transition.
const ACTIVE_STATES: [&str; 5] = [
    group_state::ACTIVE,
    group_state::GO_ACTIVE,
    group_state::GO_STANDBY,
    group_state::DISABLING,
    group_state::UNKNOWN,
];

/// Status of one node as reported by `node_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub origin: String,
    pub hostname: String,
    pub admin: String,
    pub oper: String,
    pub avail: String,
    /// `"yes"`, `"no"` or `"unknown"`.
    pub active_services: String,
    /// `"yes"`, `"no"` or `"unknown"`.
    pub swactable_services: String,
}

impl ServiceNode {
    /// Every field unknown; used when the store cannot be read.
    pub fn unknown(hostname: &str) -> Self {
        Self {
            origin: ORIGIN_SM.to_string(),
            hostname: hostname.to_string(),
            admin: STATE_UNKNOWN.to_string(),
            oper: STATE_UNKNOWN.to_string(),
            avail: STATE_UNKNOWN.to_string(),
            active_services: STATE_UNKNOWN.to_string(),
            swactable_services: STATE_UNKNOWN.to_string(),
        }
    }
}

pub struct NodeStatusQuery<'a> {
    store: &'a dyn StateStore,
}

impl<'a> NodeStatusQuery<'a> {
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self { store }
    }

    /// Never fails; a store outage yields [`ServiceNode::unknown`].
    pub async fn query(&self, hostname: &str) -> ServiceNode {
        match self.try_query(hostname).await {
            Ok(status) => status,
            Err(e) => {
                obs::emit_store_error(hostname, &e);
                ServiceNode::unknown(hostname)
            }
        }
    }

    async fn try_query(&self, hostname: &str) -> sm_state::Result<ServiceNode> {
        let (admin, oper, avail) = match self.store.node(hostname).await? {
            Some(node) => (
                node.administrative_state,
                node.operational_state,
                node.availability_status,
            ),
            None => {
                debug!(hostname = %hostname, "node not in store");
                (
                    STATE_UNKNOWN.to_string(),
                    STATE_UNKNOWN.to_string(),
                    STATE_UNKNOWN.to_string(),
                )
            }
        };

        let assignments = self.store.assignments().await?;
        let hosting: Vec<&ServiceGroupAssignment> = assignments
            .iter()
            .filter(|a| a.node_name == hostname && is_hosting(a))
            .collect();

        let mut swactable = false;
        for row in &hosting {
            let member = self
                .store
                .domain_member(&row.domain, &row.service_group_name)
                .await?;
            if member.is_some_and(|m| m.redundancy_model == RedundancyModel::NPlusM) {
                swactable = true;
                break;
            }
        }

        Ok(ServiceNode {
            origin: ORIGIN_SM.to_string(),
            hostname: hostname.to_string(),
            admin,
            oper,
            avail,
            active_services: yes_no(!hosting.is_empty()),
            swactable_services: yes_no(swactable),
        })
    }
}

fn is_hosting(row: &ServiceGroupAssignment) -> bool {
    ACTIVE_STATES.contains(&row.state.as_str()) || ACTIVE_STATES.contains(&row.desired_state.as_str())
}

fn yes_no(flag: bool) -> String {
    let answer = if flag { YES } else { NO };
    answer.to_string()
}
