//! Record types for the service-management tables
//!
//! Tables (owned and written by the SM engine):
//! - sm_nodes: Node administrative / operational / availability state
//! - sm_service_domain_assignments: Node x service-group assignment state
//! - sm_service_domain_members: Redundancy configuration per service group
//! - sm_services: Individual service state
//! - sm_service_group_members: Service membership and failure impact
//!
//! State fields are kept as the engine's own strings; the constants below name
//! the values this crate's consumers branch on.

use serde::{Deserialize, Serialize};

/// Node administrative states
pub mod admin_state {
    pub const LOCKED: &str = "locked";
    pub const UNLOCKED: &str = "unlocked";
}

/// Node operational states
pub mod oper_state {
    pub const ENABLED: &str = "enabled";
    pub const DISABLED: &str = "disabled";
}

/// Node availability statuses
pub mod avail_status {
    pub const AVAILABLE: &str = "available";
    pub const DEGRADED: &str = "degraded";
    pub const FAILED: &str = "failed";
}

/// Placeholder reported for any state that could not be determined.
pub const STATE_UNKNOWN: &str = "unknown";

/// Service group states
pub mod group_state {
    pub const NIL: &str = "nil";
    pub const NOT_APPLICABLE: &str = "not-applicable";
    pub const INITIAL: &str = "initial";
    pub const UNKNOWN: &str = "unknown";
    pub const STANDBY: &str = "standby";
    pub const GO_STANDBY: &str = "go-standby";
    pub const GO_ACTIVE: &str = "go-active";
    pub const ACTIVE: &str = "active";
    pub const DISABLING: &str = "disabling";
    pub const DISABLED: &str = "disabled";
    pub const SHUTDOWN: &str = "shutdown";
}

/// Service group statuses
pub mod group_status {
    pub const NONE: &str = "";
    pub const WARN: &str = "warn";
    pub const DEGRADED: &str = "degraded";
    pub const FAILED: &str = "failed";
}

/// Service group conditions
pub mod group_condition {
    pub const NONE: &str = "";
    pub const DATA_INCONSISTENT: &str = "data-inconsistent";
    pub const DATA_OUTDATED: &str = "data-outdated";
    pub const DATA_CONSISTENT: &str = "data-consistent";
    pub const DATA_SYNC: &str = "data-syncing";
    pub const DATA_STANDALONE: &str = "data-standalone";
    pub const RECOVERY_FAILURE: &str = "recovery-failure";
    pub const ACTION_FAILURE: &str = "action-failure";
    pub const FATAL_FAILURE: &str = "fatal-failure";
}

/// Service states
pub mod service_state {
    pub const ENABLED_ACTIVE: &str = "enabled-active";
    pub const ENABLED_STANDBY: &str = "enabled-standby";
    pub const DISABLED: &str = "disabled";
}

/// A cluster node as seen by the SM engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Hostname
    pub name: String,
    pub administrative_state: String,
    pub operational_state: String,
    pub availability_status: String,
    #[serde(default)]
    pub ready_state: String,
}

impl Node {
    pub fn is_locked(&self) -> bool {
        self.administrative_state == admin_state::LOCKED
    }

    pub fn is_disabled(&self) -> bool {
        self.operational_state == oper_state::DISABLED
    }
}

/// One row per (node, service group): where a group runs and how it is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroupAssignment {
    /// Service domain the assignment belongs to
    pub domain: String,
    pub node_name: String,
    pub service_group_name: String,
    pub desired_state: String,
    pub state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub condition: String,
}

/// Redundancy model of a service group within its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedundancyModel {
    #[serde(rename = "nil")]
    Nil,
    #[serde(rename = "none")]
    None,
    #[serde(rename = "N")]
    N,
    #[serde(rename = "N + M")]
    NPlusM,
    #[serde(rename = "N to 1")]
    NToOne,
    #[serde(rename = "N to N")]
    NToN,
    #[serde(rename = "unknown", other)]
    Unknown,
}

/// Redundancy configuration for a service group in a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDomainMember {
    pub domain: String,
    pub service_group_name: String,
    pub redundancy_model: RedundancyModel,
    #[serde(default)]
    pub n_active: u32,
    #[serde(default)]
    pub m_standby: u32,
}

impl ServiceDomainMember {
    /// Two co-active members under the N model.
    pub fn is_active_active(&self) -> bool {
        self.redundancy_model == RedundancyModel::N && self.n_active == 2
    }
}

/// Current state of a single service on the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub desired_state: String,
    pub state: String,
    #[serde(default)]
    pub status: String,
}

impl Service {
    /// Wanted enabled-active but not currently enabled-active.
    pub fn is_ill(&self) -> bool {
        self.desired_state == service_state::ENABLED_ACTIVE
            && self.state != service_state::ENABLED_ACTIVE
    }
}

/// Severity of losing a member service for its group.
///
/// Unrecognised or empty engine values read as `None`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum FailureImpact {
    #[default]
    None,
    Minor,
    Major,
    Critical,
}

impl From<Option<String>> for FailureImpact {
    fn from(value: Option<String>) -> Self {
        match value.unwrap_or_default().to_ascii_lowercase().as_str() {
            "minor" => Self::Minor,
            "major" => Self::Major,
            "critical" => Self::Critical,
            _ => Self::None,
        }
    }
}

/// Membership of a service within a service group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroupMember {
    pub service_group_name: String,
    pub service_name: String,
    #[serde(default)]
    pub service_failure_impact: FailureImpact,
    #[serde(default)]
    pub provisioned: String,
}

/// Point-in-time copy of every table, used for seeding stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub assignments: Vec<ServiceGroupAssignment>,
    #[serde(default)]
    pub domain_members: Vec<ServiceDomainMember>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub group_members: Vec<ServiceGroupMember>,
}

impl StateSnapshot {
    /// Parse a snapshot from its JSON representation.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
