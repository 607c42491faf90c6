//! Administrative actions accepted by the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::GatewayError;

/// An administrative action on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeAction {
    Lock,
    LockPreCheck,
    LockForce,
    Unlock,
    Swact,
    SwactPreCheck,
    SwactForce,
    Event,
}

impl NodeAction {
    pub const ALL: [NodeAction; 8] = [
        NodeAction::Lock,
        NodeAction::LockPreCheck,
        NodeAction::LockForce,
        NodeAction::Unlock,
        NodeAction::Swact,
        NodeAction::SwactPreCheck,
        NodeAction::SwactForce,
        NodeAction::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeAction::Lock => "lock",
            NodeAction::LockPreCheck => "lock-pre-check",
            NodeAction::LockForce => "lock-force",
            NodeAction::Unlock => "unlock",
            NodeAction::Swact => "swact",
            NodeAction::SwactPreCheck => "swact-pre-check",
            NodeAction::SwactForce => "swact-force",
            NodeAction::Event => "event",
        }
    }

    /// Runs the swact safety check before anything else.
    pub fn needs_swact_check(&self) -> bool {
        matches!(self, NodeAction::Swact | NodeAction::SwactPreCheck)
    }

    /// Runs the lock safety check before anything else.
    pub fn needs_lock_check(&self) -> bool {
        matches!(self, NodeAction::Lock | NodeAction::LockPreCheck)
    }

    /// Answers from the safety check alone; never reaches the engine.
    pub fn is_pre_check_only(&self) -> bool {
        matches!(self, NodeAction::SwactPreCheck | NodeAction::LockPreCheck)
    }
}

impl fmt::Display for NodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeAction {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidAction {
                action: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_action() {
        for action in NodeAction::ALL {
            assert_eq!(action.as_str().parse::<NodeAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_case_variants() {
        assert!(matches!(
            "reboot".parse::<NodeAction>(),
            Err(GatewayError::InvalidAction { .. })
        ));
        assert!("LOCK".parse::<NodeAction>().is_err());
        assert!("".parse::<NodeAction>().is_err());
    }

    #[test]
    fn test_serde_matches_wire_names() {
        let json = serde_json::to_string(&NodeAction::SwactPreCheck).unwrap();
        assert_eq!(json, "\"swact-pre-check\"");
        let parsed: NodeAction = serde_json::from_str("\"lock-force\"").unwrap();
        assert_eq!(parsed, NodeAction::LockForce);
    }

    #[test]
    fn test_forced_variants_skip_checks() {
        assert!(!NodeAction::SwactForce.needs_swact_check());
        assert!(!NodeAction::LockForce.needs_lock_check());
        assert!(!NodeAction::Unlock.needs_lock_check());
        assert!(!NodeAction::Event.needs_swact_check());
    }
}
