//! Lock pre-check.
//!
//! Refuses to lock a node that is the only remaining healthy provider of a
//! critical service in an N-model group with more than one active member.
//! Services the local node wants active but does not have active are the
//! candidates; peers are then asked who actually runs them.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use sm_state::schema::FailureImpact;
use sm_state::{RedundancyModel, StateStore};
use tracing::{debug, info};

use crate::domain::RequestContext;
use crate::peer::PeerStateProbe;

/// service group -> critical ill services still lacking an alternate provider.
type Checklist = BTreeMap<String, BTreeSet<String>>;

/// Lock safety check over a state store and the peer probe.
pub struct LockPreCheck<'a> {
    store: &'a dyn StateStore,
    probe: &'a dyn PeerStateProbe,
    local_hostname: &'a str,
}

impl<'a> LockPreCheck<'a> {
    pub fn new(
        store: &'a dyn StateStore,
        probe: &'a dyn PeerStateProbe,
        local_hostname: &'a str,
    ) -> Self {
        Self {
            store,
            probe,
            local_hostname,
        }
    }

    /// Services that would lose their last provider if `hostname` were locked.
    ///
    /// `Ok(None)` means it is safe to lock. A peer that cannot be probed
    /// contributes nothing either way.
    pub async fn check(
        &self,
        hostname: &str,
        ctx: &RequestContext,
    ) -> sm_state::Result<Option<Vec<String>>> {
        let mut checklist = self.build_checklist().await?;
        if checklist.is_empty() {
            debug!("no critical ill services in multi-active groups");
            return Ok(None);
        }

        let assignments = self.store.assignments().await?;

        for row in &assignments {
            if row.node_name == self.local_hostname || row.node_name == hostname {
                continue;
            }
            let Some(pending) = checklist.get_mut(&row.service_group_name) else {
                continue;
            };
            let candidates: Vec<String> = pending.iter().cloned().collect();
            for service in candidates {
                let state = self
                    .probe
                    .service_state(&row.node_name, &service, ctx.auth_token())
                    .await;
                if state.is_enabled_active() {
                    debug!(
                        service = %service,
                        peer = %row.node_name,
                        "alternate provider found"
                    );
                    pending.remove(&service);
                }
            }
        }

        if checklist.values().all(BTreeSet::is_empty) {
            return Ok(None);
        }

        let mut at_risk = Vec::new();
        let mut seen = HashSet::new();
        for row in assignments.iter().filter(|a| a.node_name == hostname) {
            let Some(pending) = checklist.get(&row.service_group_name) else {
                continue;
            };
            for service in pending {
                let state = self
                    .probe
                    .service_state(hostname, service, ctx.auth_token())
                    .await;
                if state.is_enabled_active() && seen.insert(service.clone()) {
                    at_risk.push(service.clone());
                }
            }
        }

        if at_risk.is_empty() {
            return Ok(None);
        }
        info!(hostname = %hostname, services = ?at_risk, "lock would remove sole service provider");
        Ok(Some(at_risk))
    }

    async fn build_checklist(&self) -> sm_state::Result<Checklist> {
        let ill: HashSet<String> = self
            .store
            .services()
            .await?
            .into_iter()
            .filter(|s| s.is_ill())
            .map(|s| s.name)
            .collect();
        if ill.is_empty() {
            return Ok(Checklist::new());
        }
        debug!(count = ill.len(), "ill services");

        let mut checklist = Checklist::new();
        for member in self.store.domain_members().await? {
            if member.redundancy_model != RedundancyModel::N || member.n_active <= 1 {
                continue;
            }
            for gm in self.store.group_members(&member.service_group_name).await? {
                if gm.service_failure_impact == FailureImpact::Critical
                    && ill.contains(&gm.service_name)
                {
                    checklist
                        .entry(member.service_group_name.clone())
                        .or_default()
                        .insert(gm.service_name);
                }
            }
        }
        Ok(checklist)
    }
}
