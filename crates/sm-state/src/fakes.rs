//! In-memory fake for the state store (testing and offline tooling)
//!
//! `MemoryStateStore` satisfies the `StateStore` contract without any
//! external dependencies. It can be seeded from a `StateSnapshot` and can be
//! switched into a failing mode to exercise error paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StateError;
use crate::schema::*;
use crate::storage_traits::StateStore;
use crate::Result;

/// In-memory state store backed by a `StateSnapshot`.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    snapshot: RwLock<StateSnapshot>,
    unavailable: AtomicBool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Replace the whole snapshot.
    pub fn replace(&self, snapshot: StateSnapshot) {
        *self.snapshot.write().unwrap() = snapshot;
    }

    pub fn add_node(&self, node: Node) {
        self.snapshot.write().unwrap().nodes.push(node);
    }

    pub fn add_assignment(&self, assignment: ServiceGroupAssignment) {
        self.snapshot.write().unwrap().assignments.push(assignment);
    }

    pub fn add_domain_member(&self, member: ServiceDomainMember) {
        self.snapshot.write().unwrap().domain_members.push(member);
    }

    pub fn add_service(&self, service: Service) {
        self.snapshot.write().unwrap().services.push(service);
    }

    pub fn add_group_member(&self, member: ServiceGroupMember) {
        self.snapshot.write().unwrap().group_members.push(member);
    }

    /// Make every subsequent read fail with `StateError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StateSnapshot>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StateError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(self.snapshot.read().unwrap())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn node(&self, name: &str) -> Result<Option<Node>> {
        let snapshot = self.read()?;
        Ok(snapshot.nodes.iter().find(|n| n.name == name).cloned())
    }

    async fn assignments(&self) -> Result<Vec<ServiceGroupAssignment>> {
        let snapshot = self.read()?;
        let mut rows = snapshot.assignments.clone();
        // stable: insertion order is kept within one service group
        rows.sort_by(|a, b| a.service_group_name.cmp(&b.service_group_name));
        Ok(rows)
    }

    async fn domain_members(&self) -> Result<Vec<ServiceDomainMember>> {
        Ok(self.read()?.domain_members.clone())
    }

    async fn domain_member(
        &self,
        domain: &str,
        service_group_name: &str,
    ) -> Result<Option<ServiceDomainMember>> {
        let snapshot = self.read()?;
        Ok(snapshot
            .domain_members
            .iter()
            .find(|m| m.domain == domain && m.service_group_name == service_group_name)
            .cloned())
    }

    async fn services(&self) -> Result<Vec<Service>> {
        Ok(self.read()?.services.clone())
    }

    async fn group_members(&self, service_group_name: &str) -> Result<Vec<ServiceGroupMember>> {
        let snapshot = self.read()?;
        Ok(snapshot
            .group_members
            .iter()
            .filter(|m| m.service_group_name == service_group_name)
            .cloned()
            .collect())
    }
}
