//! Storage trait definition for the SM gateway
//!
//! `StateStore` is the read interface over the SM engine's tables. It is
//! async and backend-agnostic; an in-memory fake lives in the `fakes` module.

use async_trait::async_trait;

use crate::schema::{
    Node, Service, ServiceDomainMember, ServiceGroupAssignment, ServiceGroupMember,
};
use crate::Result;

/// Read-only access to service-management state.
///
/// Guarantees:
/// - `assignments()` is ordered by `service_group_name` ascending, and the
///   order is stable between calls on an unchanged store.
/// - Lookups for absent rows return `Ok(None)` / an empty list, never an error.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Look up a node by hostname.
    async fn node(&self, name: &str) -> Result<Option<Node>>;

    /// All service-group assignments, ordered by service-group name.
    async fn assignments(&self) -> Result<Vec<ServiceGroupAssignment>>;

    /// All service-domain members.
    async fn domain_members(&self) -> Result<Vec<ServiceDomainMember>>;

    /// The domain member for one service group in one domain.
    async fn domain_member(
        &self,
        domain: &str,
        service_group_name: &str,
    ) -> Result<Option<ServiceDomainMember>>;

    /// All services known locally.
    async fn services(&self) -> Result<Vec<Service>>;

    /// Members of one service group.
    async fn group_members(&self, service_group_name: &str) -> Result<Vec<ServiceGroupMember>>;
}
