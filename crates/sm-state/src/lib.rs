//! SM-State: read-only view of the service-management database
//!
//! The SM engine owns and writes these tables. This crate only reads them, so
//! callers work from a snapshot that may lag the engine's real-time state.
//!
//! ## Layer 0 - Data/Persistence
//!
//! ## Key Components
//!
//! - `StateStore`: backend-agnostic read interface
//! - `SurrealStateStore`: SurrealDB-backed implementation
//! - `MemoryStateStore`: in-memory fake for tests and offline tooling

mod error;
pub mod fakes;
mod migrations;
pub mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::StateError;
pub use fakes::MemoryStateStore;
pub use schema::{
    FailureImpact, Node, RedundancyModel, Service, ServiceDomainMember, ServiceGroupAssignment,
    ServiceGroupMember, StateSnapshot,
};
pub use storage_traits::StateStore;
pub use surreal_store::SurrealStateStore;

/// Result type for sm-state operations
pub type Result<T> = std::result::Result<T, StateError>;
