//! SurrealDB table definitions for the service-management tables
//!
//! The SM engine is the only writer. Definitions here exist so a freshly
//! connected database (or an in-memory one used by tooling) has the indexes
//! the gateway's read paths rely on. Safe to call multiple times.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

pub const NODES_TABLE: &str = "sm_nodes";
pub const ASSIGNMENTS_TABLE: &str = "sm_service_domain_assignments";
pub const DOMAIN_MEMBERS_TABLE: &str = "sm_service_domain_members";
pub const SERVICES_TABLE: &str = "sm_services";
pub const GROUP_MEMBERS_TABLE: &str = "sm_service_group_members";

/// Define all service-management tables.
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing SM state schema");

    // Schema:
    //   sm_nodes                       { name UNIQUE, administrative_state, operational_state,
    //                                    availability_status, ready_state }
    //   sm_service_domain_assignments  { domain, node_name, service_group_name, desired_state,
    //                                    state, status, condition }
    //                                  (node_name, service_group_name) UNIQUE
    //   sm_service_domain_members      { domain, service_group_name, redundancy_model,
    //                                    n_active, m_standby }
    //   sm_services                    { name UNIQUE, desired_state, state, status }
    //   sm_service_group_members       { service_group_name, service_name,
    //                                    service_failure_impact, provisioned }
    let sql = r#"
        DEFINE TABLE IF NOT EXISTS sm_nodes SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_node_name ON TABLE sm_nodes COLUMNS name UNIQUE;

        DEFINE TABLE IF NOT EXISTS sm_service_domain_assignments SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_sda_node_group
            ON TABLE sm_service_domain_assignments COLUMNS node_name, service_group_name UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_sda_group
            ON TABLE sm_service_domain_assignments COLUMNS service_group_name;

        DEFINE TABLE IF NOT EXISTS sm_service_domain_members SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_sdm_domain_group
            ON TABLE sm_service_domain_members COLUMNS domain, service_group_name UNIQUE;

        DEFINE TABLE IF NOT EXISTS sm_services SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_service_name ON TABLE sm_services COLUMNS name UNIQUE;

        DEFINE TABLE IF NOT EXISTS sm_service_group_members SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_sgm_group
            ON TABLE sm_service_group_members COLUMNS service_group_name;
    "#;

    db.query(sql)
        .await
        .and_then(|response| response.check())
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;

    debug!("SM state tables defined");
    Ok(())
}
