//! SurrealDB-backed StateStore implementation
//!
//! Reads use explicit column projections so record ids never reach the
//! record types.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::StateError;
use crate::migrations::{
    self, ASSIGNMENTS_TABLE, DOMAIN_MEMBERS_TABLE, GROUP_MEMBERS_TABLE, NODES_TABLE,
    SERVICES_TABLE,
};
use crate::schema::{
    Node, Service, ServiceDomainMember, ServiceGroupAssignment, ServiceGroupMember, StateSnapshot,
};
use crate::storage_traits::StateStore;
use crate::Result;

const NODE_COLUMNS: &str = "name, administrative_state, operational_state, \
                            availability_status, ready_state";
const ASSIGNMENT_COLUMNS: &str = "domain, node_name, service_group_name, desired_state, \
                                  state, status, condition";
const DOMAIN_MEMBER_COLUMNS: &str = "domain, service_group_name, redundancy_model, \
                                     n_active, m_standby";
const SERVICE_COLUMNS: &str = "name, desired_state, state, status";
const GROUP_MEMBER_COLUMNS: &str = "service_group_name, service_name, \
                                    service_failure_impact, provisioned";

const DEFAULT_NAMESPACE: &str = "sm";
const DEFAULT_DATABASE: &str = "main";

/// SurrealDB-backed implementation of [`StateStore`].
#[derive(Clone)]
pub struct SurrealStateStore {
    db: Surreal<Any>,
}

impl SurrealStateStore {
    /// Create an in-memory instance.
    ///
    /// Connects to `mem://`, selects `sm/main`, and defines the tables.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`, `ws://host`).
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(DEFAULT_NAMESPACE)
            .use_db(DEFAULT_DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealStateStore connected ({})", url);
        Ok(Self { db })
    }

    /// Import every table of a snapshot.
    ///
    /// The gateway never writes state; this exists for seeding test and
    /// tooling databases.
    #[instrument(skip_all)]
    pub async fn load_snapshot(&self, snapshot: &StateSnapshot) -> Result<()> {
        self.insert_rows(NODES_TABLE, snapshot.nodes.clone()).await?;
        self.insert_rows(ASSIGNMENTS_TABLE, snapshot.assignments.clone())
            .await?;
        self.insert_rows(DOMAIN_MEMBERS_TABLE, snapshot.domain_members.clone())
            .await?;
        self.insert_rows(SERVICES_TABLE, snapshot.services.clone())
            .await?;
        self.insert_rows(GROUP_MEMBERS_TABLE, snapshot.group_members.clone())
            .await?;
        info!(
            nodes = snapshot.nodes.len(),
            assignments = snapshot.assignments.len(),
            "snapshot loaded"
        );
        Ok(())
    }

    async fn insert_rows<T>(&self, table: &'static str, rows: Vec<T>) -> Result<()>
    where
        T: serde::Serialize + Send + Sync + 'static,
    {
        if rows.is_empty() {
            return Ok(());
        }
        debug!(table, count = rows.len(), "inserting rows");

        let sql = format!("INSERT INTO {table} $rows RETURN NONE");
        self.db
            .query(sql)
            .bind(("rows", rows))
            .await
            .and_then(|response| response.check())
            .map_err(|e| StateError::Snapshot(format!("{table}: {e}")))?;
        Ok(())
    }

    async fn select<T: DeserializeOwned>(&self, sql: String) -> Result<Vec<T>> {
        let mut response = self.db.query(sql).await?;
        response
            .take(0)
            .map_err(|e| StateError::Deserialization(e.to_string()))
    }
}

#[async_trait]
impl StateStore for SurrealStateStore {
    #[instrument(skip(self))]
    async fn node(&self, name: &str) -> Result<Option<Node>> {
        let name_owned = name.to_string();
        let mut response = self
            .db
            .query(format!(
                "SELECT {NODE_COLUMNS} FROM {NODES_TABLE} WHERE name = $name LIMIT 1"
            ))
            .bind(("name", name_owned))
            .await?;

        let nodes: Vec<Node> = response
            .take(0)
            .map_err(|e| StateError::Deserialization(e.to_string()))?;
        Ok(nodes.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn assignments(&self) -> Result<Vec<ServiceGroupAssignment>> {
        self.select(format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM {ASSIGNMENTS_TABLE} \
             ORDER BY service_group_name ASC, node_name ASC"
        ))
        .await
    }

    async fn domain_members(&self) -> Result<Vec<ServiceDomainMember>> {
        self.select(format!(
            "SELECT {DOMAIN_MEMBER_COLUMNS} FROM {DOMAIN_MEMBERS_TABLE} \
             ORDER BY service_group_name ASC"
        ))
        .await
    }

    async fn domain_member(
        &self,
        domain: &str,
        service_group_name: &str,
    ) -> Result<Option<ServiceDomainMember>> {
        let mut response = self
            .db
            .query(format!(
                "SELECT {DOMAIN_MEMBER_COLUMNS} FROM {DOMAIN_MEMBERS_TABLE} \
                 WHERE domain = $domain AND service_group_name = $group LIMIT 1"
            ))
            .bind(("domain", domain.to_string()))
            .bind(("group", service_group_name.to_string()))
            .await?;

        let members: Vec<ServiceDomainMember> = response
            .take(0)
            .map_err(|e| StateError::Deserialization(e.to_string()))?;
        Ok(members.into_iter().next())
    }

    async fn services(&self) -> Result<Vec<Service>> {
        self.select(format!(
            "SELECT {SERVICE_COLUMNS} FROM {SERVICES_TABLE} ORDER BY name ASC"
        ))
        .await
    }

    async fn group_members(&self, service_group_name: &str) -> Result<Vec<ServiceGroupMember>> {
        let mut response = self
            .db
            .query(format!(
                "SELECT {GROUP_MEMBER_COLUMNS} FROM {GROUP_MEMBERS_TABLE} \
                 WHERE service_group_name = $group ORDER BY service_name ASC"
            ))
            .bind(("group", service_group_name.to_string()))
            .await?;

        response
            .take(0)
            .map_err(|e| StateError::Deserialization(e.to_string()))
    }
}
