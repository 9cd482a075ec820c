use actix_web::{ web, HttpResponse };
use anyhow::{ bail, Context, Result };
use clap::ValueEnum;
use serde::{ Deserialize, Serialize };
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::crud::{ CrudInstance, TableDescriptor };
use crate::db::{ Database, DbConfig, MemoryGateway, StorageGateway };
use crate::models::{ ColumnDef, ColumnKind, EventKind, EventPayload, TableSchema };
use crate::utils::logging;

/// Body of the liveness probe
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

/// `GET /` liveness probe
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(StatusMessage { message: "Server Running".to_string() })
}

/// One table exposed over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Base path the routing table is mounted under, e.g. `/api/v1/user`
    pub mount: String,
    pub table_name: String,
    pub identifier: String,
    #[serde(default)]
    pub add_audit_fields: bool,
    pub columns: TableSchema,
}

impl TableConfig {
    pub fn descriptor(&self) -> TableDescriptor {
        TableDescriptor::new(&self.table_name, &self.identifier, self.columns.clone()).add_audit_fields(
            self.add_audit_fields
        )
    }
}

/// Tables configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    pub tables: Vec<TableConfig>,
}

impl TablesConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to open tables config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse tables config file")?;
        Ok(config)
    }

    /// The `Users` table mounted at `/api/v1/user`
    pub fn users_default() -> Self {
        Self {
            tables: vec![TableConfig {
                mount: "/api/v1/user".to_string(),
                table_name: "Users".to_string(),
                identifier: "id".to_string(),
                add_audit_fields: true,
                columns: TableSchema::new(
                    vec![
                        ColumnDef::new("id", ColumnKind::Integer),
                        ColumnDef::new("name", ColumnKind::Text),
                        ColumnDef::new("email", ColumnKind::Text).nullable()
                    ]
                ),
            }],
        }
    }
}

/// Which storage gateway backs the CRUD instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Postgres,
    Memory,
}

/// Create the process-wide storage gateway
pub async fn create_gateway(kind: StoreKind) -> Result<Arc<dyn StorageGateway>> {
    match kind {
        StoreKind::Postgres => {
            let db_config = DbConfig::from_env().context("Failed to get database configuration")?;
            let db = Database::connect(db_config).await.context("Failed to connect to database")?;
            Ok(Arc::new(db.gateway()))
        }
        StoreKind::Memory => {
            logging::log_activity("server", "Using in-memory store", Some("data is lost on exit"));
            Ok(Arc::new(MemoryGateway::new()))
        }
    }
}

/// A CRUD instance and the base path it is served under
#[derive(Clone)]
pub struct MountedTable {
    pub mount: String,
    pub instance: CrudInstance,
}

/// Event observer that logs every write notification of a table
pub fn log_events(table: &str) -> impl Fn(EventKind, &EventPayload) + Send + Sync + 'static {
    let table = table.to_string();
    move |kind: EventKind, payload: &EventPayload| {
        let details = serde_json::to_string(payload).unwrap_or_else(|e| e.to_string());
        logging::log_table_activity("events", &table, &format!("Table event: {}", kind), Some(&details));
    }
}

/// Build one CRUD instance per configured table, all sharing `gateway`
pub fn build_tables(config: &TablesConfig, gateway: Arc<dyn StorageGateway>) -> Result<Vec<MountedTable>> {
    let mut mounts = HashSet::new();
    let mut tables = Vec::with_capacity(config.tables.len());

    for table in &config.tables {
        if !table.mount.starts_with('/') || table.mount.len() < 2 {
            bail!("Invalid mount path {:?} for table {}", table.mount, table.table_name);
        }
        if !mounts.insert(table.mount.trim_end_matches('/').to_string()) {
            bail!("Mount path {} is used by more than one table", table.mount);
        }

        let descriptor = table.descriptor().on_event(log_events(&table.table_name));
        let instance = CrudInstance::new(descriptor, gateway.clone()).with_context(||
            format!("Invalid configuration for table {}", table.table_name)
        )?;

        logging::log_table_activity("server", &table.table_name, "Mounted", Some(&table.mount));
        tables.push(MountedTable {
            mount: table.mount.clone(),
            instance,
        });
    }

    Ok(tables)
}

/// Register the liveness probe and every table's routing table
pub fn configure_app(cfg: &mut web::ServiceConfig, tables: &[MountedTable]) {
    cfg.route("/", web::get().to(liveness));
    for table in tables {
        cfg.service(table.instance.scope(&table.mount));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_config_parses_camel_case() {
        let config: TablesConfig = serde_json
            ::from_str(
                r#"{
                "tables": [{
                    "mount": "/api/v1/post",
                    "tableName": "Posts",
                    "identifier": "post_id",
                    "columns": [
                        {"name": "post_id", "kind": "integer"},
                        {"name": "title", "kind": "text"},
                        {"name": "published_at", "kind": "timestamp", "nullable": true}
                    ]
                }]
            }"#
            )
            .unwrap();

        let table = &config.tables[0];
        assert_eq!(table.table_name, "Posts");
        assert!(!table.add_audit_fields);
        assert_eq!(table.columns.columns().len(), 3);
        assert_eq!(table.descriptor().identifier, "post_id");
    }

    #[test]
    fn test_build_tables_rejects_bad_mounts() {
        let gateway: Arc<dyn StorageGateway> = Arc::new(MemoryGateway::new());

        let mut config = TablesConfig::users_default();
        config.tables[0].mount = "api".to_string();
        assert!(build_tables(&config, gateway.clone()).is_err());

        let mut config = TablesConfig::users_default();
        let duplicate = config.tables[0].clone();
        config.tables.push(duplicate);
        assert!(build_tables(&config, gateway.clone()).is_err());

        let mut config = TablesConfig::users_default();
        config.tables[0].identifier = "uuid".to_string();
        assert!(build_tables(&config, gateway.clone()).is_err());

        assert_eq!(build_tables(&TablesConfig::users_default(), gateway).unwrap().len(), 1);
    }
}
