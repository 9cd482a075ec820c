use std::sync::Arc;

use super::descriptor::TableDescriptor;
use super::error::{ CrudError, CrudResult };
use crate::db::StorageGateway;
use crate::models::{
    EventHandler,
    EventKind,
    EventPayload,
    FieldValue,
    OneOrMany,
    PageRequest,
    Paginated,
    Record,
    SchemaError,
    TableDef,
    Usage,
};
use crate::utils::logging;

const COMPONENT: &str = "crud";

/// Result of a delete. Delete never fails outright; storage failures are reported here.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Rows were removed
    Deleted(u64),
    /// The delete ran but matched nothing
    NotFound,
    /// The value was unusable or storage failed
    Failed(String),
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted(_) => "deleted",
            DeleteOutcome::NotFound => "not_found",
            DeleteOutcome::Failed(_) => "failed",
        }
    }
}

/// List/get/create/update/delete operations bound to one table.
///
/// Cloning is cheap; clones share the table binding, gateway and event handler.
#[derive(Clone)]
pub struct CrudInstance {
    table: Arc<TableDef>,
    gateway: Arc<dyn StorageGateway>,
    on_event: Option<EventHandler>,
}

impl CrudInstance {
    /// Bind a table descriptor to a storage gateway
    pub fn new(
        descriptor: TableDescriptor,
        gateway: Arc<dyn StorageGateway>
    ) -> Result<Self, SchemaError> {
        let table = descriptor.table_def()?;

        if descriptor.add_audit_fields {
            logging::log_table_warning(
                COMPONENT,
                table.name(),
                "addAuditFields is set",
                &"audit fields are not applied"
            );
        }

        Ok(Self {
            table: Arc::new(table),
            gateway,
            on_event: descriptor.on_event,
        })
    }

    pub fn table(&self) -> &TableDef {
        &self.table
    }

    /// One page of the whole table
    pub async fn list(&self, request: PageRequest) -> CrudResult<Paginated<Record>> {
        let params = request.resolve();
        self.gateway
            .select_paginated(&self.table, &Record::new(), params).await
            .map_err(|e| self.failed("list", e.into()))
    }

    /// One page of rows matching `filter`, without the page metadata
    pub async fn get_filtered_data(
        &self,
        filter: Record,
        request: PageRequest
    ) -> CrudResult<Vec<Record>> {
        let filter = self.table.schema().conform(filter, Usage::Filter)?;
        let params = request.resolve();

        let page = self.gateway
            .select_paginated(&self.table, &filter, params).await
            .map_err(|e| self.failed("get filtered", e.into()))?;

        Ok(page.data)
    }

    /// First row matching `filter`, if any
    pub async fn get_data(&self, filter: Record) -> CrudResult<Option<Record>> {
        let filter = self.table.schema().conform(filter, Usage::Filter)?;

        self.gateway
            .select_one(&self.table, &filter).await
            .map_err(|e| self.failed("get one", e.into()))
    }

    /// Insert one or many records. Caller-supplied identifiers are discarded.
    pub async fn add_data(&self, data: impl Into<OneOrMany<Record>>) -> CrudResult<Vec<Record>> {
        let records = data.into().into_vec();
        if records.is_empty() {
            return Err(CrudError::InvalidInput("no records to create".to_string()));
        }

        let identifier = self.table.identifier();
        let records = records
            .into_iter()
            .map(|mut record| {
                record.remove(identifier);
                self.table.schema().conform(record, Usage::Write)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let inserted = self.gateway
            .insert(&self.table, records).await
            .map_err(|e| self.failed("create", e.into()))?;

        logging::log_table_activity(COMPONENT, self.table.name(), "Created records", Some(&inserted.len().to_string()));
        self.emit(EventKind::Created, EventPayload::Records(inserted.clone()));

        Ok(inserted)
    }

    /// Update one or many records, each matched by its own identifier value
    pub async fn update_data(&self, data: impl Into<OneOrMany<Record>>) -> CrudResult<Vec<Record>> {
        let records = data.into().into_vec();
        if records.is_empty() {
            return Err(CrudError::InvalidInput("no records to update".to_string()));
        }

        let identifier = self.table.identifier();
        let mut changes = Vec::with_capacity(records.len());
        for mut record in records {
            let key = match record.remove(identifier) {
                Some(key) if !key.is_null() => key,
                _ => {
                    return Err(
                        CrudError::InvalidInput(format!("record is missing identifier field {}", identifier))
                    );
                }
            };
            let key = self.table.schema().conform_value(identifier, key, Usage::Filter)?;

            if record.is_empty() {
                return Err(
                    CrudError::InvalidInput(format!("no fields to update for {} = {}", identifier, key))
                );
            }
            let fields = self.table.schema().conform(record, Usage::Write)?;
            changes.push((key, fields));
        }

        let updated = self.gateway
            .update(&self.table, changes).await
            .map_err(|e| self.failed("update", e.into()))?;

        logging::log_table_activity(COMPONENT, self.table.name(), "Updated records", Some(&updated.len().to_string()));
        self.emit(EventKind::Updated, EventPayload::Records(updated.clone()));

        Ok(updated)
    }

    /// Delete the row whose identifier equals `value`
    pub async fn delete_data(&self, value: impl Into<FieldValue>) -> DeleteOutcome {
        let identifier = self.table.identifier();
        let key = match self.table.schema().conform_value(identifier, value.into(), Usage::Filter) {
            Ok(key) if !key.is_null() => key,
            Ok(_) => {
                return self.delete_failed(CrudError::InvalidInput(format!("{} must not be null", identifier)));
            }
            Err(e) => {
                return self.delete_failed(e.into());
            }
        };

        let filter = self.table.key_filter(key);
        match self.gateway.delete(&self.table, &filter).await {
            Ok(0) => DeleteOutcome::NotFound,
            Ok(rows) => {
                logging::log_table_activity(COMPONENT, self.table.name(), "Deleted records", Some(&rows.to_string()));
                self.emit(EventKind::Deleted, EventPayload::Key(filter));
                DeleteOutcome::Deleted(rows)
            }
            Err(e) => self.delete_failed(e.into()),
        }
    }

    /// Delete by the textual identifier value of a query string
    pub async fn delete_by_text(&self, raw: Option<&str>) -> DeleteOutcome {
        let identifier = self.table.identifier();
        let Some(raw) = raw else {
            return self.delete_failed(CrudError::InvalidInput(format!("missing {} parameter", identifier)));
        };

        match self.table.schema().value_from_text(identifier, raw) {
            Ok(value) => self.delete_data(value).await,
            Err(e) => self.delete_failed(e.into()),
        }
    }

    fn delete_failed(&self, err: CrudError) -> DeleteOutcome {
        logging::log_table_error(COMPONENT, self.table.name(), "delete", &err);
        DeleteOutcome::Failed(err.message())
    }

    fn failed(&self, operation: &str, err: CrudError) -> CrudError {
        logging::log_table_error(COMPONENT, self.table.name(), operation, &err);
        err
    }

    fn emit(&self, kind: EventKind, payload: EventPayload) {
        if let Some(on_event) = &self.on_event {
            logging::log_debug(COMPONENT, &format!("{} {} event", self.table.name(), kind), &payload);
            on_event(kind, &payload);
        }
    }
}
