use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{ Arc, Mutex, MutexGuard };

use super::error::{ StorageError, StorageResult };
use super::gateway::StorageGateway;
use crate::models::{ ColumnKind, FieldValue, Paginated, PaginationParams, Record, TableDef };

#[derive(Default)]
struct MemoryTable {
    rows: Vec<Record>,
    next_id: i64,
}

impl MemoryTable {
    fn generate_key(&mut self, kind: ColumnKind) -> StorageResult<FieldValue> {
        self.next_id += 1;
        match kind {
            ColumnKind::Integer => Ok(FieldValue::Integer(self.next_id)),
            ColumnKind::Text => Ok(FieldValue::Text(self.next_id.to_string())),
            other => Err(StorageError::Rejected(format!("cannot generate {} identifiers", other))),
        }
    }
}

/// In-memory storage gateway, used for local runs and tests.
///
/// Rows keep insertion order, which is also identifier order since keys are generated.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    // Key: table name
    tables: Arc<Mutex<HashMap<String, MemoryTable>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored for a table
    pub fn row_count(&self, table: &str) -> StorageResult<usize> {
        let tables = self.lock()?;
        Ok(tables.get(table).map(|t| t.rows.len()).unwrap_or(0))
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, MemoryTable>>> {
        self.tables.lock().map_err(|_| StorageError::Rejected("memory store lock poisoned".to_string()))
    }
}

fn check_fields(table: &TableDef, record: &Record) -> StorageResult<()> {
    match record.field_names().find(|f| table.schema().get(f).is_none()) {
        Some(unknown) =>
            Err(StorageError::Rejected(format!("unknown column {} in table {}", unknown, table.name()))),
        None => Ok(()),
    }
}

/// Fill every schema column, so stored rows look like rows read back from a database
fn complete_row(table: &TableDef, mut record: Record) -> Record {
    for column in table.columns() {
        if !record.contains(&column.name) {
            record.insert(column.name.clone(), FieldValue::Null);
        }
    }
    record
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn select_paginated(
        &self,
        table: &TableDef,
        filter: &Record,
        params: PaginationParams
    ) -> StorageResult<Paginated<Record>> {
        check_fields(table, filter)?;
        let tables = self.lock()?;

        let matching: Vec<&Record> = tables
            .get(table.name())
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|r| r.matches(filter))
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.per_page as usize)
            .cloned()
            .collect();

        Ok(Paginated::new(data, params, total))
    }

    async fn select_one(&self, table: &TableDef, filter: &Record) -> StorageResult<Option<Record>> {
        check_fields(table, filter)?;
        let tables = self.lock()?;

        Ok(
            tables
                .get(table.name())
                .and_then(|t| t.rows.iter().find(|r| r.matches(filter)))
                .cloned()
        )
    }

    async fn insert(&self, table: &TableDef, records: Vec<Record>) -> StorageResult<Vec<Record>> {
        for record in &records {
            check_fields(table, record)?;
        }

        let mut tables = self.lock()?;
        let stored = tables.entry(table.name().to_string()).or_default();
        let key_column = table.identifier_column();

        let mut inserted = Vec::with_capacity(records.len());
        for mut record in records {
            if !record.contains(&key_column.name) {
                record.insert(key_column.name.clone(), stored.generate_key(key_column.kind)?);
            }
            let row = complete_row(table, record);
            stored.rows.push(row.clone());
            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn update(
        &self,
        table: &TableDef,
        changes: Vec<(FieldValue, Record)>
    ) -> StorageResult<Vec<Record>> {
        for (_, fields) in &changes {
            check_fields(table, fields)?;
        }

        let mut tables = self.lock()?;
        let Some(stored) = tables.get_mut(table.name()) else {
            return Ok(Vec::new());
        };

        let identifier = table.identifier();
        let mut updated = Vec::new();
        for (key, fields) in changes {
            if
                let Some(row) = stored.rows
                    .iter_mut()
                    .find(|r| r.get(identifier) == Some(&key))
            {
                for (field, value) in fields {
                    row.insert(field, value);
                }
                updated.push(row.clone());
            }
        }

        Ok(updated)
    }

    async fn delete(&self, table: &TableDef, filter: &Record) -> StorageResult<u64> {
        if filter.is_empty() {
            return Err(StorageError::Rejected(format!("refusing unfiltered delete on {}", table.name())));
        }
        check_fields(table, filter)?;

        let mut tables = self.lock()?;
        let Some(stored) = tables.get_mut(table.name()) else {
            return Ok(0);
        };

        let before = stored.rows.len();
        stored.rows.retain(|r| !r.matches(filter));
        Ok((before - stored.rows.len()) as u64)
    }
}
