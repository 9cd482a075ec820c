use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::StorageResult;
use crate::models::{ FieldValue, Paginated, PaginationParams, Record, TableDef };

/// Table-scoped persistence operations shared by every CRUD instance.
///
/// Filters are equality conditions; a `Null` filter value matches missing values.
/// Implementations never retry; each failure is reported once to the caller.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Select one page of rows matching `filter`, ordered by the identifier
    async fn select_paginated(
        &self,
        table: &TableDef,
        filter: &Record,
        params: PaginationParams
    ) -> StorageResult<Paginated<Record>>;

    /// Select the first row matching `filter`
    async fn select_one(&self, table: &TableDef, filter: &Record) -> StorageResult<Option<Record>>;

    /// Insert rows as one batch, returning them with generated fields filled in
    async fn insert(&self, table: &TableDef, records: Vec<Record>) -> StorageResult<Vec<Record>>;

    /// Apply each change set to the row whose identifier equals the paired key.
    /// Returns the rows that matched, after the update.
    async fn update(
        &self,
        table: &TableDef,
        changes: Vec<(FieldValue, Record)>
    ) -> StorageResult<Vec<Record>>;

    /// Delete rows matching `filter`, returning how many were removed
    async fn delete(&self, table: &TableDef, filter: &Record) -> StorageResult<u64>;
}
