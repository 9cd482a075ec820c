use async_trait::async_trait;
use sqlx::{ PgPool, Row };

use super::error::StorageResult;
use super::gateway::StorageGateway;
use super::sql::{
    count_statement,
    decode_row,
    delete_statement,
    insert_columns,
    insert_defaults_statement,
    insert_statement,
    select_first_statement,
    select_page_statement,
    update_statement,
};
use crate::models::{ FieldValue, Paginated, PaginationParams, Record, TableDef };

/// Storage gateway backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    /// Create a new gateway over a shared pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &TableDef, filter: &Record) -> StorageResult<u64> {
        let mut qb = count_statement(table, filter)?;
        let row = qb.build().fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    /// Rows without any column to write can only be inserted one at a time
    async fn insert_defaults(&self, table: &TableDef, count: usize) -> StorageResult<Vec<Record>> {
        let mut inserted = Vec::with_capacity(count);
        for _ in 0..count {
            let mut qb = insert_defaults_statement(table);
            let row = qb.build().fetch_one(&self.pool).await?;
            inserted.push(decode_row(table, &row)?);
        }
        Ok(inserted)
    }
}

#[async_trait]
impl StorageGateway for PgGateway {
    async fn select_paginated(
        &self,
        table: &TableDef,
        filter: &Record,
        params: PaginationParams
    ) -> StorageResult<Paginated<Record>> {
        let total = self.count(table, filter).await?;

        let mut qb = select_page_statement(table, filter, params)?;
        let rows = qb.build().fetch_all(&self.pool).await?;
        let data = rows
            .iter()
            .map(|row| decode_row(table, row))
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Paginated::new(data, params, total))
    }

    async fn select_one(&self, table: &TableDef, filter: &Record) -> StorageResult<Option<Record>> {
        let mut qb = select_first_statement(table, filter)?;
        let row = qb.build().fetch_optional(&self.pool).await?;
        row.map(|row| decode_row(table, &row)).transpose()
    }

    async fn insert(&self, table: &TableDef, records: Vec<Record>) -> StorageResult<Vec<Record>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let columns = insert_columns(table, &records)?;
        if columns.is_empty() {
            return self.insert_defaults(table, records.len()).await;
        }

        let mut qb = insert_statement(table, &columns, &records);
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| decode_row(table, row))
            .collect()
    }

    async fn update(
        &self,
        table: &TableDef,
        changes: Vec<(FieldValue, Record)>
    ) -> StorageResult<Vec<Record>> {
        let mut updated = Vec::with_capacity(changes.len());

        for (key, fields) in changes {
            let mut qb = update_statement(table, key, &fields)?;
            if let Some(row) = qb.build().fetch_optional(&self.pool).await? {
                updated.push(decode_row(table, &row)?);
            }
        }

        Ok(updated)
    }

    async fn delete(&self, table: &TableDef, filter: &Record) -> StorageResult<u64> {
        let mut qb = delete_statement(table, filter)?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
