use chrono::{ DateTime, NaiveDateTime, TimeZone, Utc };
use sqlx::postgres::PgRow;
use sqlx::{ Postgres, QueryBuilder, Row };

use super::error::{ StorageError, StorageResult };
use crate::models::{ ColumnDef, ColumnKind, FieldValue, PaginationParams, Record, TableDef };

/// Quote a (validated) identifier for PostgreSQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated, quoted list of every schema column
pub fn column_list(table: &TableDef) -> String {
    table
        .columns()
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn lookup_column<'t>(table: &'t TableDef, field: &str) -> StorageResult<&'t ColumnDef> {
    table
        .schema()
        .get(field)
        .ok_or_else(|| StorageError::Rejected(format!("unknown column {} in table {}", field, table.name())))
}

/// Bind a value with the SQL type of its column, so NULLs are typed too
pub fn push_value(qb: &mut QueryBuilder<'_, Postgres>, kind: ColumnKind, value: &FieldValue) {
    match value {
        FieldValue::Null =>
            match kind {
                ColumnKind::Text => qb.push_bind(None::<String>),
                ColumnKind::Integer => qb.push_bind(None::<i64>),
                ColumnKind::Float => qb.push_bind(None::<f64>),
                ColumnKind::Boolean => qb.push_bind(None::<bool>),
                ColumnKind::Timestamp => qb.push_bind(None::<DateTime<Utc>>),
            }
        FieldValue::Bool(v) => qb.push_bind(*v),
        FieldValue::Integer(v) => qb.push_bind(*v),
        FieldValue::Float(v) => qb.push_bind(*v),
        FieldValue::Text(v) => qb.push_bind(v.clone()),
        FieldValue::Timestamp(v) => qb.push_bind(*v),
    };
}

/// Append ` WHERE a = $1 AND b IS NULL ...` for a non-empty filter
pub fn push_filter(
    qb: &mut QueryBuilder<'_, Postgres>,
    table: &TableDef,
    filter: &Record
) -> StorageResult<()> {
    for (i, (field, value)) in filter.iter().enumerate() {
        let column = lookup_column(table, field)?;
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(quote_ident(field));
        if value.is_null() {
            qb.push(" IS NULL");
        } else {
            qb.push(" = ");
            push_value(qb, column.kind, value);
        }
    }
    Ok(())
}

/// OFFSET bind value; offsets past `i64::MAX` are clamped so the page is simply empty
pub fn sql_offset(params: PaginationParams) -> i64 {
    i64::try_from(params.offset()).unwrap_or(i64::MAX)
}

fn returning(qb: &mut QueryBuilder<'_, Postgres>, table: &TableDef) {
    qb.push(" RETURNING ");
    qb.push(column_list(table));
}

fn select_from(table: &TableDef, filter: &Record) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(
        format!("SELECT {} FROM {}", column_list(table), quote_ident(table.name()))
    );
    push_filter(&mut qb, table, filter)?;
    qb.push(" ORDER BY ");
    qb.push(quote_ident(table.identifier()));
    Ok(qb)
}

/// `SELECT COUNT(*) AS total` over the rows matching `filter`
pub fn count_statement(table: &TableDef, filter: &Record) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) AS total FROM {}", quote_ident(table.name())));
    push_filter(&mut qb, table, filter)?;
    Ok(qb)
}

/// One page of matching rows, ordered by the identifier
pub fn select_page_statement(
    table: &TableDef,
    filter: &Record,
    params: PaginationParams
) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let mut qb = select_from(table, filter)?;
    qb.push(" LIMIT ");
    qb.push_bind(params.per_page as i64);
    qb.push(" OFFSET ");
    qb.push_bind(sql_offset(params));
    Ok(qb)
}

/// First matching row by identifier order
pub fn select_first_statement(table: &TableDef, filter: &Record) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let mut qb = select_from(table, filter)?;
    qb.push(" LIMIT 1");
    Ok(qb)
}

/// Union of the fields supplied by `records`, in schema order
pub fn insert_columns<'t>(table: &'t TableDef, records: &[Record]) -> StorageResult<Vec<&'t ColumnDef>> {
    let mut columns = Vec::new();
    for record in records {
        for field in record.field_names() {
            lookup_column(table, field)?;
        }
    }
    for column in table.columns() {
        if records.iter().any(|r| r.contains(&column.name)) {
            columns.push(column);
        }
    }
    Ok(columns)
}

/// Multi-row `INSERT ... VALUES`; a record lacking one of `columns` gets `DEFAULT` there
pub fn insert_statement(
    table: &TableDef,
    columns: &[&ColumnDef],
    records: &[Record]
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_ident(table.name()),
            columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", ")
        )
    );

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push("(");
        for (j, column) in columns.iter().enumerate() {
            if j > 0 {
                qb.push(", ");
            }
            match record.get(&column.name) {
                Some(value) => push_value(&mut qb, column.kind, value),
                None => {
                    qb.push("DEFAULT");
                }
            }
        }
        qb.push(")");
    }
    returning(&mut qb, table);
    qb
}

/// Single-row insert for a record with no fields at all
pub fn insert_defaults_statement(table: &TableDef) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table.name())));
    returning(&mut qb, table);
    qb
}

/// `UPDATE ... SET ... WHERE <identifier> = key RETURNING ...`
pub fn update_statement(
    table: &TableDef,
    key: FieldValue,
    fields: &Record
) -> StorageResult<QueryBuilder<'static, Postgres>> {
    if fields.is_empty() {
        return Err(
            StorageError::Rejected(format!("no fields to update for {} = {}", table.identifier(), key))
        );
    }

    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", quote_ident(table.name())));
    for (i, (field, value)) in fields.iter().enumerate() {
        let column = lookup_column(table, field)?;
        if i > 0 {
            qb.push(", ");
        }
        qb.push(quote_ident(field));
        qb.push(" = ");
        push_value(&mut qb, column.kind, value);
    }
    push_filter(&mut qb, table, &table.key_filter(key))?;
    returning(&mut qb, table);
    Ok(qb)
}

/// Filtered `DELETE`; an empty filter is refused
pub fn delete_statement(table: &TableDef, filter: &Record) -> StorageResult<QueryBuilder<'static, Postgres>> {
    if filter.is_empty() {
        return Err(StorageError::Rejected(format!("refusing unfiltered delete on {}", table.name())));
    }

    let mut qb = QueryBuilder::new(format!("DELETE FROM {}", quote_ident(table.name())));
    push_filter(&mut qb, table, filter)?;
    Ok(qb)
}

/// Read every schema column of a row into a record
pub fn decode_row(table: &TableDef, row: &PgRow) -> StorageResult<Record> {
    let mut record = Record::new();
    for column in table.columns() {
        let value = decode_column(row, column).map_err(|source| StorageError::Decode {
            column: column.name.clone(),
            source,
        })?;
        record.insert(column.name.clone(), value);
    }
    Ok(record)
}

fn decode_column(row: &PgRow, column: &ColumnDef) -> Result<FieldValue, sqlx::Error> {
    let name = column.name.as_str();
    let value: FieldValue = match column.kind {
        ColumnKind::Text => row.try_get::<Option<String>, _>(name)?.into(),
        ColumnKind::Boolean => row.try_get::<Option<bool>, _>(name)?.into(),
        ColumnKind::Integer => {
            // INT8 first, then the narrower integer types
            match row.try_get::<Option<i64>, _>(name) {
                Ok(v) => v.into(),
                Err(_) =>
                    match row.try_get::<Option<i32>, _>(name) {
                        Ok(v) => v.map(i64::from).into(),
                        Err(_) => row.try_get::<Option<i16>, _>(name)?.map(i64::from).into(),
                    }
            }
        }
        ColumnKind::Float => {
            match row.try_get::<Option<f64>, _>(name) {
                Ok(v) => v.into(),
                Err(_) => row.try_get::<Option<f32>, _>(name)?.map(f64::from).into(),
            }
        }
        ColumnKind::Timestamp => {
            match row.try_get::<Option<DateTime<Utc>>, _>(name) {
                Ok(v) => v.into(),
                Err(_) =>
                    row
                        .try_get::<Option<NaiveDateTime>, _>(name)?
                        .map(|ts| Utc.from_utc_datetime(&ts))
                        .into(),
            }
        }
    };
    Ok(value)
}
