use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::collections::{ HashMap, HashSet };
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::record::{ FieldValue, Record };

/// Errors raised while checking names or data against a table schema
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("identifier column {0} is not declared in the schema")]
    MissingIdentifierColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column {column} expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnKind,
        found: String,
    },

    #[error("column {0} does not accept null")]
    NotNullable(String),

    #[error("expected a JSON object")]
    NotAnObject,
}

/// The primitive kinds a column can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Timestamp => "timestamp",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ColumnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ColumnKind::Text),
            "integer" => Ok(ColumnKind::Integer),
            "float" => Ok(ColumnKind::Float),
            "boolean" => Ok(ColumnKind::Boolean),
            "timestamp" => Ok(ColumnKind::Timestamp),
            _ => Err(format!("Unknown column kind: {}", s)),
        }
    }
}

/// A declared column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self { name: name.into(), kind, nullable: false }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// How data is being used, which decides whether null is acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Values that will be written to a column
    Write,
    /// Equality conditions, where null means "IS NULL"
    Filter,
}

/// Caller-declared column layout of one table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Builder-style column append
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check column names and that `identifier` is one of them
    pub fn validate(&self, identifier: &str) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_identifier(&column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }

        if self.get(identifier).is_none() {
            return Err(SchemaError::MissingIdentifierColumn(identifier.to_string()));
        }

        Ok(())
    }

    /// Check a programmatically built record, widening integers for float columns
    pub fn conform(&self, record: Record, usage: Usage) -> Result<Record, SchemaError> {
        record
            .into_iter()
            .map(|(field, value)| {
                let column = self.column_for(&field)?;
                let value = conform_value(column, value, usage)?;
                Ok((field, value))
            })
            .collect()
    }

    /// Convert a JSON object into a record of this table
    pub fn record_from_json(&self, value: &JsonValue, usage: Usage) -> Result<Record, SchemaError> {
        let object = value.as_object().ok_or(SchemaError::NotAnObject)?;

        object
            .iter()
            .map(|(field, value)| {
                let column = self.column_for(field)?;
                let value = value_from_json(column, value, usage)?;
                Ok((field.clone(), value))
            })
            .collect()
    }

    /// Convert query-string pairs into a record of this table
    pub fn record_from_text(&self, fields: &HashMap<String, String>) -> Result<Record, SchemaError> {
        fields
            .iter()
            .map(|(field, raw)| {
                let column = self.column_for(field)?;
                Ok((field.clone(), value_from_text(column, raw)?))
            })
            .collect()
    }

    /// Parse a single textual value for the named column
    pub fn value_from_text(&self, field: &str, raw: &str) -> Result<FieldValue, SchemaError> {
        value_from_text(self.column_for(field)?, raw)
    }

    /// Check a single value for the named column
    pub fn conform_value(
        &self,
        field: &str,
        value: FieldValue,
        usage: Usage
    ) -> Result<FieldValue, SchemaError> {
        conform_value(self.column_for(field)?, value, usage)
    }

    fn column_for(&self, field: &str) -> Result<&ColumnDef, SchemaError> {
        self.get(field).ok_or_else(|| SchemaError::UnknownColumn(field.to_string()))
    }
}

/// Accept plain SQL identifiers only: a letter or underscore, then letters, digits or underscores
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid && name.len() <= 63 {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

fn mismatch(column: &ColumnDef, found: impl Into<String>) -> SchemaError {
    SchemaError::TypeMismatch {
        column: column.name.clone(),
        expected: column.kind,
        found: found.into(),
    }
}

fn check_null(column: &ColumnDef, usage: Usage) -> Result<FieldValue, SchemaError> {
    if usage == Usage::Write && !column.nullable {
        return Err(SchemaError::NotNullable(column.name.clone()));
    }
    Ok(FieldValue::Null)
}

fn conform_value(
    column: &ColumnDef,
    value: FieldValue,
    usage: Usage
) -> Result<FieldValue, SchemaError> {
    match (column.kind, value) {
        (_, FieldValue::Null) => check_null(column, usage),
        (ColumnKind::Text, v @ FieldValue::Text(_)) => Ok(v),
        (ColumnKind::Integer, v @ FieldValue::Integer(_)) => Ok(v),
        (ColumnKind::Float, v @ FieldValue::Float(_)) => Ok(v),
        (ColumnKind::Float, FieldValue::Integer(v)) => Ok(FieldValue::Float(v as f64)),
        (ColumnKind::Boolean, v @ FieldValue::Bool(_)) => Ok(v),
        (ColumnKind::Timestamp, v @ FieldValue::Timestamp(_)) => Ok(v),
        (ColumnKind::Timestamp, FieldValue::Text(raw)) => parse_timestamp(column, &raw),
        (_, other) => Err(mismatch(column, other.kind_name())),
    }
}

fn value_from_json(
    column: &ColumnDef,
    value: &JsonValue,
    usage: Usage
) -> Result<FieldValue, SchemaError> {
    if value.is_null() {
        return check_null(column, usage);
    }

    let converted = match column.kind {
        ColumnKind::Text => value.as_str().map(|s| FieldValue::Text(s.to_string())),
        ColumnKind::Integer => value.as_i64().map(FieldValue::Integer),
        ColumnKind::Float => value.as_f64().map(FieldValue::Float),
        ColumnKind::Boolean => value.as_bool().map(FieldValue::Bool),
        ColumnKind::Timestamp => {
            match value.as_str() {
                Some(raw) => {
                    return parse_timestamp(column, raw);
                }
                None => None,
            }
        }
    };

    converted.ok_or_else(|| mismatch(column, json_kind_name(value)))
}

fn value_from_text(column: &ColumnDef, raw: &str) -> Result<FieldValue, SchemaError> {
    match column.kind {
        ColumnKind::Text => Ok(FieldValue::Text(raw.to_string())),
        ColumnKind::Integer =>
            raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| mismatch(column, format!("{:?}", raw))),
        ColumnKind::Float =>
            raw
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| mismatch(column, format!("{:?}", raw))),
        ColumnKind::Boolean =>
            match raw.trim() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(mismatch(column, format!("{:?}", raw))),
            }
        ColumnKind::Timestamp => parse_timestamp(column, raw.trim()),
    }
}

fn parse_timestamp(column: &ColumnDef, raw: &str) -> Result<FieldValue, SchemaError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
        .map_err(|_| mismatch(column, format!("{:?}", raw)))
}

fn json_kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => "integer",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "text",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
