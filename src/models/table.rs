use super::record::{ FieldValue, Record };
use super::schema::{ validate_identifier, ColumnDef, SchemaError, TableSchema };

/// A validated table binding: name, primary-key column and column layout
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    name: String,
    key_column: ColumnDef,
    schema: TableSchema,
}

impl TableDef {
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        schema: TableSchema
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let identifier = identifier.into();

        validate_identifier(&name)?;
        schema.validate(&identifier)?;
        let key_column = schema
            .get(&identifier)
            .cloned()
            .ok_or(SchemaError::MissingIdentifierColumn(identifier))?;

        Ok(Self { name, key_column, schema })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identifier(&self) -> &str {
        &self.key_column.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnDef] {
        self.schema.columns()
    }

    pub fn identifier_column(&self) -> &ColumnDef {
        &self.key_column
    }

    /// Equality filter selecting the row with the given identifier value
    pub fn key_filter(&self, value: FieldValue) -> Record {
        Record::new().with(self.key_column.name.clone(), value)
    }
}
