use std::fmt;

use crate::models::{ EventHandler, EventKind, EventPayload, SchemaError, TableDef, TableSchema };

/// Configuration binding one table to a CRUD instance
#[derive(Clone)]
pub struct TableDescriptor {
    pub table_name: String,
    pub identifier: String,
    pub schema: TableSchema,
    pub on_event: Option<EventHandler>,
    /// Accepted for compatibility; no audit fields are written
    pub add_audit_fields: bool,
}

impl TableDescriptor {
    pub fn new(
        table_name: impl Into<String>,
        identifier: impl Into<String>,
        schema: TableSchema
    ) -> Self {
        Self {
            table_name: table_name.into(),
            identifier: identifier.into(),
            schema,
            on_event: None,
            add_audit_fields: false,
        }
    }

    /// Register the observer notified after every successful write
    pub fn on_event<F>(mut self, f: F) -> Self
        where F: Fn(EventKind, &EventPayload) + Send + Sync + 'static
    {
        self.on_event = Some(crate::models::event::handler(f));
        self
    }

    pub fn with_event_handler(mut self, handler: EventHandler) -> Self {
        self.on_event = Some(handler);
        self
    }

    pub fn add_audit_fields(mut self, enabled: bool) -> Self {
        self.add_audit_fields = enabled;
        self
    }

    /// Validate names and schema into a table binding
    pub fn table_def(&self) -> Result<TableDef, SchemaError> {
        TableDef::new(self.table_name.clone(), self.identifier.clone(), self.schema.clone())
    }
}

impl fmt::Debug for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDescriptor")
            .field("table_name", &self.table_name)
            .field("identifier", &self.identifier)
            .field("schema", &self.schema)
            .field("on_event", &self.on_event.as_ref().map(|_| "<handler>"))
            .field("add_audit_fields", &self.add_audit_fields)
            .finish()
    }
}
