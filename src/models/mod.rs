pub mod event;
pub mod pagination;
pub mod record;
pub mod schema;
pub mod table;

pub use event::{ EventHandler, EventKind, EventPayload, TableEvent };
pub use pagination::{ PageRequest, Paginated, PaginationMeta, PaginationParams };
pub use record::{ FieldValue, OneOrMany, Record };
pub use schema::{ ColumnDef, ColumnKind, SchemaError, TableSchema, Usage };
pub use table::TableDef;
