// Re-export core modules
pub mod crud;
pub mod db;
pub mod models;
pub mod server;
pub mod utils;

// Re-export common types and traits
pub use crud::{ CrudError, CrudInstance, CrudResult, DeleteOutcome, TableDescriptor };
pub use db::{ Database, DbConfig, MemoryGateway, PgGateway, StorageError, StorageGateway };
pub use models::{
    ColumnDef,
    ColumnKind,
    EventKind,
    EventPayload,
    FieldValue,
    OneOrMany,
    PageRequest,
    Paginated,
    PaginationParams,
    Record,
    TableSchema,
};
