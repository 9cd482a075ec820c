//! CRUD instance factory: binds a table descriptor to a storage gateway and
//! exposes the same list/get/create/update/delete operations programmatically
//! and as an HTTP routing table.

pub mod descriptor;
pub mod error;
pub mod instance;
pub mod routes;

pub use descriptor::TableDescriptor;
pub use error::{ CrudError, CrudResult, ErrorBody, DEFAULT_ERROR_MESSAGE };
pub use instance::{ CrudInstance, DeleteOutcome };
pub use routes::DeleteResponse;
