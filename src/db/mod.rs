pub mod error;
pub mod gateway;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod sql;

pub use error::*;
pub use gateway::*;
pub use memory::*;
pub use pool::*;
pub use postgres::*;
