use thiserror::Error;

/// Failures reported by a storage gateway
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to decode column {column}: {source}")]
    Decode {
        column: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{0}")]
    Rejected(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
