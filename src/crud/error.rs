use actix_web::{ error::ResponseError, http::StatusCode, HttpResponse };
use serde::Serialize;
use thiserror::Error;

use crate::db::StorageError;
use crate::models::SchemaError;

/// Message used when an error carries none of its own
pub const DEFAULT_ERROR_MESSAGE: &str = "Error Making request";

pub type CrudResult<T> = Result<T, CrudError>;

/// Errors surfaced by CRUD operations
#[derive(Debug, Error)]
pub enum CrudError {
    /// The storage gateway rejected or could not complete the operation
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Input did not fit the table schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    InvalidInput(String),
}

impl CrudError {
    /// Message reported to HTTP clients
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            DEFAULT_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// Body of every failed response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ResponseError for CrudError {
    fn status_code(&self) -> StatusCode {
        match self {
            CrudError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::Schema(_) | CrudError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody { message: self.message() })
    }
}
