// ABOUTME: Startup and serving errors for the server binary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Storage error: {0}")]
    Storage(#[from] ctc_storage::StorageError),

    #[error("Invalid CSRF settings: {0}")]
    Csrf(#[from] ctc_api::AppError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
