use thiserror::Error;

use crate::orders::StorageError;
use crate::utils::AppError;

/// Startup and serve-loop failures
///
/// Request-level failures never reach this type; handlers answer with
/// [`AppError`] directly.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Work directory error: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Http(#[source] std::io::Error),

    #[error("Event bus error: {0}")]
    Bus(#[from] AppError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
