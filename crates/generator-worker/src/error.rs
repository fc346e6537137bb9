//! Worker error types

use puzzle_cooker::CookError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cook error: {0}")]
    Cook(#[from] CookError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    /// Errors after which no further game can be analyzed.
    pub fn is_fatal(&self) -> bool {
        match self {
            WorkerError::Engine(_) => true,
            WorkerError::Cook(e) => e.is_fatal(),
            _ => false,
        }
    }
}
