//! Cooking error types

use puzzle_core::TreeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CookError {
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

impl CookError {
    /// No further analysis is possible once the engine is gone.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CookError::EngineUnavailable(_))
    }
}
