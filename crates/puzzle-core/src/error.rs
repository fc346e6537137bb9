//! Game-tree and ingestion error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Illegal move {uci} in {fen}")]
    IllegalMove { uci: String, fen: String },

    #[error("Invalid UCI move: {0}")]
    InvalidMove(String),

    #[error("Variation {index} out of range ({len} children)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Malformed game record: {0}")]
    MalformedRecord(String),
}
