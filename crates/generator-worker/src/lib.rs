//! Batch puzzle generator: feeds game files through UCI engines and the
//! puzzle cooker, storing results in Postgres.

pub mod config;
pub mod db;
pub mod error;
pub mod runner;
pub mod uci;

pub use config::{Args, WorkerConfig};
pub use error::WorkerError;
pub use runner::{process_game, run, EnginePool, RunOptions, RunSummary};
