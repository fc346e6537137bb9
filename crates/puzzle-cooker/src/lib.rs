//! Puzzle cooking: screens evaluated games for tactical moments and turns
//! them into forced solution lines.

pub mod config;
pub mod engine;
pub mod error;
pub mod material;
pub mod puzzle;
pub mod store;

pub use config::{CookConfig, Limit};
pub use engine::Engine;
pub use error::CookError;
pub use puzzle::screen::{analyze_game, analyze_position};
pub use puzzle::{Puzzle, PuzzleRecord, GENERATOR_VERSION};
pub use store::{MemoryStore, PuzzleStore};
