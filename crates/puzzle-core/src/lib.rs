//! Core model for puzzle generation: engine scores and the game tree that
//! games are ingested into and puzzles are cooked on.

pub mod error;
pub mod game_record;
pub mod score;
pub mod tree;

pub use error::TreeError;
pub use score::{win_chances, PovScore, Score};
pub use tree::{Candidate, GameTree, Node, NodeId};
