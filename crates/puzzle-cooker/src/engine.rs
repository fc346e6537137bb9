//! Search engine contract

use std::future::Future;

use puzzle_core::{Candidate, GameTree, NodeId};

use crate::config::Limit;
use crate::error::CookError;

/// A move-search engine. Requests block (await) until the engine answers.
pub trait Engine {
    /// Forget state tied to the previous game's move history.
    fn new_game(&mut self) -> impl Future<Output = Result<(), CookError>> + Send;

    /// Rank up to `multipv` moves in the node's position, best first.
    /// Scores are relative to the side to move. A position without legal
    /// moves yields an empty list.
    fn analyze(
        &mut self,
        tree: &GameTree,
        node: NodeId,
        limit: &Limit,
        multipv: usize,
    ) -> impl Future<Output = Result<Vec<Candidate>, CookError>> + Send;
}
