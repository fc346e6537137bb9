/// Puzzle data model: ranked move pairs, accepted puzzles and the records
/// persisted for them

pub mod cook;
pub mod screen;

use puzzle_core::{GameTree, NodeId, Score};
use serde::{Deserialize, Serialize};
use shakmaty::{CastlingMode, Move};

/// Version tag written with every puzzle record.
pub const GENERATOR_VERSION: i32 = 0;

/// Strength written for forced mates.
pub const MATE_STRENGTH: i32 = 999_999_999;

/// Strength written for advantage lines that end on a mate score.
pub const MATE_ENDING_STRENGTH: i32 = 999_999_998;

/// A ranked move with its score from the declared winner's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMove {
    pub mv: Move,
    pub score: Score,
}

/// Top two candidates at a node, scored for `winner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextMovePair {
    pub node: NodeId,
    pub winner: shakmaty::Color,
    pub best: EngineMove,
    /// Absent when fewer than two moves were ranked.
    pub second: Option<EngineMove>,
}

/// An accepted puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    /// Position after the critical move, in the screened game's tree.
    pub node: NodeId,
    /// Solution line starting with the solver's first move.
    pub moves: Vec<Move>,
    /// Centipawns at the end of the line, or one of the mate strengths.
    pub cp: i32,
}

/// What gets persisted for a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleRecord {
    pub game_id: String,
    /// Position before the critical move.
    pub fen: String,
    /// Plies played before the critical move.
    pub ply: u32,
    /// Critical move followed by the solution, in UCI.
    pub moves: Vec<String>,
    pub cp: i32,
    pub generator_version: i32,
}

impl PuzzleRecord {
    /// Build the record for a puzzle found in `tree`. Returns `None` when the
    /// anchor has no parent, i.e. no critical move leads to it.
    pub fn from_puzzle(tree: &GameTree, puzzle: &Puzzle, version: i32) -> Option<Self> {
        let anchor = tree.node(puzzle.node);
        let parent = anchor.parent()?;
        let critical = anchor.mv()?;

        let moves = std::iter::once(critical)
            .chain(puzzle.moves.iter().copied())
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect();

        Some(Self {
            game_id: tree.id().to_string(),
            fen: tree.fen(parent),
            ply: tree.node(parent).ply(),
            moves,
            cp: puzzle.cp,
            generator_version: version,
        })
    }
}
