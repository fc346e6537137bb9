#![allow(dead_code)]

use std::collections::HashMap;

use puzzle_core::tree::repetition_key;
use puzzle_core::{Candidate, GameTree, NodeId, PovScore, Score};
use puzzle_cooker::{CookError, Engine, Limit};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Position};

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// White to move, mates in two: b5b7 h8g8 a6a8.
pub const TWO_ROOKS: &str = "7k/8/R7/1R6/8/8/8/4K3 w - - 0 1";

/// Same rooks, king one file over so the game can walk into the mate.
pub const ROOKS_GAME_ORIGIN: &str = "6k1/8/R7/1R6/8/8/8/4K3 w - - 0 1";
pub const ROOKS_GAME_MOVES: &str = "e1e2 g8h8 b5b7 h8g8";

/// Italian game where black's 3...Bc5 is met by a crushing plan.
pub const ITALIAN_MOVES: &str = "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5 c2c3 g8f6 d2d4 e5d4";

pub fn position(fen: &str) -> Chess {
    fen.parse::<Fen>()
        .unwrap()
        .into_position(CastlingMode::Standard)
        .unwrap()
}

/// Engine answering from a fixed script. Entries are keyed by game origin
/// and the UCI path from it, or by position alone; scores are relative to
/// the side to move. Unknown positions get no candidates.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    lines: HashMap<String, Vec<(String, Score)>>,
    positions: HashMap<String, Vec<(String, Score)>>,
    pub analyze_calls: usize,
    pub new_games: usize,
    pub dead: bool,
}

fn path_key(origin: &Chess, path: &str) -> String {
    format!("{}|{}", repetition_key(origin), path.trim())
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose process is gone.
    pub fn dead() -> Self {
        Self {
            dead: true,
            ..Self::default()
        }
    }

    pub fn at(mut self, origin: &str, path: &str, moves: &[(&str, Score)]) -> Self {
        let key = path_key(&position(origin), path);
        self.lines.insert(key, own(moves));
        self
    }

    pub fn at_position(mut self, fen: &str, moves: &[(&str, Score)]) -> Self {
        self.positions
            .insert(repetition_key(&position(fen)), own(moves));
        self
    }
}

fn own(moves: &[(&str, Score)]) -> Vec<(String, Score)> {
    moves.iter().map(|(m, s)| (m.to_string(), *s)).collect()
}

impl Engine for ScriptedEngine {
    async fn new_game(&mut self) -> Result<(), CookError> {
        if self.dead {
            return Err(CookError::EngineUnavailable("scripted engine is dead".into()));
        }
        self.new_games += 1;
        Ok(())
    }

    async fn analyze(
        &mut self,
        tree: &GameTree,
        node: NodeId,
        _limit: &Limit,
        multipv: usize,
    ) -> Result<Vec<Candidate>, CookError> {
        if self.dead {
            return Err(CookError::EngineUnavailable("scripted engine is dead".into()));
        }
        self.analyze_calls += 1;

        let pos = tree.position(node);
        let path: Vec<String> = tree
            .moves_to(node)
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect();
        let key = path_key(tree.origin(), &path.join(" "));

        let script = self
            .lines
            .get(&key)
            .or_else(|| self.positions.get(&repetition_key(pos)));
        let Some(script) = script else {
            return Ok(Vec::new());
        };

        Ok(script
            .iter()
            .take(multipv)
            .map(|(uci, score)| Candidate {
                mv: uci.parse::<UciMove>().unwrap().to_move(pos).unwrap(),
                score: PovScore::new(*score, pos.turn()),
            })
            .collect())
    }
}

/// Game walking into the two-rook mate, scripted so that the position
/// after 1...Kh8 is a mate-in-two puzzle.
pub fn rooks_game_engine() -> ScriptedEngine {
    let o = ROOKS_GAME_ORIGIN;
    ScriptedEngine::new()
        .at(o, "", &[("e1e2", Score::Cp(1500))])
        .at(o, "e1e2", &[("g8h8", Score::Cp(-1500))])
        .at(
            o,
            "e1e2 g8h8",
            &[("b5b7", Score::Mate(2)), ("a6a7", Score::Cp(300))],
        )
        .at(o, "e1e2 g8h8 b5b7", &[("h8g8", Score::Mate(-1))])
        .at(
            o,
            "e1e2 g8h8 b5b7 h8g8",
            &[("a6a8", Score::Mate(1)), ("e2e3", Score::Cp(200))],
        )
}

pub fn rooks_game_line(id: &str) -> String {
    format!("{id};{ROOKS_GAME_ORIGIN};{ROOKS_GAME_MOVES}")
}

/// Italian game where 3...Bc5 4.c3 is scored as winning for white, with a
/// unique follow-up for two moves and a non-unique one after that.
pub fn italian_engine() -> ScriptedEngine {
    let o = START;
    let quiet = [
        ("", "e2e4"),
        ("e2e4", "e7e5"),
        ("e2e4 e7e5", "g1f3"),
        ("e2e4 e7e5 g1f3", "b8c6"),
        ("e2e4 e7e5 g1f3 b8c6", "f1c4"),
        ("e2e4 e7e5 g1f3 b8c6 f1c4", "f8c5"),
    ];
    let mut engine = ScriptedEngine::new();
    for (path, mv) in quiet {
        engine = engine.at(o, path, &[(mv, Score::Cp(20))]);
    }

    let base = "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5";
    engine
        .at(o, base, &[("c2c3", Score::Cp(900)), ("d2d3", Score::Cp(100))])
        .at(
            o,
            &format!("{base} c2c3"),
            &[("g8f6", Score::Cp(-900)), ("d7d6", Score::Cp(-800))],
        )
        .at(
            o,
            &format!("{base} c2c3 g8f6"),
            &[("d2d4", Score::Cp(900)), ("d2d3", Score::Cp(100))],
        )
        .at(
            o,
            &format!("{base} c2c3 g8f6 d2d4"),
            &[("e5d4", Score::Cp(-900)), ("c5b6", Score::Cp(-950))],
        )
        .at(
            o,
            &format!("{base} c2c3 g8f6 d2d4 e5d4"),
            &[("c3d4", Score::Cp(900)), ("e4e5", Score::Cp(850))],
        )
}

pub fn italian_line(id: &str) -> String {
    format!("{id};;{ITALIAN_MOVES}")
}

pub fn uci(moves: &[shakmaty::Move]) -> Vec<String> {
    moves
        .iter()
        .map(|m| m.to_uci(CastlingMode::Standard).to_string())
        .collect()
}
