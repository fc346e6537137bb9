//! Thresholds and search budgets for screening and cooking

use std::time::Duration;

use puzzle_core::Score;

/// Search budget for one engine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    pub depth: Option<u32>,
    pub time: Option<Duration>,
    pub nodes: Option<u64>,
}

impl Limit {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn with_time(mut self, time: Duration) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes = Some(nodes);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CookConfig {
    /// Bulk per-ply evaluation of the game.
    pub game_limit: Limit,
    /// Candidate ranking while cooking.
    pub pair_limit: Limit,
    /// Defender's reply inside a mating line.
    pub mate_defense_limit: Limit,

    /// Mate distance from which a position is treated as a mate puzzle.
    pub mate_soon: Score,
    /// Whether mate-in-one moments may become puzzles.
    pub allow_mate_in_one: bool,

    /// Win-chance lead the best move needs over the runner-up.
    pub attack_margin: f64,
    /// A mate in one stays unique while the runner-up is at or below this.
    pub mate_in_one_ceiling: f64,

    /// Previous score above which a non-mating follow-up is noise.
    pub winning_ceiling: Score,
    /// Previous score above which a side already up in material is skipped.
    pub material_ceiling: Score,
    /// Win-chance jump that makes an advantage candidate.
    pub advantage_jump: f64,
    /// Scores below this need `equalizing_jump` to count.
    pub advantage_floor: Score,
    pub equalizing_jump: f64,

    /// Occurrences of a position that end an advantage line.
    pub repetition_limit: usize,
    /// `prev_score` before the first screened ply.
    pub initial_score: Score,
}

impl Default for CookConfig {
    fn default() -> Self {
        Self {
            game_limit: Limit::depth(15).with_time(Duration::from_secs(3)),
            pair_limit: Limit::depth(18).with_time(Duration::from_secs(5)),
            mate_defense_limit: Limit::depth(15),
            mate_soon: Score::Mate(10),
            allow_mate_in_one: true,
            attack_margin: 0.4,
            mate_in_one_ceiling: 0.85,
            winning_ceiling: Score::Cp(3000),
            material_ceiling: Score::Cp(2200),
            advantage_jump: 0.40,
            advantage_floor: Score::Cp(750),
            equalizing_jump: 0.50,
            repetition_limit: 4,
            initial_score: Score::Cp(20),
        }
    }
}
