//! Engine evaluations: centipawn or mate-distance scores, perspective
//! handling and the win-chances transform.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

use shakmaty::Color;

/// Slope of the logistic curve mapping centipawns to win chances.
const WIN_CHANCES_SLOPE: f64 = 0.004;

/// Band near ±1 reserved for mate scores, so that no centipawn value can
/// reach a forced mate.
const MATE_BAND: f64 = 0.01;

/// An evaluation from the point of view of the side to move.
///
/// Ordered best-first for that side:
/// `Mate(1) > Mate(2) > … > Cp(+∞) > … > Cp(-∞) > … > Mate(-2) > Mate(-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    /// Heuristic evaluation in centipawns.
    Cp(i32),
    /// Forced mate in `|n|` plies; positive when the side to move mates.
    /// `n` is never zero for scores built by [`Score::mate`].
    Mate(i32),
}

impl Score {
    /// Build a mate score. `n` must be non-zero.
    pub fn mate(n: i32) -> Self {
        debug_assert!(n != 0, "mate distance must be non-zero");
        Score::Mate(n)
    }

    /// Centipawn value, or `None` for mate scores.
    pub fn cp(&self) -> Option<i32> {
        match *self {
            Score::Cp(v) => Some(v),
            Score::Mate(_) => None,
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Score::Mate(_))
    }

    /// Bounded, order-preserving transform into `(-1, 1)`.
    ///
    /// Centipawns follow a logistic curve scaled into `(-1 + MATE_BAND,
    /// 1 - MATE_BAND)`. Mates sit in the remaining band, closer to ±1 the
    /// shorter they are.
    pub fn win_chances(&self) -> f64 {
        match *self {
            Score::Cp(v) => {
                let logistic = 2.0 / (1.0 + (-WIN_CHANCES_SLOPE * v as f64).exp()) - 1.0;
                (1.0 - MATE_BAND) * logistic
            }
            Score::Mate(n) => {
                let dist = n.unsigned_abs() as f64;
                let magnitude = 1.0 - MATE_BAND * dist / (dist + 1.0);
                if n > 0 {
                    magnitude
                } else {
                    -magnitude
                }
            }
        }
    }

    /// Sort key implementing the total order: tier first, then value
    /// within the tier.
    fn rank(&self) -> (u8, i64) {
        match *self {
            Score::Mate(n) if n > 0 => (2, -(n as i64)),
            Score::Cp(v) => (1, v as i64),
            Score::Mate(n) => (0, -(n as i64)),
        }
    }
}

/// Free-function form used by the screener and the validators.
pub fn win_chances(score: Score) -> f64 {
    score.win_chances()
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        match self {
            Score::Cp(v) => Score::Cp(v.saturating_neg()),
            Score::Mate(n) => Score::Mate(n.saturating_neg()),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(v) => write!(f, "cp {v}"),
            Score::Mate(n) => write!(f, "mate {n}"),
        }
    }
}

/// A [`Score`] together with the side it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PovScore {
    relative: Score,
    turn: Color,
}

impl PovScore {
    pub fn new(relative: Score, turn: Color) -> Self {
        Self { relative, turn }
    }

    /// Score from `side`'s perspective.
    pub fn pov(&self, side: Color) -> Score {
        if side == self.turn {
            self.relative
        } else {
            -self.relative
        }
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn white(&self) -> Score {
        self.pov(Color::White)
    }
}
