/// Line cookers: extend a position into a forced mating line or a forced
/// winning line, validating every solver move against the engine.
///
/// Both cookers walk the line with an explicit loop and extend the tree they
/// are given; callers pass a deep copy when the original must survive.

use puzzle_core::{GameTree, NodeId};
use shakmaty::{CastlingMode, Color, Move, Position};
use tracing::{debug, warn};

use super::{EngineMove, NextMovePair};
use crate::config::{CookConfig, Limit};
use crate::engine::Engine;
use crate::error::CookError;

/// A mate in one counts as forced unless the runner-up is itself
/// overwhelming.
pub fn is_valid_mate_in_one(pair: &NextMovePair, config: &CookConfig) -> bool {
    if pair.best.score != puzzle_core::Score::Mate(1) {
        return false;
    }
    match pair.second {
        None => true,
        Some(second) => second.score.win_chances() <= config.mate_in_one_ceiling,
    }
}

/// Is `pair.best` the only reasonable continuation?
pub fn is_valid_attack(pair: &NextMovePair, config: &CookConfig) -> bool {
    match pair.second {
        None => true,
        Some(second) => {
            is_valid_mate_in_one(pair, config)
                || pair.best.score.win_chances()
                    > second.score.win_chances() + config.attack_margin
        }
    }
}

/// Rank the two best moves at `node`, scored for `winner`. `None` when the
/// engine has nothing to offer.
pub async fn get_next_move_pair<E: Engine>(
    engine: &mut E,
    tree: &GameTree,
    node: NodeId,
    winner: Color,
    limit: &Limit,
) -> Result<Option<NextMovePair>, CookError> {
    let candidates = engine.analyze(tree, node, limit, 2).await?;
    let mut ranked = candidates.into_iter().map(|c| EngineMove {
        mv: c.mv,
        score: c.score.pov(winner),
    });

    let Some(best) = ranked.next() else {
        return Ok(None);
    };
    Ok(Some(NextMovePair {
        node,
        winner,
        best,
        second: ranked.next(),
    }))
}

/// Ranked pair at the pair budget, rejected when the winner is to move and
/// the best move is not unique.
pub async fn get_next_pair<E: Engine>(
    engine: &mut E,
    tree: &GameTree,
    node: NodeId,
    winner: Color,
    config: &CookConfig,
) -> Result<Option<NextMovePair>, CookError> {
    let Some(pair) = get_next_move_pair(engine, tree, node, winner, &config.pair_limit).await?
    else {
        return Ok(None);
    };
    if tree.position(node).turn() == winner && !is_valid_attack(&pair, config) {
        debug!(
            best = %pair.best.score,
            second = ?pair.second.map(|s| s.score.to_string()),
            "No valid attack"
        );
        return Ok(None);
    }
    Ok(Some(pair))
}

/// The engine's single best move.
pub async fn get_next_move<E: Engine>(
    engine: &mut E,
    tree: &GameTree,
    node: NodeId,
    limit: &Limit,
) -> Result<Option<Move>, CookError> {
    let candidates = engine.analyze(tree, node, limit, 1).await?;
    Ok(candidates.first().map(|c| c.mv))
}

/// Build a forced mating line for `winner` from `node`.
///
/// `Ok(None)` means no sound line exists: a solver move was not unique, a
/// solver move no longer mates soon, or a move could not be played. An
/// empty line means the position is already over.
pub async fn cook_mate<E: Engine>(
    engine: &mut E,
    tree: &mut GameTree,
    node: NodeId,
    winner: Color,
    config: &CookConfig,
) -> Result<Option<Vec<Move>>, CookError> {
    let mut line = Vec::new();
    let mut node = node;

    loop {
        if tree.is_game_over(node) {
            return Ok(Some(line));
        }

        let mv = if tree.position(node).turn() == winner {
            let Some(pair) = get_next_pair(engine, tree, node, winner, config).await? else {
                return Ok(None);
            };
            if pair.best.score < config.mate_soon {
                debug!(score = %pair.best.score, "Best move is not a mate, search is probably too shallow");
                return Ok(None);
            }
            pair.best.mv
        } else {
            match get_next_move(engine, tree, node, &config.mate_defense_limit).await? {
                Some(mv) => mv,
                None => return Ok(None),
            }
        };

        node = match tree.add_variation(node, mv) {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, "Engine move rejected, abandoning mate line");
                return Ok(None);
            }
        };
        line.push(mv);
    }
}

/// Build a forced winning line for `winner` from `node`, keeping every
/// step's ranked pair so the screener can see where the line stays sound.
///
/// The line stops, successfully, at the first solver move that is not
/// unique. `Ok(None)` means the line ran into a repetition or an
/// unplayable move.
pub async fn cook_advantage<E: Engine>(
    engine: &mut E,
    tree: &mut GameTree,
    node: NodeId,
    winner: Color,
    config: &CookConfig,
) -> Result<Option<Vec<NextMovePair>>, CookError> {
    let mut line = Vec::new();
    let mut node = node;

    loop {
        if tree.repetitions(node) >= config.repetition_limit {
            debug!(ply = tree.node(node).ply(), "Repeated position, no puzzle");
            return Ok(None);
        }
        if tree.is_game_over(node) {
            return Ok(Some(line));
        }

        let Some(pair) = get_next_pair(engine, tree, node, winner, config).await? else {
            return Ok(Some(line));
        };

        node = match tree.add_variation(node, pair.best.mv) {
            Ok(next) => next,
            Err(e) => {
                warn!(
                    error = %e,
                    uci = %pair.best.mv.to_uci(CastlingMode::Standard),
                    "Engine move rejected, abandoning advantage line"
                );
                return Ok(None);
            }
        };
        line.push(pair);
    }
}
