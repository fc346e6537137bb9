/// Position screener: walks an evaluated game ply by ply and decides which
/// moments are worth cooking into puzzles.

use puzzle_core::{GameTree, NodeId, Score};
use shakmaty::Position;
use tracing::{debug, info, warn};

use super::cook::{cook_advantage, cook_mate};
use super::{NextMovePair, Puzzle, MATE_ENDING_STRENGTH, MATE_STRENGTH};
use crate::config::CookConfig;
use crate::engine::Engine;
use crate::error::CookError;
use crate::material::{is_up_in_material, material_count};
use crate::store::PuzzleStore;

/// Evaluate every main-line position except the last at the game budget.
pub async fn evaluate_game<E: Engine>(
    engine: &mut E,
    tree: &mut GameTree,
    config: &CookConfig,
) -> Result<(), CookError> {
    let mut node = tree.root();
    while !tree.is_end(node) {
        let eval = engine.analyze(tree, node, &config.game_limit, 1).await?;
        debug!(
            ply = tree.node(node).ply(),
            score = ?eval.first().map(|c| c.score.white().to_string()),
            "Evaluated"
        );
        tree.set_eval(node, eval);
        node = tree.variation(node, 0)?;
    }
    Ok(())
}

/// Evaluate a game, then screen it. Returns the puzzles found, anchored in
/// `tree`. The engine should have been told about the new game already.
pub async fn analyze_game<E: Engine, S: PuzzleStore>(
    engine: &mut E,
    store: &S,
    tree: &mut GameTree,
    config: &CookConfig,
) -> Result<Vec<Puzzle>, CookError> {
    info!(game_id = tree.id(), "Analyzing game");

    evaluate_game(engine, tree, config).await?;

    let puzzles = screen_game(engine, store, tree, config).await?;
    if !puzzles.is_empty() {
        info!(game_id = tree.id(), count = puzzles.len(), "Found puzzles");
    }
    Ok(puzzles)
}

/// Screen an already evaluated game.
pub async fn screen_game<E: Engine, S: PuzzleStore>(
    engine: &mut E,
    store: &S,
    tree: &GameTree,
    config: &CookConfig,
) -> Result<Vec<Puzzle>, CookError> {
    let mut prev_score = config.initial_score;
    let mut puzzles = Vec::new();
    let mut node = tree.root();

    while !tree.is_end(node) {
        let Some(current) = tree.eval(node).and_then(|eval| eval.first()) else {
            warn!(
                game_id = tree.id(),
                ply = tree.node(node).ply(),
                "Missing evaluation, skipping rest of game"
            );
            return Ok(puzzles);
        };

        let result = if tree.parent(node).is_none() {
            // Nothing leads to the root, so it cannot anchor a puzzle.
            current.score.pov(tree.node(node).turn())
        } else {
            let (score, puzzle) =
                analyze_position(engine, store, tree, node, prev_score, config).await?;
            if let Some(puzzle) = puzzle {
                info!(game_id = tree.id(), ply = tree.node(node).ply(), "Found puzzle");
                puzzles.push(puzzle);
            }
            score
        };

        prev_score = -result;
        node = tree.variation(node, 0)?;
    }

    Ok(puzzles)
}

/// Decide whether the position at `node` is a puzzle, given the score of the
/// previous ply from the perspective of the side now to move. Returns the
/// node's own score alongside the verdict.
pub async fn analyze_position<E: Engine, S: PuzzleStore>(
    engine: &mut E,
    store: &S,
    tree: &GameTree,
    node: NodeId,
    prev_score: Score,
    config: &CookConfig,
) -> Result<(Score, Option<Puzzle>), CookError> {
    let position = tree.position(node);
    let winner = position.turn();
    let ply = tree.node(node).ply();
    let Some(current) = tree.eval(node).and_then(|eval| eval.first()) else {
        return Ok((prev_score, None));
    };
    let score = current.score.pov(winner);

    debug!(ply, prev = %prev_score, score = %score, "Analyzing position");

    if position.legal_moves().len() < 2 {
        debug!(ply, "Not enough legal moves");
        return Ok((score, None));
    }

    if prev_score > config.winning_ceiling && score < config.mate_soon {
        debug!(ply, prev = %prev_score, score = %score, "Too much of a winning position to start with");
        return Ok((score, None));
    }

    if is_up_in_material(position, winner) && prev_score > config.material_ceiling {
        debug!(
            ply,
            ours = material_count(position, winner),
            theirs = material_count(position, !winner),
            "Already up in material"
        );
        return Ok((score, None));
    }

    if score >= Score::Mate(1) && !config.allow_mate_in_one {
        debug!(ply, "Mate in one");
        return Ok((score, None));
    }

    let key = tree.fen(node);

    if score > config.mate_soon {
        debug!(ply, score = %score, "Mate, probing");
        if store.is_seen_position(&key).await? {
            debug!(ply, "Skip duplicate position");
            return Ok((score, None));
        }
        let mut copy = tree.deep_copy(node);
        let root = copy.root();
        let solution = cook_mate(engine, &mut copy, root, winner, config).await?;
        store.mark_seen_position(&key).await?;

        let puzzle = solution.map(|moves| Puzzle {
            node,
            moves,
            cp: MATE_STRENGTH,
        });
        return Ok((score, puzzle));
    }

    let jump = score.win_chances() - prev_score.win_chances();
    if jump > config.advantage_jump {
        if score < config.advantage_floor && jump < config.equalizing_jump {
            debug!(ply, "Not clearly winning and not equalizing enough, aborting");
            return Ok((score, None));
        }
        debug!(ply, prev = %prev_score, score = %score, "Advantage, probing");
        if store.is_seen_position(&key).await? {
            debug!(ply, "Skip duplicate position");
            return Ok((score, None));
        }
        let mut copy = tree.deep_copy(node);
        let root = copy.root();
        let solution = cook_advantage(engine, &mut copy, root, winner, config).await?;
        store.mark_seen_position(&key).await?;

        let Some(solution) = solution else {
            return Ok((score, None));
        };
        let solution = trim_advantage_line(solution);
        if solution.len() <= 1 {
            debug!(ply, "Discard one-mover");
            return Ok((score, None));
        }

        let cp = solution
            .last()
            .and_then(|pair| pair.best.score.cp())
            .unwrap_or(MATE_ENDING_STRENGTH);
        let moves = solution.iter().map(|pair| pair.best.mv).collect();
        return Ok((score, Some(Puzzle { node, moves, cp })));
    }

    debug!(ply, score = %score, win_chances = score.win_chances(), "Nothing");
    Ok((score, None))
}

/// Drop trailing steps until the line ends on a solver move that beat a
/// real runner-up. Solver moves sit at even indices, so a sound line has
/// odd length.
pub fn trim_advantage_line(mut solution: Vec<NextMovePair>) -> Vec<NextMovePair> {
    while let Some(last) = solution.last() {
        if solution.len() % 2 == 1 && last.second.is_some() {
            break;
        }
        if last.second.is_none() {
            debug!("Remove final only-move");
        }
        solution.pop();
    }
    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::EngineMove;
    use shakmaty::{Chess, Color, Square};

    fn step(second: bool) -> NextMovePair {
        let pos = Chess::default();
        let mv = pos
            .legal_moves()
            .into_iter()
            .find(|m| m.from() == Some(Square::G1) && m.to() == Square::F3)
            .unwrap();
        let best = EngineMove {
            mv,
            score: Score::Cp(500),
        };
        NextMovePair {
            node: GameTree::new("t", pos).root(),
            winner: Color::White,
            best,
            second: second.then_some(best),
        }
    }

    #[test]
    fn test_trim_keeps_odd_line_ending_on_validated_move() {
        let line = vec![step(true), step(false), step(true)];
        assert_eq!(trim_advantage_line(line).len(), 3);
    }

    #[test]
    fn test_trim_drops_to_odd_length() {
        let line = vec![step(true), step(true), step(true), step(true)];
        assert_eq!(trim_advantage_line(line).len(), 3);
    }

    #[test]
    fn test_trim_drops_final_only_move() {
        // Odd length, but the final solver move had no alternative.
        let line = vec![step(true), step(true), step(false)];
        assert_eq!(trim_advantage_line(line).len(), 1);

        let line = vec![step(true), step(true), step(true), step(true), step(false)];
        assert_eq!(trim_advantage_line(line).len(), 3);
    }

    #[test]
    fn test_trim_can_consume_everything() {
        assert!(trim_advantage_line(vec![step(false)]).is_empty());
        assert!(trim_advantage_line(vec![step(true), step(true)]).len() == 1);
        assert!(trim_advantage_line(Vec::new()).is_empty());
    }

    #[test]
    fn test_trimmed_lines_are_odd_and_validated() {
        for mask in 0u32..64 {
            for len in 0..6 {
                let line: Vec<_> = (0..len).map(|i| step(mask & (1 << i) != 0)).collect();
                let trimmed = trim_advantage_line(line);
                if let Some(last) = trimmed.last() {
                    assert_eq!(trimmed.len() % 2, 1);
                    assert!(last.second.is_some());
                }
            }
        }
    }
}
