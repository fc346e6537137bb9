//! Game record ingestion: one game per line, `id;fen;uci moves`.

use shakmaty::Chess;

use crate::error::TreeError;
use crate::tree::GameTree;

/// Plies kept from each game; later moves are dropped at ingestion.
pub const MAX_PLY: u32 = 85;

/// Parse one game line into a tree whose main line is the game.
///
/// An empty FEN field means the standard starting position. Moves are
/// applied while the current position's absolute ply is below `max_ply`.
pub fn parse_game_line(line: &str, max_ply: u32) -> Result<GameTree, TreeError> {
    let mut fields = line.trim_end_matches(['\r', '\n']).splitn(3, ';');

    let id = fields
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TreeError::MalformedRecord(format!("missing game id: {line:?}")))?;
    let fen = fields
        .next()
        .ok_or_else(|| TreeError::MalformedRecord(format!("missing position field: {line:?}")))?;
    let moves = fields
        .next()
        .ok_or_else(|| TreeError::MalformedRecord(format!("missing move list: {line:?}")))?;

    let mut tree = if fen.trim().is_empty() {
        GameTree::new(id, Chess::default())
    } else {
        GameTree::from_fen(id, fen)?
    };

    let mut node = tree.root();
    for uci in moves.split_whitespace() {
        if tree.node(node).ply() >= max_ply {
            break;
        }
        node = tree.add_uci(node, uci)?;
    }

    Ok(tree)
}
