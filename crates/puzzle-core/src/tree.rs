//! Arena-backed game tree.
//!
//! Nodes live in a vector owned by [`GameTree`] and refer to each other by
//! [`NodeId`]. The first child of a node is its main line. Walking and
//! copying are iterative, so trees far deeper than a game's length never
//! touch the native stack.

use std::str::FromStr;

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};

use crate::error::TreeError;
use crate::score::PovScore;

/// Index of a node inside its [`GameTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One ranked engine candidate: the first move of a principal variation
/// and its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub mv: Move,
    pub score: PovScore,
}

/// A position in a line.
#[derive(Debug, Clone)]
pub struct Node {
    position: Chess,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mv: Option<Move>,
    ply: u32,
    eval: Option<Vec<Candidate>>,
}

impl Node {
    /// Position reached after this node's move.
    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Move that produced this node (`None` at the root).
    pub fn mv(&self) -> Option<Move> {
        self.mv
    }

    /// Absolute ply of the position: number of half-moves played since the
    /// initial position of the game.
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Cached engine ranking, best first.
    pub fn eval(&self) -> Option<&[Candidate]> {
        self.eval.as_deref()
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }
}

/// A mutable tree of positions rooted at one position of a game.
#[derive(Debug, Clone)]
pub struct GameTree {
    id: String,
    /// Position the move history starts from.
    origin: Chess,
    /// Moves from `origin` to the root (non-empty for detached copies).
    prelude: Vec<Move>,
    /// Repetition keys of the positions along `prelude`, origin included.
    history: Vec<String>,
    nodes: Vec<Node>,
}

impl GameTree {
    /// New tree whose root is `origin`.
    pub fn new(id: impl Into<String>, origin: Chess) -> Self {
        let ply = absolute_ply(&origin);
        let root = Node {
            position: origin.clone(),
            parent: None,
            children: Vec::new(),
            mv: None,
            ply,
            eval: None,
        };
        Self {
            id: id.into(),
            origin,
            prelude: Vec::new(),
            history: Vec::new(),
            nodes: vec![root],
        }
    }

    /// New tree rooted at a FEN position.
    pub fn from_fen(id: impl Into<String>, fen: &str) -> Result<Self, TreeError> {
        let fen = Fen::from_str(fen.trim())
            .map_err(|e| TreeError::InvalidFen(format!("{fen}: {e}")))?;
        let origin: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| TreeError::InvalidFen(e.to_string()))?;
        Ok(Self::new(id, origin))
    }

    /// Game identifier carried by the root.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn position(&self, id: NodeId) -> &Chess {
        &self.nodes[id.0].position
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn origin(&self) -> &Chess {
        &self.origin
    }

    /// Apply `mv` to the node's position and append the resulting child.
    pub fn add_variation(&mut self, id: NodeId, mv: Move) -> Result<NodeId, TreeError> {
        let parent = &self.nodes[id.0];
        let position = parent.position.clone().play(mv).map_err(|e| TreeError::IllegalMove {
            uci: e.m.to_uci(CastlingMode::Standard).to_string(),
            fen: fen_string(&e.position),
        })?;

        let child = NodeId(self.nodes.len());
        let ply = parent.ply.saturating_add(1);
        self.nodes.push(Node {
            position,
            parent: Some(id),
            children: Vec::new(),
            mv: Some(mv),
            ply,
            eval: None,
        });
        self.nodes[id.0].children.push(child);
        Ok(child)
    }

    /// Parse a UCI move in the node's position and append it.
    pub fn add_uci(&mut self, id: NodeId, uci: &str) -> Result<NodeId, TreeError> {
        let parsed = UciMove::from_str(uci).map_err(|_| TreeError::InvalidMove(uci.to_string()))?;
        let mv = parsed
            .to_move(self.position(id))
            .map_err(|_| TreeError::IllegalMove {
                uci: uci.to_string(),
                fen: self.fen(id),
            })?;
        self.add_variation(id, mv)
    }

    /// The `i`-th child of a node.
    pub fn variation(&self, id: NodeId, i: usize) -> Result<NodeId, TreeError> {
        self.nodes[id.0]
            .children
            .get(i)
            .copied()
            .ok_or(TreeError::IndexOutOfRange {
                index: i,
                len: self.nodes[id.0].children.len(),
            })
    }

    /// True when the main line has been walked to its end.
    pub fn is_end(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// True when the position has no legal continuation (mate, stalemate
    /// or insufficient material).
    pub fn is_game_over(&self, id: NodeId) -> bool {
        self.nodes[id.0].position.is_game_over()
    }

    pub fn set_eval(&mut self, id: NodeId, eval: Vec<Candidate>) {
        self.nodes[id.0].eval = Some(eval);
    }

    pub fn eval(&self, id: NodeId) -> Option<&[Candidate]> {
        self.nodes[id.0].eval()
    }

    /// Full FEN of the node, move counters included. Used as the
    /// idempotency key for probed positions.
    pub fn fen(&self, id: NodeId) -> String {
        fen_string(&self.nodes[id.0].position)
    }

    /// Moves from the game origin to `id`, in order.
    pub fn moves_to(&self, id: NodeId) -> Vec<Move> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            if let Some(mv) = node.mv {
                path.push(mv);
            }
            cursor = node.parent;
        }
        path.reverse();

        let mut moves = self.prelude.clone();
        moves.extend(path);
        moves
    }

    /// Main line from the root, root included.
    pub fn mainline(&self) -> Vec<NodeId> {
        let mut line = vec![self.root()];
        let mut current = self.root();
        while let Some(&next) = self.nodes[current.0].children.first() {
            line.push(next);
            current = next;
        }
        line
    }

    /// How many times the node's position has occurred along its history,
    /// itself included.
    pub fn repetitions(&self, id: NodeId) -> usize {
        let key = repetition_key(&self.nodes[id.0].position);
        let mut count = self.history.iter().filter(|k| **k == key).count();

        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            if repetition_key(&node.position) == key {
                count += 1;
            }
            cursor = node.parent;
        }
        count
    }

    /// Independent tree rooted at a copy of `id` and holding its whole
    /// subtree. The copy remembers the moves and positions leading to `id`
    /// so engines and repetition checks still see the game history.
    pub fn deep_copy(&self, id: NodeId) -> GameTree {
        let mut prelude = Vec::new();
        let mut history = Vec::new();
        let mut cursor = self.nodes[id.0].parent;
        let mut edge = self.nodes[id.0].mv;
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            if let Some(mv) = edge {
                prelude.push(mv);
            }
            history.push(repetition_key(&node.position));
            edge = node.mv;
            cursor = node.parent;
        }
        prelude.reverse();
        history.reverse();

        let mut full_prelude = self.prelude.clone();
        full_prelude.extend(prelude);
        let mut full_history = self.history.clone();
        full_history.extend(history);

        let mut nodes = Vec::new();
        let mut stack = vec![(id, None::<NodeId>)];
        while let Some((old, new_parent)) = stack.pop() {
            let source = &self.nodes[old.0];
            let new_id = NodeId(nodes.len());
            nodes.push(Node {
                position: source.position.clone(),
                parent: new_parent,
                children: Vec::with_capacity(source.children.len()),
                mv: if new_parent.is_some() { source.mv } else { None },
                ply: source.ply,
                eval: source.eval.clone(),
            });
            if let Some(p) = new_parent {
                let parent: &mut Node = &mut nodes[p.0];
                parent.children.push(new_id);
            }
            // Reverse so children are visited, and therefore appended, in
            // their original order.
            for &child in source.children.iter().rev() {
                stack.push((child, Some(new_id)));
            }
        }

        GameTree {
            id: self.id.clone(),
            origin: self.origin.clone(),
            prelude: full_prelude,
            history: full_history,
            nodes,
        }
    }
}

/// Full FEN of a position.
pub fn fen_string(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// FEN without the move counters: the part of a position that must match
/// for it to count as a repetition.
pub fn repetition_key(position: &Chess) -> String {
    let fen = fen_string(position);
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn absolute_ply(position: &Chess) -> u32 {
    let full = position.fullmoves().get();
    (full - 1)
        .saturating_mul(2)
        .saturating_add(u32::from(position.turn() == Color::Black))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROOKS: &str = "7k/8/R7/1R6/8/8/8/4K3 w - - 0 1";

    fn uci(tree: &GameTree, id: NodeId, s: &str) -> Move {
        UciMove::from_str(s).unwrap().to_move(tree.position(id)).unwrap()
    }

    #[test]
    fn test_add_variation_appends_children_in_order() {
        let mut tree = GameTree::new("g1", Chess::default());
        let root = tree.root();
        let e4 = tree.add_uci(root, "e2e4").unwrap();
        let d4 = tree.add_uci(root, "d2d4").unwrap();

        assert_eq!(tree.node(root).children(), &[e4, d4]);
        assert_eq!(tree.variation(root, 0).unwrap(), e4);
        assert_eq!(tree.variation(root, 1).unwrap(), d4);
        assert_eq!(tree.parent(e4), Some(root));
        assert_eq!(tree.node(e4).ply(), 1);
        assert_eq!(tree.node(e4).turn(), Color::Black);
    }

    #[test]
    fn test_variation_out_of_range() {
        let tree = GameTree::new("g1", Chess::default());
        let err = tree.variation(tree.root(), 0).unwrap_err();
        assert!(matches!(err, TreeError::IndexOutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn test_illegal_move_rejected() {
        let mut tree = GameTree::new("g1", Chess::default());
        let err = tree.add_uci(tree.root(), "e2e5").unwrap_err();
        assert!(matches!(err, TreeError::IllegalMove { .. }));
        assert_eq!(tree.len(), 1);

        let err = tree.add_uci(tree.root(), "zz").unwrap_err();
        assert!(matches!(err, TreeError::InvalidMove(_)));
    }

    #[test]
    fn test_is_end_and_game_over() {
        let mut tree = GameTree::from_fen("mate", TWO_ROOKS).unwrap();
        let root = tree.root();
        assert!(tree.is_end(root));
        assert!(!tree.is_game_over(root));

        let mv = uci(&tree, root, "b5b7");
        let n1 = tree.add_variation(root, mv).unwrap();
        let n2 = tree.add_uci(n1, "h8g8").unwrap();
        let n3 = tree.add_uci(n2, "a6a8").unwrap();
        assert!(!tree.is_end(root));
        assert!(tree.is_game_over(n3));
        assert!(tree.position(n3).is_checkmate());
    }

    #[test]
    fn test_ply_from_fen() {
        let tree =
            GameTree::from_fen("g", "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(tree.node(tree.root()).ply(), 1);

        let tree = GameTree::from_fen("g", "7k/8/8/8/8/8/8/K7 w - - 0 30").unwrap();
        assert_eq!(tree.node(tree.root()).ply(), 58);
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            GameTree::from_fen("g", "not a fen"),
            Err(TreeError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_moves_to_and_mainline() {
        let mut tree = GameTree::new("g1", Chess::default());
        let mut node = tree.root();
        for m in ["e2e4", "e7e5", "g1f3"] {
            node = tree.add_uci(node, m).unwrap();
        }
        let moves: Vec<String> = tree
            .moves_to(node)
            .into_iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect();
        assert_eq!(moves, vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(tree.mainline().len(), 4);
        assert_eq!(*tree.mainline().last().unwrap(), node);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut tree = GameTree::new("g1", Chess::default());
        let root = tree.root();
        let e4 = tree.add_uci(root, "e2e4").unwrap();
        let e5 = tree.add_uci(e4, "e7e5").unwrap();
        tree.add_uci(e5, "g1f3").unwrap();
        tree.add_uci(e5, "f1c4").unwrap();

        let mut copy = tree.deep_copy(e4);
        assert_eq!(copy.len(), 4);
        assert_eq!(copy.fen(copy.root()), tree.fen(e4));
        assert_eq!(copy.node(copy.root()).mv(), None);
        assert_eq!(copy.node(copy.root()).ply(), 1);

        let copy_e5 = copy.variation(copy.root(), 0).unwrap();
        let first = copy.variation(copy_e5, 0).unwrap();
        let second = copy.variation(copy_e5, 1).unwrap();
        assert_eq!(copy.fen(first), tree.fen(tree.variation(e5, 0).unwrap()));
        assert_eq!(copy.fen(second), tree.fen(tree.variation(e5, 1).unwrap()));

        // The copy still knows how the game reached its root.
        assert_eq!(copy.moves_to(copy_e5).len(), 2);

        copy.add_uci(copy_e5, "d2d4").unwrap();
        assert_eq!(copy.node(copy_e5).children().len(), 3);
        assert_eq!(tree.node(e5).children().len(), 2);
    }

    #[test]
    fn test_deep_copy_handles_long_games() {
        let mut tree = GameTree::new("long", Chess::default());
        let mut node = tree.root();
        for _ in 0..60 {
            for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                node = tree.add_uci(node, m).unwrap();
            }
        }
        assert_eq!(tree.node(node).ply(), 240);

        let copy = tree.deep_copy(tree.root());
        assert_eq!(copy.len(), tree.len());
        let last = *copy.mainline().last().unwrap();
        assert_eq!(copy.fen(last), tree.fen(node));

        let tail = tree.deep_copy(node);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail.moves_to(tail.root()).len(), 240);
    }

    #[test]
    fn test_repetitions_follow_history_into_copies() {
        let mut tree = GameTree::new("rep", Chess::default());
        let mut node = tree.root();
        assert_eq!(tree.repetitions(node), 1);

        for _ in 0..2 {
            for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                node = tree.add_uci(node, m).unwrap();
            }
        }
        assert_eq!(tree.repetitions(node), 3);

        let mut copy = tree.deep_copy(node);
        let mut tip = copy.root();
        assert_eq!(copy.repetitions(tip), 3);
        for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            tip = copy.add_uci(tip, m).unwrap();
        }
        assert_eq!(copy.repetitions(tip), 4);
    }

    #[test]
    fn test_eval_cache() {
        let mut tree = GameTree::new("g1", Chess::default());
        let root = tree.root();
        assert!(tree.eval(root).is_none());

        let mv = uci(&tree, root, "e2e4");
        let candidate = Candidate {
            mv,
            score: PovScore::new(crate::score::Score::Cp(30), Color::White),
        };
        tree.set_eval(root, vec![candidate]);
        assert_eq!(tree.eval(root).unwrap(), &[candidate]);
    }
}
