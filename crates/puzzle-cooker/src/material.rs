//! Material counting for the screener's "already ahead" rule

use shakmaty::{Chess, Color, Position};

pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;

/// Material of one side, kings excluded.
pub fn material_count(position: &Chess, color: Color) -> i32 {
    let material = position.board().material_side(color);

    i32::from(material.pawn) * PAWN_VALUE
        + i32::from(material.knight) * KNIGHT_VALUE
        + i32::from(material.bishop) * BISHOP_VALUE
        + i32::from(material.rook) * ROOK_VALUE
        + i32::from(material.queen) * QUEEN_VALUE
}

/// Material difference (positive = side has more)
pub fn material_diff(position: &Chess, side: Color) -> i32 {
    material_count(position, side) - material_count(position, !side)
}

pub fn is_up_in_material(position: &Chess, side: Color) -> bool {
    material_diff(position, side) > 0
}
