//! Position-derived indicators feeding the style control loop.
//!
//! All values are recomputed fresh from the position view on each call;
//! nothing here is cached or persisted.

use crate::position::{Bitboard, Color, Piece, Position, Square};

const CENTER: [Square; 4] = [Square(3, 3), Square(3, 4), Square(4, 3), Square(4, 4)];
const FLANKS: [Square; 4] = [Square(3, 0), Square(4, 0), Square(3, 7), Square(4, 7)];
const ADVANCED: [Square; 6] = [
    Square(3, 3),
    Square(3, 4),
    Square(4, 3),
    Square(4, 4),
    Square(3, 5),
    Square(4, 5),
];

/// Ephemeral snapshot of the positional character of one position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionalIndicators {
    /// Weakness of the side to move's king (higher is weaker)
    pub king_safety: i32,
    /// Rook/queen control of open files, white minus black
    pub open_file_control: i32,
    /// Occupation of and pressure on the four central squares
    pub center_dominance: i32,
    /// Non-pawn material difference, white minus black
    pub material_imbalance: i32,
    /// Number of occupied central squares
    pub center_control: i32,
    /// Attack differential on the flank squares, white minus black
    pub flank_control: i32,
    /// Attack differential on the advanced central squares
    pub piece_activity: i32,
    /// Pieces bearing on the side to move's own king square
    pub defensive_strength: i32,
}

/// King safety for the side to move: attacker penalty minus pawn-shield
/// bonus, higher values meaning a weaker king.
#[must_use]
pub fn compute_king_safety(pos: &Position) -> i32 {
    pos.king_safety_score(pos.side_to_move())
}

/// Non-pawn material difference, white minus black.
#[must_use]
pub fn compute_material_imbalance(pos: &Position) -> i32 {
    pos.non_pawn_material(Color::White) - pos.non_pawn_material(Color::Black)
}

/// Number of central squares occupied by any piece.
#[must_use]
pub fn compute_center_control(pos: &Position) -> i32 {
    CENTER
        .iter()
        .filter(|&&sq| pos.piece_at(sq).is_some())
        .count() as i32
}

/// Occupation of the center (weighted) plus pieces attacking it.
#[must_use]
pub fn compute_center_dominance(pos: &Position) -> i32 {
    let mut in_center = 0;
    let mut attackers = Bitboard::EMPTY;
    for &sq in &CENTER {
        if pos.piece_at(sq).is_some() {
            in_center += 1;
        }
        attackers |= pos.attackers_to(sq);
    }
    in_center * 3 + attackers.popcount() as i32
}

/// Attack differential over the flank squares.
#[must_use]
pub fn compute_flank_control(pos: &Position) -> i32 {
    let mut control = 0;
    for &sq in &FLANKS {
        if !pos.attackers_to_by(sq, Color::White).is_empty() {
            control += 1;
        }
        if !pos.attackers_to_by(sq, Color::Black).is_empty() {
            control -= 1;
        }
    }
    control
}

/// Attack differential over the advanced central squares.
#[must_use]
pub fn compute_piece_activity(pos: &Position) -> i32 {
    let mut activity = 0;
    for &sq in &ADVANCED {
        if !pos.attackers_to_by(sq, Color::White).is_empty() {
            activity += 1;
        }
        if !pos.attackers_to_by(sq, Color::Black).is_empty() {
            activity -= 1;
        }
    }
    activity
}

/// Weighted rook/queen control of every square on the open files.
#[must_use]
pub fn compute_open_file_control(pos: &Position) -> i32 {
    let pawns = pos.pieces_both(Piece::Pawn);
    let mut control = 0;
    for file in 0..8 {
        if !(pawns & Bitboard::file(file)).is_empty() {
            continue;
        }
        for rank in 0..8 {
            let sq = Square(rank, file);
            let white = pos.attackers_to_by(sq, Color::White);
            let black = pos.attackers_to_by(sq, Color::Black);
            control += 2 * (white & pos.pieces(Color::White, Piece::Rook)).popcount() as i32;
            control += (white & pos.pieces(Color::White, Piece::Queen)).popcount() as i32;
            control -= 2 * (black & pos.pieces(Color::Black, Piece::Rook)).popcount() as i32;
            control -= (black & pos.pieces(Color::Black, Piece::Queen)).popcount() as i32;
        }
    }
    control
}

/// Pieces of either color bearing on the enemy king square.
#[must_use]
pub fn compute_aggressivity(pos: &Position) -> i32 {
    match pos.king_square(pos.side_to_move().opponent()) {
        Some(king) => pos.attackers_to(king).popcount() as i32,
        None => 0,
    }
}

/// Own pieces occupying the central squares.
#[must_use]
pub fn compute_position(pos: &Position) -> i32 {
    let us = pos.side_to_move();
    CENTER
        .iter()
        .filter(|&&sq| pos.occupied(us).contains(sq))
        .count() as i32
}

/// Pieces of either color bearing on the own king square.
#[must_use]
pub fn compute_defense(pos: &Position) -> i32 {
    match pos.king_square(pos.side_to_move()) {
        Some(king) => pos.attackers_to(king).popcount() as i32,
        None => 0,
    }
}

/// Compute the full indicator snapshot.
#[must_use]
pub fn compute_positional_indicators(pos: &Position) -> PositionalIndicators {
    PositionalIndicators {
        king_safety: compute_king_safety(pos),
        open_file_control: compute_open_file_control(pos),
        center_dominance: compute_center_dominance(pos),
        material_imbalance: compute_material_imbalance(pos),
        center_control: compute_center_control(pos),
        flank_control: compute_flank_control(pos),
        piece_activity: compute_piece_activity(pos),
        defensive_strength: compute_defense(pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pos(fen: &str) -> Position {
        fen.parse().expect("valid fen")
    }

    #[test]
    fn test_startpos_is_balanced() {
        let pos = Position::new();
        let ind = compute_positional_indicators(&pos);
        assert_eq!(ind.material_imbalance, 0);
        assert_eq!(ind.center_control, 0);
        assert_eq!(ind.flank_control, 0);
        assert_eq!(ind.piece_activity, 0);
        assert_eq!(ind.open_file_control, 0);
    }

    #[test]
    fn test_center_control_counts_occupied() {
        let pos = make_pos("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1");
        assert_eq!(compute_center_control(&pos), 2);
    }

    #[test]
    fn test_center_dominance_grows_with_pressure() {
        let quiet = make_pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        let pressing = make_pos("4k3/8/8/2NpP3/8/2B5/8/4K3 w - - 0 1");
        assert!(compute_center_dominance(&pressing) > compute_center_dominance(&quiet));
    }

    #[test]
    fn test_material_imbalance_sign() {
        let white_up = make_pos("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1");
        assert!(compute_material_imbalance(&white_up) > 0);
        let black_up = make_pos("q3k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert!(compute_material_imbalance(&black_up) < 0);
    }

    #[test]
    fn test_open_file_control_favors_rook_owner() {
        // Only white has a rook on the open e-file
        let pos = make_pos("4k3/p7/8/8/8/8/P7/R3K3 w - - 0 1");
        assert!(compute_open_file_control(&pos) > 0);
    }

    #[test]
    fn test_flank_control_differential() {
        // White rook on a1 controls a4/a5 on the open a-file
        let pos = make_pos("4k3/4p3/8/8/8/8/4P3/R3K3 w - - 0 1");
        assert!(compute_flank_control(&pos) > 0);
    }

    #[test]
    fn test_aggressivity_counts_king_attackers() {
        let quiet = Position::new();
        // Rook on d8 and queen on a2 both bear on g8
        let attacking = make_pos("3R2k1/7p/8/8/8/8/Q7/6K1 w - - 0 1");
        assert!(compute_aggressivity(&attacking) > compute_aggressivity(&quiet));
    }

    #[test]
    fn test_defense_counts_own_king_cover() {
        let covered = make_pos("4k3/8/8/8/8/8/3PPP2/3QKR2 w - - 0 1");
        let bare = make_pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert!(compute_defense(&covered) > compute_defense(&bare));
    }
}
