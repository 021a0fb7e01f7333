//! Read-only position view consumed by the evaluation core.
//!
//! This is not a playable board: there is no move generation and no
//! make/unmake. The host search owns the real board and hands the
//! evaluator a snapshot exposing piece placement, material totals and
//! attacker-set queries.
//!
//! # Example
//! ```
//! use chess_eval::position::Position;
//!
//! let pos = Position::new();
//! assert_eq!(pos.piece_count(), 32);
//! ```

mod attacks;
mod fen;
mod types;

pub use fen::FenError;
pub use types::{Bitboard, BitboardIter, Color, Piece, Square};

use attacks::{pawn_attacks, slider_attacks, KING_ATTACKS, KNIGHT_ATTACKS};

/// Simple piece values on the centipawn scale used for material totals
/// and the phase detectors (pawn = 100).
pub const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 20000];

/// Pawn value on the evaluation scale used by `simple_eval`.
pub const PAWN_VALUE: i32 = 208;

/// Non-pawn piece values on the evaluation scale (knight..queen).
const NON_PAWN_VALUES: [i32; 6] = [0, 781, 825, 1276, 2538, 0];

/// Read-only board snapshot.
#[derive(Clone, Debug)]
pub struct Position {
    pieces: [[Bitboard; 6]; 2],
    occupied: [Bitboard; 2],
    all_occupied: Bitboard,
    side_to_move: Color,
    halfmove_clock: u32,
}

impl Position {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        let mut pos = Position::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (file, piece) in back_rank.iter().enumerate() {
            pos.set_piece(Square(0, file), Color::White, *piece);
            pos.set_piece(Square(7, file), Color::Black, *piece);
            pos.set_piece(Square(1, file), Color::White, Piece::Pawn);
            pos.set_piece(Square(6, file), Color::Black, Piece::Pawn);
        }
        pos
    }

    pub(crate) fn empty() -> Self {
        Position {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            side_to_move: Color::White,
            halfmove_clock: 0,
        }
    }

    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bb = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] |= bb;
        self.occupied[color.index()] |= bb;
        self.all_occupied |= bb;
    }

    pub(crate) fn set_side_to_move(&mut self, color: Color) {
        self.side_to_move = color;
    }

    pub(crate) fn set_halfmove_clock(&mut self, clock: u32) {
        self.halfmove_clock = clock;
    }

    /// Side to move.
    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Halfmove clock for the 50-move rule.
    #[inline]
    #[must_use]
    pub fn rule50_count(&self) -> u32 {
        self.halfmove_clock
    }

    /// Bitboard of one piece type for one color.
    #[inline]
    #[must_use]
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    /// Bitboard of one piece type for both colors.
    #[inline]
    #[must_use]
    pub fn pieces_both(&self, piece: Piece) -> Bitboard {
        self.pieces[0][piece.index()] | self.pieces[1][piece.index()]
    }

    /// All pieces of one color.
    #[inline]
    #[must_use]
    pub fn occupied(&self, color: Color) -> Bitboard {
        self.occupied[color.index()]
    }

    /// All pieces on the board.
    #[inline]
    #[must_use]
    pub fn all_occupied(&self) -> Bitboard {
        self.all_occupied
    }

    /// The piece on a square, if any.
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        let bb = Bitboard::from_square(sq);
        for color in [Color::White, Color::Black] {
            if (self.occupied[color.index()] & bb).is_empty() {
                continue;
            }
            for piece in Piece::ALL {
                if !(self.pieces[color.index()][piece.index()] & bb).is_empty() {
                    return Some((color, piece));
                }
            }
        }
        None
    }

    /// Number of pieces of one type for one color.
    #[inline]
    #[must_use]
    pub fn count(&self, color: Color, piece: Piece) -> i32 {
        self.pieces(color, piece).popcount() as i32
    }

    /// Number of pieces of one type for both colors.
    #[inline]
    #[must_use]
    pub fn count_both(&self, piece: Piece) -> i32 {
        self.pieces_both(piece).popcount() as i32
    }

    /// Total number of pieces on the board.
    #[inline]
    #[must_use]
    pub fn piece_count(&self) -> i32 {
        self.all_occupied.popcount() as i32
    }

    /// King square for one color. The view tolerates king-less test
    /// positions, hence the Option.
    #[must_use]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color, Piece::King).iter().next()
    }

    /// Non-pawn material for one color on the evaluation scale.
    #[must_use]
    pub fn non_pawn_material(&self, color: Color) -> i32 {
        let mut total = 0;
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            total += self.count(color, piece) * NON_PAWN_VALUES[piece.index()];
        }
        total
    }

    /// Non-pawn material for both colors on the evaluation scale.
    #[inline]
    #[must_use]
    pub fn non_pawn_material_total(&self) -> i32 {
        self.non_pawn_material(Color::White) + self.non_pawn_material(Color::Black)
    }

    /// Total material for both colors on the simple centipawn scale,
    /// kings excluded, pawns included.
    #[must_use]
    pub fn material_total(&self) -> i32 {
        let mut total = 0;
        for color in [Color::White, Color::Black] {
            for piece in Piece::NON_KING {
                total += self.count(color, piece) * PIECE_VALUES[piece.index()];
            }
        }
        total
    }

    /// Pieces of `color` attacking `sq`.
    #[must_use]
    pub fn attackers_to_by(&self, sq: Square, color: Color) -> Bitboard {
        let c = color.index();
        let occ = self.all_occupied.0;
        let idx = sq.index();

        let mut attackers = pawn_attacks(color.opponent(), sq) & self.pieces[c][Piece::Pawn.index()];
        attackers |= Bitboard(KNIGHT_ATTACKS[idx]) & self.pieces[c][Piece::Knight.index()];
        attackers |= Bitboard(KING_ATTACKS[idx]) & self.pieces[c][Piece::King.index()];

        let diag = Bitboard(slider_attacks(idx, occ, true));
        attackers |= diag & (self.pieces[c][Piece::Bishop.index()] | self.pieces[c][Piece::Queen.index()]);
        let ortho = Bitboard(slider_attacks(idx, occ, false));
        attackers |= ortho & (self.pieces[c][Piece::Rook.index()] | self.pieces[c][Piece::Queen.index()]);

        attackers
    }

    /// Pieces of either color attacking `sq`.
    #[inline]
    #[must_use]
    pub fn attackers_to(&self, sq: Square) -> Bitboard {
        self.attackers_to_by(sq, Color::White) | self.attackers_to_by(sq, Color::Black)
    }

    /// Attack squares reachable by the minor and major pieces of both
    /// sides, a coarse mobility proxy for the static phase detector.
    #[must_use]
    pub fn mobility_score(&self) -> i32 {
        let occ = self.all_occupied.0;
        let mut mobility = Bitboard::EMPTY;
        for c in 0..2 {
            for sq in self.pieces[c][Piece::Knight.index()].iter() {
                mobility |= Bitboard(KNIGHT_ATTACKS[sq.index()]);
            }
            for sq in self.pieces[c][Piece::Bishop.index()].iter() {
                mobility |= Bitboard(slider_attacks(sq.index(), occ, true));
            }
            for sq in self.pieces[c][Piece::Rook.index()].iter() {
                mobility |= Bitboard(slider_attacks(sq.index(), occ, false));
            }
            for sq in self.pieces[c][Piece::Queen.index()].iter() {
                mobility |= Bitboard(slider_attacks(sq.index(), occ, true))
                    | Bitboard(slider_attacks(sq.index(), occ, false));
            }
        }
        mobility.popcount() as i32
    }

    /// Pawn structure quality proxy: starts at 100, penalized for doubled
    /// and isolated pawns on either side.
    #[must_use]
    pub fn pawn_structure_score(&self) -> i32 {
        let mut score = 100;
        for color in [Color::White, Color::Black] {
            let pawns = self.pieces(color, Piece::Pawn);
            for file in 0..8 {
                let on_file = (pawns & Bitboard::file(file)).popcount() as i32;
                if on_file > 1 {
                    score -= 12 * (on_file - 1);
                }
                if on_file > 0 {
                    let left = if file > 0 {
                        (pawns & Bitboard::file(file - 1)).popcount()
                    } else {
                        0
                    };
                    let right = if file < 7 {
                        (pawns & Bitboard::file(file + 1)).popcount()
                    } else {
                        0
                    };
                    if left == 0 && right == 0 {
                        score -= 8;
                    }
                }
            }
        }
        score.max(0)
    }

    /// King safety for `color`: attacker penalty minus pawn-shield bonus.
    /// Higher values mean a weaker king.
    #[must_use]
    pub fn king_safety_score(&self, color: Color) -> i32 {
        let Some(king) = self.king_square(color) else {
            return 0;
        };
        let attackers = self.attackers_to_by(king, color.opponent());
        let penalty = attackers.popcount() as i32 * 10;

        let shield =
            self.pieces(color, Piece::Pawn) & Bitboard(KING_ATTACKS[king.index()]);
        let shield_bonus = shield.popcount() as i32 * 5;

        penalty - shield_bonus
    }

    /// True when the side to move has given up a minor piece or more of
    /// non-pawn material while keeping pressure on the enemy king ring.
    #[must_use]
    pub fn is_sacrifice(&self) -> bool {
        let us = self.side_to_move;
        let deficit = self.non_pawn_material(us.opponent()) - self.non_pawn_material(us);
        if deficit < NON_PAWN_VALUES[Piece::Knight.index()] {
            return false;
        }
        let Some(enemy_king) = self.king_square(us.opponent()) else {
            return false;
        };
        let mut pressure = self.attackers_to_by(enemy_king, us);
        for sq in Bitboard(KING_ATTACKS[enemy_king.index()]).iter() {
            pressure |= self.attackers_to_by(sq, us);
        }
        pressure.popcount() >= 2
    }

    /// True when the pawn structures mirror each other vertically.
    #[inline]
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.pieces(Color::White, Piece::Pawn).flip_vertical()
            == self.pieces(Color::Black, Piece::Pawn)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}
