//! Game-phase detection.
//!
//! Two detectors coexist on purpose: the static one classifies from
//! total material plus mobility and pawn-structure proxies and is fully
//! stateless; the dynamic one looks at remaining material alone but
//! debounces phase flips so the style control loop never sees a
//! flickering phase. Their material cutoffs differ by design, matching
//! the call sites they serve.

use crate::position::Position;

/// Coarse game phase.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Consecutive identical computations required before the dynamic
/// detector commits a phase change.
pub const PHASE_DEBOUNCE: u32 = 3;

const STATIC_OPENING_MATERIAL: i32 = 12_000;
const STATIC_MIDDLEGAME_MATERIAL: i32 = 3_000;
const STATIC_OPENING_MOBILITY: i32 = 30;
const STATIC_MIDDLEGAME_MOBILITY: i32 = 15;
const STATIC_PAWN_STRUCTURE_FLOOR: i32 = 50;

const DYNAMIC_OPENING_MATERIAL: i32 = 3_000;
const DYNAMIC_MIDDLEGAME_MATERIAL: i32 = 2_000;

/// Stateless classification from material and heuristic proxies.
#[must_use]
pub fn static_phase(pos: &Position) -> GamePhase {
    let total_material = pos.material_total();
    let mobility = pos.mobility_score();
    let pawn_structure = pos.pawn_structure_score();

    if total_material > STATIC_OPENING_MATERIAL && mobility > STATIC_OPENING_MOBILITY {
        GamePhase::Opening
    } else if total_material > STATIC_MIDDLEGAME_MATERIAL
        || mobility > STATIC_MIDDLEGAME_MOBILITY
        || pawn_structure < STATIC_PAWN_STRUCTURE_FLOOR
    {
        GamePhase::Middlegame
    } else {
        GamePhase::Endgame
    }
}

fn classify_dynamic(pos: &Position) -> GamePhase {
    let remaining = pos.material_total();
    if remaining > DYNAMIC_OPENING_MATERIAL {
        GamePhase::Opening
    } else if remaining >= DYNAMIC_MIDDLEGAME_MATERIAL {
        GamePhase::Middlegame
    } else {
        GamePhase::Endgame
    }
}

/// Material-only phase detector with flip debouncing.
///
/// A computed phase differing from the stable one must repeat for
/// [`PHASE_DEBOUNCE`] consecutive updates before it is committed;
/// until then the previous stable phase keeps being reported.
#[derive(Clone, Debug)]
pub struct DynamicPhaseDetector {
    stable: GamePhase,
    candidate: GamePhase,
    streak: u32,
}

impl DynamicPhaseDetector {
    #[must_use]
    pub fn new() -> Self {
        DynamicPhaseDetector {
            stable: GamePhase::Opening,
            candidate: GamePhase::Opening,
            streak: 0,
        }
    }

    /// Currently stable phase, without recomputing.
    #[inline]
    #[must_use]
    pub fn current(&self) -> GamePhase {
        self.stable
    }

    /// Stability streak of the pending candidate (test observability).
    #[inline]
    #[must_use]
    pub fn pending_streak(&self) -> u32 {
        self.streak
    }

    /// Recompute the phase for `pos` and report the debounced result.
    pub fn update(&mut self, pos: &Position) -> GamePhase {
        let computed = classify_dynamic(pos);
        if computed == self.stable {
            self.candidate = computed;
            self.streak = 0;
            return self.stable;
        }

        if computed == self.candidate {
            self.streak += 1;
        } else {
            self.candidate = computed;
            self.streak = 1;
        }

        if self.streak >= PHASE_DEBOUNCE {
            self.stable = computed;
            self.streak = 0;
        }
        self.stable
    }

    /// Drop any pending candidate and restart from `Opening`.
    pub fn reset(&mut self) {
        *self = DynamicPhaseDetector::new();
    }
}

impl Default for DynamicPhaseDetector {
    fn default() -> Self {
        DynamicPhaseDetector::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pos(fen: &str) -> Position {
        fen.parse().expect("valid fen")
    }

    #[test]
    fn test_static_phase_startpos_is_middlegame() {
        // Total material never reaches the opening cutoff on this scale;
        // the middlegame branch catches the starting position.
        assert_eq!(static_phase(&Position::new()), GamePhase::Middlegame);
    }

    #[test]
    fn test_static_phase_bare_kings_endgame() {
        let pos = make_pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(static_phase(&pos), GamePhase::Endgame);
    }

    #[test]
    fn test_static_phase_open_heavy_position_middlegame() {
        // Queens and rooks on open lines push mobility over the cutoff
        let pos = make_pos("3qk3/8/8/8/8/8/8/R2QK2R w - - 0 1");
        assert_eq!(static_phase(&pos), GamePhase::Middlegame);
    }

    #[test]
    fn test_dynamic_phase_startpos_opening() {
        let mut detector = DynamicPhaseDetector::new();
        assert_eq!(detector.update(&Position::new()), GamePhase::Opening);
    }

    #[test]
    fn test_dynamic_phase_idempotent_on_unchanged_position() {
        let mut detector = DynamicPhaseDetector::new();
        let pos = Position::new();
        for _ in 0..10 {
            assert_eq!(detector.update(&pos), GamePhase::Opening);
            assert_eq!(detector.pending_streak(), 0);
        }
    }

    #[test]
    fn test_dynamic_phase_debounces_flips() {
        let mut detector = DynamicPhaseDetector::new();
        detector.update(&Position::new());

        // Bare-rook endgame: material 1000, below both cutoffs
        let endgame = make_pos("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        assert_eq!(detector.update(&endgame), GamePhase::Opening);
        assert_eq!(detector.update(&endgame), GamePhase::Opening);
        // Third consecutive computation commits the change
        assert_eq!(detector.update(&endgame), GamePhase::Endgame);
        assert_eq!(detector.current(), GamePhase::Endgame);
    }

    #[test]
    fn test_dynamic_phase_interrupted_streak_restarts() {
        let mut detector = DynamicPhaseDetector::new();
        let opening = Position::new();
        let endgame = make_pos("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");

        detector.update(&endgame);
        detector.update(&endgame);
        // Back to the stable phase clears the pending candidate
        assert_eq!(detector.update(&opening), GamePhase::Opening);
        assert_eq!(detector.update(&endgame), GamePhase::Opening);
        assert_eq!(detector.update(&endgame), GamePhase::Opening);
        assert_eq!(detector.update(&endgame), GamePhase::Endgame);
    }

    #[test]
    fn test_dynamic_middlegame_band() {
        let mut detector = DynamicPhaseDetector::new();
        // Two rooks, knight and queen: 2220, inside the middle band
        let pos = make_pos("4k3/8/8/8/8/8/8/RNRQK3 w - - 0 1");
        for _ in 0..PHASE_DEBOUNCE {
            detector.update(&pos);
        }
        assert_eq!(detector.current(), GamePhase::Middlegame);
    }
}
