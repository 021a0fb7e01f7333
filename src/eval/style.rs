//! Playing-style control loop.
//!
//! Maintains the blend between aggressive (Tal), balanced (Capablanca)
//! and defensive (Petrosian) evaluation weighting. Style changes are
//! resisted by per-style hysteresis values so the blend cannot
//! oscillate while the search keeps re-evaluating nearby positions.

use super::indicators::compute_positional_indicators;
use super::phase::GamePhase;
use crate::position::Position;

/// Named playing styles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Style {
    /// Aggressive, tactical
    Tal,
    /// Balanced, positional
    Capablanca,
    /// Defensive, strategic
    Petrosian,
}

impl Style {
    /// Parse a style name; unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Style> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tal" => Some(Style::Tal),
            "capablanca" => Some(Style::Capablanca),
            "petrosian" => Some(Style::Petrosian),
            _ => None,
        }
    }
}

/// The attack/defense/balance weight triple steering evaluation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StyleWeights {
    pub attack: i32,
    pub defense: i32,
    pub balance: i32,
}

impl StyleWeights {
    /// All-zero triple used while the style feature is disabled.
    pub const NEUTRAL: StyleWeights = StyleWeights {
        attack: 0,
        defense: 0,
        balance: 0,
    };

    /// Fixed triple assigned when a style is selected explicitly.
    #[must_use]
    pub const fn for_style(style: Style) -> StyleWeights {
        match style {
            Style::Tal => StyleWeights {
                attack: 25,
                defense: 5,
                balance: 0,
            },
            Style::Capablanca => StyleWeights {
                attack: 10,
                defense: 15,
                balance: 10,
            },
            Style::Petrosian => StyleWeights {
                attack: 0,
                defense: 5,
                balance: 25,
            },
        }
    }
}

/// Material/positional emphasis pair handed to the inference adapter
/// and the pipeline's sacrifice/symmetry/king-safety scaling.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StrategyWeights {
    pub material: i32,
    pub positional: i32,
}

impl StrategyWeights {
    pub const NEUTRAL: StrategyWeights = StrategyWeights {
        material: 15,
        positional: 15,
    };

    #[must_use]
    pub const fn for_style(style: Style) -> StrategyWeights {
        match style {
            Style::Tal => StrategyWeights {
                material: 25,
                positional: 10,
            },
            Style::Capablanca => StrategyWeights {
                material: 15,
                positional: 15,
            },
            Style::Petrosian => StrategyWeights {
                material: 10,
                positional: 25,
            },
        }
    }
}

/// Minimum score swing (centipawns) before a style re-evaluation runs.
const SCORE_TOLERANCE: i32 = 15;

/// Minimum searched nodes between style re-evaluations.
const MIN_NODES_BETWEEN_TRIGGERS: u64 = 1_500;

/// Minimum searched nodes between actual style changes.
const MIN_NODES_BETWEEN_CHANGES: u64 = 50;

/// Score delta below which hysteresis is left untouched.
const HYSTERESIS_THRESHOLD: i32 = 10;

const HYSTERESIS_INCREMENT: i32 = 10;
const HYSTERESIS_DECREMENT: i32 = 5;

const TAL_HYSTERESIS_BAND: (i32, i32) = (150, 500);
const PETROSIAN_HYSTERESIS_BAND: (i32, i32) = (100, 400);
const CAPABLANCA_HYSTERESIS_BAND: (i32, i32) = (30, 200);

/// Consecutive dominance cycles before a hysteresis nudge.
const DOMINANCE_LIMIT: u32 = 5;

/// Combined style weight ceiling.
const STYLE_SUM_CAP: i32 = 70;

/// Total material below which Tal is never selected.
const TAL_MATERIAL_FLOOR: i32 = 2_000;

/// Move horizon for the forced Capablanca reversion.
const REVERSION_MOVES: u32 = 50;

/// Mutable style state, owned by one evaluation context.
#[derive(Clone, Debug)]
pub struct StyleState {
    enabled: bool,
    weights: StyleWeights,
    strategy: StrategyWeights,
    active: Style,
    hysteresis_tal: i32,
    hysteresis_petrosian: i32,
    hysteresis_capablanca: i32,
    tal_count: u32,
    petrosian_count: u32,
    capablanca_count: u32,
    consecutive_tal: u32,
    consecutive_petrosian: u32,
    consecutive_capablanca: u32,
    move_counter: u32,
    last_score: i32,
    last_node_trigger: u64,
    last_change_nodes: u64,
}

impl StyleState {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        StyleState {
            enabled,
            weights: StyleWeights::NEUTRAL,
            strategy: StrategyWeights::NEUTRAL,
            active: Style::Capablanca,
            hysteresis_tal: 200,
            hysteresis_petrosian: 300,
            hysteresis_capablanca: 100,
            tal_count: 0,
            petrosian_count: 0,
            capablanca_count: 0,
            consecutive_tal: 0,
            consecutive_petrosian: 0,
            consecutive_capablanca: 0,
            move_counter: 0,
            last_score: 0,
            last_node_trigger: 0,
            last_change_nodes: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the style feature. Disabling resets the whole
    /// state to neutral.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.enabled = true;
        } else {
            *self = StyleState::new(false);
        }
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> StyleWeights {
        self.weights
    }

    #[inline]
    #[must_use]
    pub fn strategy(&self) -> StrategyWeights {
        self.strategy
    }

    #[inline]
    #[must_use]
    pub fn active_style(&self) -> Style {
        self.active
    }

    /// Current hysteresis values (Tal, Petrosian, Capablanca).
    #[inline]
    #[must_use]
    pub fn hysteresis(&self) -> (i32, i32, i32) {
        (
            self.hysteresis_tal,
            self.hysteresis_petrosian,
            self.hysteresis_capablanca,
        )
    }

    /// Lifetime style usage counters (Tal, Petrosian, Capablanca).
    #[inline]
    #[must_use]
    pub fn usage_counts(&self) -> (u32, u32, u32) {
        (self.tal_count, self.petrosian_count, self.capablanca_count)
    }

    fn apply_style(&mut self, style: Style) {
        self.weights = StyleWeights::for_style(style);
        self.strategy = StrategyWeights::for_style(style);
        self.active = style;
    }

    /// Select a style explicitly. Ignored (forced neutral) while the
    /// feature is disabled.
    pub fn set_style(&mut self, style: Style) {
        if !self.enabled {
            self.weights = StyleWeights::NEUTRAL;
            return;
        }
        self.apply_style(style);
    }

    /// Select a style by name, falling back to Capablanca for unknown
    /// names. Returns the style actually applied.
    pub fn set_style_by_name(&mut self, name: &str) -> Style {
        let style = Style::from_name(name).unwrap_or(Style::Capablanca);
        self.set_style(style);
        #[cfg(feature = "logging")]
        if Style::from_name(name).is_none() {
            log::debug!("unknown style {name:?}, falling back to Capablanca");
        }
        style
    }

    /// Blend the three styles from non-negative weights.
    ///
    /// Weights are normalized to ratios; an all-zero request falls back
    /// to plain Capablanca.
    pub fn set_custom_blend(&mut self, tal: u32, petrosian: u32, capablanca: u32) {
        if !self.enabled {
            return;
        }
        let total = tal + petrosian + capablanca;
        if total == 0 {
            self.apply_style(Style::Capablanca);
            return;
        }

        let tal_ratio = tal as f32 / total as f32;
        let petrosian_ratio = petrosian as f32 / total as f32;
        let capablanca_ratio = capablanca as f32 / total as f32;

        self.weights.attack =
            ((25.0 * tal_ratio + 10.0 * capablanca_ratio) as i32).clamp(0, 30);
        self.weights.defense = ((5.0 * tal_ratio
            + 15.0 * capablanca_ratio
            + 25.0 * petrosian_ratio) as i32)
            .clamp(0, 30);
        self.weights.balance = ((10.0 * tal_ratio
            + 10.0 * capablanca_ratio
            + 5.0 * petrosian_ratio) as i32)
            .clamp(0, 30);

        self.strategy.material = ((25.0 * tal_ratio
            + 15.0 * capablanca_ratio
            + 10.0 * petrosian_ratio) as i32)
            .clamp(5, 30);
        self.strategy.positional = ((10.0 * tal_ratio
            + 15.0 * capablanca_ratio
            + 25.0 * petrosian_ratio) as i32)
            .clamp(5, 30);
    }

    fn clamp_hysteresis(&mut self) {
        self.hysteresis_tal = self
            .hysteresis_tal
            .clamp(TAL_HYSTERESIS_BAND.0, TAL_HYSTERESIS_BAND.1);
        self.hysteresis_petrosian = self
            .hysteresis_petrosian
            .clamp(PETROSIAN_HYSTERESIS_BAND.0, PETROSIAN_HYSTERESIS_BAND.1);
        self.hysteresis_capablanca = self
            .hysteresis_capablanca
            .clamp(CAPABLANCA_HYSTERESIS_BAND.0, CAPABLANCA_HYSTERESIS_BAND.1);
    }

    /// One cycle of the dynamic style state machine.
    ///
    /// Four guards must pass before anything changes: the feature is
    /// enabled, the score moved by at least the tolerance, enough nodes
    /// elapsed since the last trigger, and enough since the last actual
    /// style change. Returns the new style when a change was committed.
    pub fn dynamic_update(
        &mut self,
        pos: &Position,
        score: i32,
        total_material: i32,
        nodes: u64,
        best_previous_score: i32,
        dynamic_enabled: bool,
    ) -> Option<Style> {
        if !self.enabled {
            return None;
        }
        if (score - self.last_score).abs() < SCORE_TOLERANCE {
            return None;
        }
        self.last_score = score;

        if nodes.saturating_sub(self.last_node_trigger) < MIN_NODES_BETWEEN_TRIGGERS {
            return None;
        }
        self.last_node_trigger = nodes;

        if !dynamic_enabled {
            return None;
        }

        let indicators = compute_positional_indicators(pos);
        let attack_base =
            (20 + indicators.center_control - indicators.king_safety / 4).clamp(15, 28);
        let defense_base =
            (10 - indicators.center_control + indicators.king_safety / 3).clamp(5, 15);
        let balance_base = (25 + indicators.center_control / 3
            - indicators.material_imbalance / 6)
            .clamp(20, 30);

        self.weights.attack = attack_base;
        self.weights.defense = defense_base;
        self.weights.balance = balance_base;

        if self.weights.attack + self.weights.defense + self.weights.balance > STYLE_SUM_CAP {
            self.weights.attack = self.weights.attack.clamp(15, 25);
            self.weights.defense = self.weights.defense.clamp(5, 20);
            self.weights.balance =
                (STYLE_SUM_CAP - self.weights.attack - self.weights.defense).clamp(0, 30);
        }

        if nodes.saturating_sub(self.last_change_nodes) < MIN_NODES_BETWEEN_CHANGES {
            return None;
        }

        let delta = (score - best_previous_score).abs();
        if delta < HYSTERESIS_THRESHOLD {
            return None;
        }

        self.hysteresis_tal += if delta > 50 {
            HYSTERESIS_INCREMENT
        } else {
            -HYSTERESIS_DECREMENT
        };
        self.hysteresis_petrosian += if delta < 20 {
            HYSTERESIS_INCREMENT
        } else {
            -HYSTERESIS_DECREMENT
        };
        self.hysteresis_capablanca += if delta < 30 {
            HYSTERESIS_INCREMENT
        } else {
            -HYSTERESIS_DECREMENT
        };
        self.clamp_hysteresis();

        let attack_threshold = self.hysteresis_tal as f32 * 1.2 + self.weights.attack as f32;
        let defense_threshold =
            self.hysteresis_petrosian as f32 * 1.2 + self.weights.defense as f32;
        let balance_threshold =
            self.hysteresis_capablanca as f32 * 1.2 + self.weights.balance as f32;

        let mut new_style = self.active;
        if total_material > TAL_MATERIAL_FLOOR && score as f32 > attack_threshold {
            new_style = Style::Tal;
            self.tal_count += 1;
        } else if (score as f32) < -defense_threshold {
            new_style = Style::Petrosian;
            self.petrosian_count += 1;
        } else if (score.abs() as f32) < balance_threshold {
            new_style = Style::Capablanca;
            self.capablanca_count += 1;
        }

        let changed = new_style != self.active;
        if changed {
            self.apply_style(new_style);
            self.last_change_nodes = nodes;
            #[cfg(feature = "logging")]
            log::debug!("style change to {new_style:?} at {nodes} nodes");
        }

        self.apply_penalty_progression();
        self.recalibrate_parameters(score, best_previous_score);

        self.move_counter += 1;
        if self.move_counter > REVERSION_MOVES && new_style == Style::Capablanca {
            self.move_counter = 0;
        }

        changed.then_some(new_style)
    }

    /// Track consecutive dominance of one style and nudge hysteresis
    /// further when it persists past the limit.
    pub fn apply_penalty_progression(&mut self) {
        if self.weights.attack > 10 {
            self.consecutive_tal += 1;
            self.consecutive_petrosian = 0;
            self.consecutive_capablanca = 0;
        } else if self.weights.defense > 10 {
            self.consecutive_petrosian += 1;
            self.consecutive_tal = 0;
            self.consecutive_capablanca = 0;
        } else {
            self.consecutive_capablanca += 1;
            self.consecutive_tal = 0;
            self.consecutive_petrosian = 0;
        }

        if self.consecutive_tal > DOMINANCE_LIMIT {
            self.hysteresis_tal += 10;
            self.hysteresis_petrosian -= 5;
            self.hysteresis_capablanca -= 5;
            self.consecutive_tal = 0;
        }
        if self.consecutive_petrosian > DOMINANCE_LIMIT {
            self.hysteresis_petrosian += 10;
            self.hysteresis_tal -= 5;
            self.hysteresis_capablanca -= 5;
            self.consecutive_petrosian = 0;
        }
        if self.consecutive_capablanca > DOMINANCE_LIMIT {
            self.hysteresis_capablanca -= 10;
            self.hysteresis_tal += 5;
            self.hysteresis_petrosian += 5;
            self.consecutive_capablanca = 0;
        }
        self.clamp_hysteresis();
    }

    /// Recalibrate hysteresis from lifetime usage ratios and the score
    /// delta, and force a Capablanca reversion after prolonged under-use.
    pub fn recalibrate_parameters(&mut self, score: i32, best_previous_score: i32) {
        if !self.enabled {
            return;
        }
        let total = self.tal_count + self.petrosian_count + self.capablanca_count;
        if total == 0 {
            return;
        }

        let tal_ratio = self.tal_count as f32 / total as f32;
        let petrosian_ratio = self.petrosian_count as f32 / total as f32;
        let capablanca_ratio = self.capablanca_count as f32 / total as f32;

        let delta = (best_previous_score - score).abs();
        if delta > self.hysteresis_tal / 2 {
            self.hysteresis_tal += 10;
        }
        if delta < self.hysteresis_capablanca / 3 {
            self.hysteresis_capablanca -= 5;
        }

        if tal_ratio > 0.5 {
            self.hysteresis_tal += 100;
            self.hysteresis_capablanca -= 40;
            self.hysteresis_petrosian -= 20;
        }
        if petrosian_ratio > 0.5 {
            self.hysteresis_petrosian += 10;
            self.hysteresis_tal -= 5;
            self.hysteresis_capablanca -= 5;
        }
        if capablanca_ratio < 0.2 {
            self.hysteresis_capablanca -= 50;
            self.hysteresis_tal += 30;
        }
        self.clamp_hysteresis();

        self.move_counter += 1;
        if self.move_counter > REVERSION_MOVES && self.capablanca_count < total / 3 {
            self.apply_style(Style::Capablanca);
            self.move_counter = 0;
        }
    }
}

/// Phase- and indicator-driven adjustment of the configured blend
/// weights, normalized so the total stays at 100.
#[must_use]
pub fn dynamic_blend_weights(
    pos: &Position,
    phase: GamePhase,
    base: (u32, u32, u32),
) -> (u32, u32, u32) {
    let indicators = compute_positional_indicators(pos);
    let mut tal = base.0 as i32 + indicators.king_safety / 2;
    let mut petrosian = base.1 as i32 + indicators.flank_control / 2;
    let mut capablanca = base.2 as i32 + indicators.center_control / 2;

    match phase {
        GamePhase::Opening => capablanca += 5,
        GamePhase::Middlegame => tal += 5,
        GamePhase::Endgame => petrosian += 5,
    }

    let total = tal + petrosian + capablanca;
    if total > 0 {
        tal = tal * 100 / total;
        petrosian = petrosian * 100 / total;
        capablanca = capablanca * 100 / total;
    }
    (
        tal.max(0) as u32,
        petrosian.max(0) as u32,
        capablanca.max(0) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_state() -> StyleState {
        StyleState::new(true)
    }

    #[test]
    fn test_fixed_triples() {
        let mut state = enabled_state();
        state.set_style(Style::Tal);
        assert_eq!(
            state.weights(),
            StyleWeights {
                attack: 25,
                defense: 5,
                balance: 0
            }
        );
        state.set_style(Style::Petrosian);
        assert_eq!(
            state.weights(),
            StyleWeights {
                attack: 0,
                defense: 5,
                balance: 25
            }
        );
    }

    #[test]
    fn test_unknown_name_falls_back_to_capablanca() {
        let mut state = enabled_state();
        let applied = state.set_style_by_name("Unknown");
        assert_eq!(applied, Style::Capablanca);
        assert_eq!(
            state.weights(),
            StyleWeights {
                attack: 10,
                defense: 15,
                balance: 10
            }
        );
    }

    #[test]
    fn test_disabled_state_stays_neutral() {
        let mut state = StyleState::new(false);
        state.set_style(Style::Tal);
        assert_eq!(state.weights(), StyleWeights::NEUTRAL);
        state.set_custom_blend(100, 0, 0);
        assert_eq!(state.weights(), StyleWeights::NEUTRAL);
    }

    #[test]
    fn test_disabling_resets_state() {
        let mut state = enabled_state();
        state.set_style(Style::Tal);
        state.set_enabled(false);
        assert_eq!(state.weights(), StyleWeights::NEUTRAL);
        assert_eq!(state.hysteresis(), (200, 300, 100));
        assert_eq!(state.usage_counts(), (0, 0, 0));
    }

    #[test]
    fn test_custom_blend_seventy_thirty_split() {
        // 70% Tal, 30% Petrosian, no Capablanca
        let mut state = enabled_state();
        state.set_custom_blend(70, 30, 0);
        let w = state.weights();
        assert_eq!(w.attack, 17);
        assert_eq!(w.defense, 11);
        assert_eq!(w.balance, 8);
    }

    #[test]
    fn test_custom_blend_zero_falls_back() {
        let mut state = enabled_state();
        state.set_custom_blend(0, 0, 0);
        assert_eq!(state.weights(), StyleWeights::for_style(Style::Capablanca));
    }

    #[test]
    fn test_custom_blend_clamps() {
        let mut state = enabled_state();
        for (tal, petrosian, capablanca) in
            [(100, 0, 0), (0, 100, 0), (0, 0, 100), (33, 33, 34), (1, 2, 3)]
        {
            state.set_custom_blend(tal, petrosian, capablanca);
            let w = state.weights();
            assert!((0..=30).contains(&w.attack));
            assert!((0..=30).contains(&w.defense));
            assert!((0..=30).contains(&w.balance));
            let s = state.strategy();
            assert!((5..=30).contains(&s.material));
            assert!((5..=30).contains(&s.positional));
        }
    }

    fn assert_hysteresis_in_bands(state: &StyleState) {
        let (tal, petrosian, capablanca) = state.hysteresis();
        assert!((150..=500).contains(&tal), "tal={tal}");
        assert!((100..=400).contains(&petrosian), "petrosian={petrosian}");
        assert!((30..=200).contains(&capablanca), "capablanca={capablanca}");
    }

    #[test]
    fn test_penalty_progression_keeps_bands() {
        let mut state = enabled_state();
        state.set_style(Style::Tal);
        for _ in 0..100 {
            state.apply_penalty_progression();
            assert_hysteresis_in_bands(&state);
        }
    }

    #[test]
    fn test_recalibrate_keeps_bands() {
        let mut state = enabled_state();
        state.tal_count = 30;
        state.petrosian_count = 2;
        state.capablanca_count = 1;
        for i in 0..200 {
            state.recalibrate_parameters(i * 7 % 400 - 200, 50);
            assert_hysteresis_in_bands(&state);
        }
    }

    #[test]
    fn test_recalibrate_forces_capablanca_reversion() {
        let mut state = enabled_state();
        state.set_style(Style::Tal);
        state.tal_count = 40;
        state.petrosian_count = 20;
        state.capablanca_count = 1;
        state.move_counter = REVERSION_MOVES + 1;
        state.recalibrate_parameters(0, 0);
        assert_eq!(state.active_style(), Style::Capablanca);
        assert_eq!(state.move_counter, 0);
    }

    #[test]
    fn test_dynamic_update_guards() {
        let mut state = enabled_state();
        let pos = Position::new();

        // Guard: score change below tolerance
        assert_eq!(state.dynamic_update(&pos, 5, 8000, 10_000, 0, true), None);
        assert_eq!(state.last_node_trigger, 0);

        // Guard: not enough nodes since last trigger
        assert_eq!(state.dynamic_update(&pos, 100, 8000, 100, 0, true), None);
        assert_eq!(state.last_node_trigger, 0);

        // Passing score + node guards but with dynamic adjustment off
        assert_eq!(state.dynamic_update(&pos, 200, 8000, 10_000, 0, false), None);
        assert_eq!(state.last_node_trigger, 10_000);
    }

    #[test]
    fn test_dynamic_update_selects_tal_on_big_lead() {
        let mut state = enabled_state();
        let pos = Position::new();
        // Large positive score above any attack threshold
        let changed = state.dynamic_update(&pos, 900, 8000, 10_000, 0, true);
        assert_eq!(changed, Some(Style::Tal));
        assert_eq!(state.active_style(), Style::Tal);
        assert_eq!(state.usage_counts().0, 1);
        assert_hysteresis_in_bands(&state);
    }

    #[test]
    fn test_dynamic_update_selects_petrosian_when_losing() {
        let mut state = enabled_state();
        let pos = Position::new();
        let changed = state.dynamic_update(&pos, -900, 8000, 10_000, 0, true);
        assert_eq!(changed, Some(Style::Petrosian));
    }

    #[test]
    fn test_dynamic_update_respects_change_interval() {
        let mut state = enabled_state();
        let pos = Position::new();
        assert_eq!(
            state.dynamic_update(&pos, 900, 8000, 10_000, 0, true),
            Some(Style::Tal)
        );
        // Second call 1500+ nodes later but within 50 nodes of the
        // change would be blocked by the change-interval guard; use a
        // score below tolerance first to show nothing fires either way.
        assert_eq!(state.dynamic_update(&pos, 905, 8000, 12_000, 0, true), None);
    }

    #[test]
    fn test_dynamic_blend_weights_normalized() {
        let pos = Position::new();
        let (tal, petrosian, capablanca) =
            dynamic_blend_weights(&pos, GamePhase::Middlegame, (20, 20, 20));
        let total = tal + petrosian + capablanca;
        assert!(total <= 100, "total={total}");
        assert!(tal > 0);
    }

    #[test]
    fn test_dynamic_blend_weights_phase_bias() {
        let pos = Position::new();
        let mid = dynamic_blend_weights(&pos, GamePhase::Middlegame, (20, 20, 20));
        let end = dynamic_blend_weights(&pos, GamePhase::Endgame, (20, 20, 20));
        // The endgame bump favors Petrosian relative to the middlegame
        assert!(end.1 >= mid.1);
    }
}
