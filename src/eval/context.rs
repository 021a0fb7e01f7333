//! Per-session evaluation context.
//!
//! All mutable style and phase state lives here, owned by the search
//! coordinator and passed into the evaluation entry points rather than
//! sitting in process-wide globals. One context exists per concurrent
//! search session; sharing across worker threads goes through
//! [`SharedEvalContext`].

use std::sync::Arc;

use parking_lot::Mutex;

use super::phase::{DynamicPhaseDetector, GamePhase};
use super::style::{dynamic_blend_weights, Style, StyleState, StyleWeights};
use crate::config::EvalOptions;
use crate::position::Position;

/// Evaluation state for one search session.
#[derive(Clone, Debug)]
pub struct EvalContext {
    options: EvalOptions,
    pub(crate) style: StyleState,
    phase: DynamicPhaseDetector,
    /// Per-side optimism fed into the blend pipeline (white, black)
    pub optimism: [i32; 2],
    /// Best score of the previous search iteration
    pub best_previous_score: i32,
}

impl EvalContext {
    #[must_use]
    pub fn new(options: EvalOptions) -> Self {
        let mut style = StyleState::new(options.use_style);
        if options.use_style {
            style.set_custom_blend(
                options.tal_weight,
                options.petrosian_weight,
                options.capablanca_weight,
            );
        }
        EvalContext {
            options,
            style,
            phase: DynamicPhaseDetector::new(),
            optimism: [0, 0],
            best_previous_score: 0,
        }
    }

    #[must_use]
    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Replace the options and re-derive the style state from them.
    pub fn set_options(&mut self, options: EvalOptions) {
        self.style.set_enabled(options.use_style);
        if options.use_style {
            self.style.set_custom_blend(
                options.tal_weight,
                options.petrosian_weight,
                options.capablanca_weight,
            );
        }
        self.options = options;
    }

    #[must_use]
    pub fn style(&self) -> &StyleState {
        &self.style
    }

    /// Select a style by name; unknown names fall back to Capablanca.
    pub fn set_style_by_name(&mut self, name: &str) -> Style {
        self.style.set_style_by_name(name)
    }

    /// Select a style explicitly.
    pub fn set_style(&mut self, style: Style) {
        self.style.set_style(style);
    }

    /// Request a custom blend of the three styles.
    pub fn set_custom_blend(&mut self, tal: u32, petrosian: u32, capablanca: u32) {
        self.style.set_custom_blend(tal, petrosian, capablanca);
    }

    /// Advance the debounced phase detector for `pos`.
    pub fn dynamic_phase(&mut self, pos: &Position) -> GamePhase {
        self.phase.update(pos)
    }

    /// Re-derive the blend weights from the configured base weights,
    /// the debounced phase and the position's indicators. Called on
    /// root-position changes rather than per node.
    pub fn refresh_blend(&mut self, pos: &Position) {
        if !self.options.use_style {
            return;
        }
        let base = (
            self.options.tal_weight,
            self.options.petrosian_weight,
            self.options.capablanca_weight,
        );
        if self.options.dynamic_style {
            let phase = self.phase.update(pos);
            let (tal, petrosian, capablanca) = dynamic_blend_weights(pos, phase, base);
            self.style.set_custom_blend(tal, petrosian, capablanca);
        } else {
            self.style.set_custom_blend(base.0, base.1, base.2);
        }
    }

    /// Current style weight triple.
    #[must_use]
    pub fn style_weights(&self) -> StyleWeights {
        self.style.weights()
    }

    /// Material emphasis for the adjusted network blend: the
    /// style-linked weight plus the configured manual override.
    #[must_use]
    pub(crate) fn material_weight(&self) -> i32 {
        self.style.strategy().material + self.options.material_bias()
    }

    /// Positional emphasis for the adjusted network blend.
    #[must_use]
    pub(crate) fn positional_weight(&self) -> i32 {
        self.style.strategy().positional + self.options.positional_bias()
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        EvalContext::new(EvalOptions::default())
    }
}

/// Context shared between search worker threads. The style loop
/// tolerates lost updates, but the mutex keeps the multi-word state
/// free of data races.
pub type SharedEvalContext = Arc<Mutex<EvalContext>>;

/// Wrap a context for sharing across threads.
#[must_use]
pub fn shared_context(ctx: EvalContext) -> SharedEvalContext {
    Arc::new(Mutex::new(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_disabled_is_neutral() {
        let ctx = EvalContext::default();
        assert!(!ctx.style().is_enabled());
        assert_eq!(ctx.style_weights(), StyleWeights::NEUTRAL);
    }

    #[test]
    fn test_new_enabled_applies_blend() {
        let options = EvalOptions {
            use_style: true,
            ..EvalOptions::default()
        };
        let ctx = EvalContext::new(options);
        assert!(ctx.style().is_enabled());
        assert_ne!(ctx.style_weights(), StyleWeights::NEUTRAL);
    }

    #[test]
    fn test_set_options_disabling_resets() {
        let options = EvalOptions {
            use_style: true,
            ..EvalOptions::default()
        };
        let mut ctx = EvalContext::new(options);
        ctx.set_style(Style::Tal);
        ctx.set_options(EvalOptions::default());
        assert_eq!(ctx.style_weights(), StyleWeights::NEUTRAL);
    }

    #[test]
    fn test_manual_bias_feeds_weights() {
        let options = EvalOptions {
            manual_weights: true,
            materialistic: 6,
            positional: -2,
            ..EvalOptions::default()
        };
        let ctx = EvalContext::new(options);
        // Neutral strategy (15) plus 10x manual override
        assert_eq!(ctx.material_weight(), 15 + 60);
        assert_eq!(ctx.positional_weight(), 15 - 20);
    }

    #[test]
    fn test_refresh_blend_static_uses_configured_weights() {
        let options = EvalOptions {
            use_style: true,
            tal_weight: 100,
            petrosian_weight: 0,
            capablanca_weight: 0,
            ..EvalOptions::default()
        };
        let mut ctx = EvalContext::new(options);
        ctx.refresh_blend(&Position::new());
        // Pure Tal blend: attack 25, defense 5, balance 10
        assert_eq!(ctx.style_weights().attack, 25);
    }

    #[test]
    fn test_shared_context_roundtrip() {
        let shared = shared_context(EvalContext::default());
        {
            let mut guard = shared.lock();
            guard.optimism = [11, -11];
        }
        assert_eq!(shared.lock().optimism, [11, -11]);
    }
}
