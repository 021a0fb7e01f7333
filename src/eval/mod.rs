//! Position evaluation.
//!
//! Two entry points exist and are not interchangeable:
//!
//! * [`evaluate`] — the full evaluation: runs the dynamic style loop,
//!   adds the style-weighted indicator bonuses on top of the network
//!   value and then applies the blend & adjustment pipeline.
//! * [`evaluate_network`] — the adjusted-network-only value: the same
//!   pipeline without the style accumulation step.
//!
//! Both return a centipawn score from the side to move's perspective,
//! strictly inside the reserved tablebase bands. The host feeds the
//! searched node count into [`evaluate`]; the style loop uses it to
//! pace its updates. [`EvalContext::refresh_blend`] is meant to be
//! called per root position, not per node.

mod blend;
mod context;
mod indicators;
mod phase;
mod style;

pub use blend::{
    blend_with_simple, dampened_shuffling, PSQT_ONLY_THRESHOLD, SMALL_NET_THRESHOLD,
    TB_LOSS_IN_MAX_PLY, TB_WIN_IN_MAX_PLY, VALUE_MATE,
};
pub use context::{shared_context, EvalContext, SharedEvalContext};
pub use indicators::{
    compute_aggressivity, compute_defense, compute_position, compute_positional_indicators,
    PositionalIndicators,
};
pub use phase::{static_phase, DynamicPhaseDetector, GamePhase, PHASE_DEBOUNCE};
pub use style::{
    dynamic_blend_weights, StrategyWeights, Style, StyleState, StyleWeights,
};

use crate::nnue::{combine_simple, NetSize, NetworkStore};
use crate::position::{Color, Piece, Position, PAWN_VALUE};

/// Static, purely materialistic evaluation from `color`'s point of
/// view. Dividing by the pawn value approximates the advantage in
/// pawns.
#[must_use]
pub fn simple_eval(pos: &Position, color: Color) -> i32 {
    PAWN_VALUE * (pos.count(color, Piece::Pawn) - pos.count(color.opponent(), Piece::Pawn))
        + pos.non_pawn_material(color)
        - pos.non_pawn_material(color.opponent())
}

/// Full evaluation of `pos` from the side to move's perspective.
///
/// `nodes` is the host search's total node count, used to pace the
/// dynamic style loop.
#[must_use]
pub fn evaluate(store: &NetworkStore, pos: &Position, ctx: &mut EvalContext, nodes: u64) -> i32 {
    let us = pos.side_to_move();
    let raw_score = store
        .infer(pos, NetSize::Big, false, false)
        .map(|raw| combine_simple(&raw))
        .unwrap_or_else(|| simple_eval(pos, us));

    let total_material = pos.material_total();
    let use_style = ctx.options().use_style;
    let dynamic_style = ctx.options().dynamic_style;
    if use_style {
        let best_previous = ctx.best_previous_score;
        ctx.style.dynamic_update(
            pos,
            raw_score,
            total_material,
            nodes,
            best_previous,
            dynamic_style,
        );
    }

    let weights = ctx.style.weights();
    let style_bonus = weights.attack * compute_aggressivity(pos)
        + weights.balance * compute_position(pos)
        + weights.defense * compute_defense(pos);

    blend::adjusted_eval(store, pos, ctx, style_bonus)
}

/// Adjusted-network-only evaluation: the blend & adjustment pipeline
/// without the style accumulation step and without touching the style
/// loop.
#[must_use]
pub fn evaluate_network(store: &NetworkStore, pos: &Position, ctx: &EvalContext) -> i32 {
    blend::adjusted_eval(store, pos, ctx, 0)
}
