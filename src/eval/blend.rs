//! Blend & adjustment pipeline turning raw network output into the
//! final bounded score.

use super::context::EvalContext;
use super::simple_eval;
use crate::nnue::{combine_adjusted, NetSize, NetworkStore};
use crate::position::{Piece, Position};

/// Absolute simple-eval above which the small network takes over.
pub const SMALL_NET_THRESHOLD: i32 = 1165;

/// Absolute simple-eval above which layer propagation is skipped.
pub const PSQT_ONLY_THRESHOLD: i32 = 2500;

pub const VALUE_MATE: i32 = 32_000;
pub const MAX_PLY: i32 = 246;

const VALUE_TB: i32 = VALUE_MATE - MAX_PLY - 1;

/// Lower edge of the reserved forced-win score band.
pub const TB_WIN_IN_MAX_PLY: i32 = VALUE_TB - MAX_PLY;

/// Upper edge of the reserved forced-loss score band.
pub const TB_LOSS_IN_MAX_PLY: i32 = -TB_WIN_IN_MAX_PLY;

/// Damping constants for one network-size regime.
struct AdjustParams {
    opt_div: i64,
    nnue_div: i64,
    pawn_count_constant: i64,
    pawn_count_mul: i64,
    npm_constant: i64,
    eval_div: i64,
    shuffling_constant: i64,
    shuffling_div: i64,
}

const FULL_NET: AdjustParams = AdjustParams {
    opt_div: 513,
    nnue_div: 32395,
    pawn_count_constant: 919,
    pawn_count_mul: 11,
    npm_constant: 145,
    eval_div: 1036,
    shuffling_constant: 178,
    shuffling_div: 204,
};

const PSQT_ONLY_NET: AdjustParams = AdjustParams {
    opt_div: 517,
    nnue_div: 32857,
    pawn_count_constant: 908,
    pawn_count_mul: 7,
    npm_constant: 155,
    eval_div: 1019,
    shuffling_constant: 224,
    shuffling_div: 238,
};

const SMALL_NET: AdjustParams = AdjustParams {
    opt_div: 499,
    nnue_div: 32793,
    pawn_count_constant: 903,
    pawn_count_mul: 9,
    npm_constant: 147,
    eval_div: 1067,
    shuffling_constant: 208,
    shuffling_div: 211,
};

/// Logarithmically compress the 50-move counter once it passes 20.
#[must_use]
pub fn dampened_shuffling(shuffling: i32) -> i32 {
    if shuffling < 20 {
        shuffling
    } else {
        (15.0 * (f64::from(shuffling) + 1.0).log2()) as i32
    }
}

/// Confidence-weighted blend of a network value with the simple
/// material evaluation. High complexity or a large imbalance shifts
/// weight toward the simple term; the network never drops below half.
#[must_use]
pub fn blend_with_simple(nnue: i32, simple: i32, complexity: i32, material_imbalance: i32) -> i32 {
    let complexity_factor = (complexity / 2).min(50);
    let imbalance_factor = if material_imbalance.abs() > 200 { 10 } else { 0 };
    let weight = (100 - complexity_factor - imbalance_factor).clamp(50, 100);
    (nnue * weight + simple * (100 - weight)) / 100
}

/// Synthetic inputs for the damping and combination steps. Split out so
/// the numeric core is testable without a loaded network.
pub(crate) struct PipelineInputs {
    pub nnue: i32,
    pub optimism: i32,
    pub simple: i32,
    pub complexity: i32,
    pub npm: i32,
    pub pawn_count: i32,
    pub shuffling: i32,
}

enum Regime {
    Full,
    PsqtOnly,
    Small,
}

fn regime_params(regime: &Regime) -> &'static AdjustParams {
    match regime {
        Regime::Full => &FULL_NET,
        Regime::PsqtOnly => &PSQT_ONLY_NET,
        Regime::Small => &SMALL_NET,
    }
}

/// Damp, combine and bound the pipeline inputs. Arithmetic runs in i64
/// so synthetic extremes cannot wrap before the clamp.
fn run_adjustment(inputs: &PipelineInputs, regime: &Regime) -> i32 {
    let params = regime_params(regime);

    let mut nnue = i64::from(inputs.nnue);
    let mut optimism = i64::from(inputs.optimism);
    let disagreement = i64::from(inputs.complexity) + (i64::from(inputs.simple) - nnue).abs();

    optimism += optimism * disagreement / params.opt_div;
    nnue -= nnue * disagreement / params.nnue_div;

    let npm = i64::from(inputs.npm);
    let mut v = (nnue
        * (npm + params.pawn_count_constant + params.pawn_count_mul * i64::from(inputs.pawn_count))
        + optimism * (params.npm_constant + npm))
        / params.eval_div;

    v = v * (params.shuffling_constant - i64::from(inputs.shuffling)) / params.shuffling_div;

    v.clamp(
        i64::from(TB_LOSS_IN_MAX_PLY) + 1,
        i64::from(TB_WIN_IN_MAX_PLY) - 1,
    ) as i32
}

/// The full blend & adjustment pipeline.
///
/// `style_bonus` is the top-level style accumulation added by the full
/// evaluation entry point; the network-only entry passes zero.
pub(crate) fn adjusted_eval(
    store: &NetworkStore,
    pos: &Position,
    ctx: &EvalContext,
    style_bonus: i32,
) -> i32 {
    let us = pos.side_to_move();
    let simple = simple_eval(pos, us);

    let small_net = simple.abs() > SMALL_NET_THRESHOLD;
    let psqt_only = simple.abs() > PSQT_ONLY_THRESHOLD;
    let raw = if small_net {
        store.infer(pos, NetSize::Small, true, psqt_only)
    } else {
        store.infer(pos, NetSize::Big, true, false)
    };
    // Verification guarantees a loaded net before search; a bare store
    // degrades to the material evaluation instead of panicking.
    let Some(raw) = raw else {
        return clamp_score(simple + style_bonus);
    };

    let strategy = ctx.style.strategy();
    let mut nnue = combine_adjusted(&raw, ctx.material_weight(), ctx.positional_weight());
    nnue += style_bonus;

    if pos.is_sacrifice() {
        nnue += 30 * strategy.material / 100;
    }
    if pos.is_symmetric() {
        nnue -= 20 * strategy.positional / 100;
    }

    let regime = if !small_net {
        Regime::Full
    } else if psqt_only {
        Regime::PsqtOnly
    } else {
        Regime::Small
    };

    let inputs = PipelineInputs {
        nnue,
        optimism: ctx.optimism[us.index()],
        simple,
        complexity: raw.complexity,
        npm: pos.non_pawn_material_total() / 64,
        pawn_count: pos.count_both(Piece::Pawn),
        shuffling: dampened_shuffling(pos.rule50_count() as i32),
    };

    let v = run_adjustment(&inputs, &regime);

    // King-safety penalty scaled by the positional emphasis; re-bound
    // so the result can never reach the reserved band.
    clamp_score(v - pos.king_safety_score(us) * strategy.positional / 100)
}

#[inline]
fn clamp_score(v: i32) -> i32 {
    v.clamp(TB_LOSS_IN_MAX_PLY + 1, TB_WIN_IN_MAX_PLY - 1)
}

/// Pick the regime the way `adjusted_eval` does, exposed for tests.
#[cfg(test)]
fn regime_for(simple: i32) -> Regime {
    let small_net = simple.abs() > SMALL_NET_THRESHOLD;
    let psqt_only = simple.abs() > PSQT_ONLY_THRESHOLD;
    if !small_net {
        Regime::Full
    } else if psqt_only {
        Regime::PsqtOnly
    } else {
        Regime::Small
    }
}
