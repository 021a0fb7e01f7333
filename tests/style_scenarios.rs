//! Style control loop scenarios through the public API.

use chess_eval::eval::{EvalContext, Style, StyleState, StyleWeights};
use chess_eval::{EvalOptions, Position};
use proptest::prelude::*;

fn enabled_context() -> EvalContext {
    EvalContext::new(EvalOptions {
        use_style: true,
        dynamic_style: true,
        ..EvalOptions::default()
    })
}

#[test]
fn unknown_style_name_falls_back_to_capablanca() {
    let mut ctx = enabled_context();
    let applied = ctx.set_style_by_name("Unknown");
    assert_eq!(applied, Style::Capablanca);
    let w = ctx.style_weights();
    assert_eq!((w.attack, w.defense, w.balance), (10, 15, 10));
}

#[test]
fn style_names_are_case_insensitive() {
    let mut ctx = enabled_context();
    assert_eq!(ctx.set_style_by_name("tal"), Style::Tal);
    assert_eq!(ctx.set_style_by_name("PETROSIAN"), Style::Petrosian);
}

#[test]
fn custom_blend_seventy_thirty_split() {
    // 70 Tal / 0 Capablanca / 30 Petrosian
    let mut ctx = enabled_context();
    ctx.set_custom_blend(70, 30, 0);
    let w = ctx.style_weights();
    assert_eq!(w.attack, 17);
    assert_eq!(w.defense, 11);
    assert_eq!(w.balance, 8);
}

#[test]
fn disabled_context_is_neutral_on_every_path() {
    let mut ctx = EvalContext::new(EvalOptions::default());
    ctx.set_style(Style::Tal);
    assert_eq!(ctx.style_weights(), StyleWeights::NEUTRAL);
    ctx.set_custom_blend(90, 5, 5);
    assert_eq!(ctx.style_weights(), StyleWeights::NEUTRAL);
    ctx.set_style_by_name("Petrosian");
    assert_eq!(ctx.style_weights(), StyleWeights::NEUTRAL);
}

fn in_band(value: i32, band: (i32, i32)) -> bool {
    value >= band.0 && value <= band.1
}

fn assert_state_invariants(state: &StyleState) {
    let (tal, petrosian, capablanca) = state.hysteresis();
    assert!(in_band(tal, (150, 500)), "tal hysteresis {tal}");
    assert!(in_band(petrosian, (100, 400)), "petrosian hysteresis {petrosian}");
    assert!(in_band(capablanca, (30, 200)), "capablanca hysteresis {capablanca}");

    let w = state.weights();
    assert!((0..=30).contains(&w.attack), "attack {}", w.attack);
    assert!((0..=30).contains(&w.defense), "defense {}", w.defense);
    assert!((0..=30).contains(&w.balance), "balance {}", w.balance);
}

proptest! {
    /// Any sequence of explicit sets, custom blends, penalty and
    /// recalibration steps keeps every weight and hysteresis value in
    /// its documented band.
    #[test]
    fn prop_bands_hold_under_arbitrary_updates(
        ops in prop::collection::vec((0u8..4, 0u32..200, 0u32..200, 0u32..200), 1..60),
        scores in prop::collection::vec(-1500i32..1500, 1..60)
    ) {
        let mut state = StyleState::new(true);
        let mut score_iter = scores.iter().cycle();
        for (op, a, b, c) in ops {
            match op {
                0 => state.set_style(match a % 3 {
                    0 => Style::Tal,
                    1 => Style::Capablanca,
                    _ => Style::Petrosian,
                }),
                1 => state.set_custom_blend(a, b, c),
                2 => state.apply_penalty_progression(),
                _ => {
                    let score = *score_iter.next().unwrap();
                    state.recalibrate_parameters(score, score / 2);
                }
            }
            assert_state_invariants(&state);
        }
    }

    /// The dynamic update path keeps the same invariants for arbitrary
    /// score and node sequences.
    #[test]
    fn prop_dynamic_updates_keep_bands(
        scores in prop::collection::vec(-2000i32..2000, 1..40)
    ) {
        let mut state = StyleState::new(true);
        let pos = Position::new();
        let mut nodes = 0u64;
        for score in scores {
            nodes += 1600;
            state.dynamic_update(&pos, score, 8_000, nodes, score / 3, true);
            assert_state_invariants(&state);
        }
    }
}
