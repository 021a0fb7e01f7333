//! End-to-end evaluation scenarios through the public API.

use chess_eval::eval::{
    static_phase, DynamicPhaseDetector, GamePhase, TB_LOSS_IN_MAX_PLY, TB_WIN_IN_MAX_PLY,
};
use chess_eval::position::PAWN_VALUE;
use chess_eval::{
    evaluate, evaluate_network, simple_eval, Color, EvalContext, EvalOptionAction, EvalOptions,
    NetSize, NetworkStore, Position,
};

fn make_pos(fen: &str) -> Position {
    fen.parse().expect("valid fen")
}

#[test]
fn simple_eval_zero_without_nonpawn_material() {
    let pos = make_pos("4k3/pppppppp/8/8/8/8/PPPPPPPP/4K3 w - - 0 1");
    assert_eq!(simple_eval(&pos, pos.side_to_move()), 0);
}

#[test]
fn simple_eval_counts_pawn_difference() {
    let pos = make_pos("4k3/pp6/8/8/8/8/PPP5/4K3 w - - 0 1");
    assert_eq!(simple_eval(&pos, Color::White), PAWN_VALUE);
}

#[test]
fn dynamic_phase_is_idempotent_for_stable_position() {
    let mut detector = DynamicPhaseDetector::new();
    let pos = Position::new();
    let first = detector.update(&pos);
    for _ in 0..20 {
        assert_eq!(detector.update(&pos), first);
        assert_eq!(detector.pending_streak(), 0);
    }
}

#[test]
fn dynamic_phase_commits_after_debounce() {
    let mut detector = DynamicPhaseDetector::new();
    detector.update(&Position::new());
    let endgame = make_pos("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
    assert_eq!(detector.update(&endgame), GamePhase::Opening);
    assert_eq!(detector.update(&endgame), GamePhase::Opening);
    assert_eq!(detector.update(&endgame), GamePhase::Endgame);
}

#[test]
fn static_and_dynamic_detectors_disagree_by_design() {
    // A queen-and-rooks position: middlegame statically, opening for
    // the material-only dynamic detector.
    let pos = make_pos("r2qk2r/8/8/8/8/8/8/R2QK2R w - - 0 1");
    assert_eq!(static_phase(&pos), GamePhase::Middlegame);
    let mut detector = DynamicPhaseDetector::new();
    assert_eq!(detector.update(&pos), GamePhase::Opening);
}

#[test]
fn evaluation_is_always_outside_tb_band() {
    let store = NetworkStore::new();
    let mut ctx = EvalContext::default();
    let fens = [
        "4k3/8/8/8/8/QQQQQ3/QQQQQQQQ/4K3 w - - 0 1",
        "4k3/qqqqqqqq/qqqqq3/8/8/8/8/4K3 w - - 0 1",
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
    ];
    for fen in fens {
        let pos = make_pos(fen);
        let v = evaluate(&store, &pos, &mut ctx, 0);
        assert!(v > TB_LOSS_IN_MAX_PLY && v < TB_WIN_IN_MAX_PLY, "{fen}: {v}");
        let v = evaluate_network(&store, &pos, &ctx);
        assert!(v > TB_LOSS_IN_MAX_PLY && v < TB_WIN_IN_MAX_PLY, "{fen}: {v}");
    }
}

#[test]
fn fallback_eval_ignores_shuffling_counter() {
    // Shuffling damping belongs to the network pipeline; the material
    // fallback used without a loaded net must not depend on the clock.
    let store = NetworkStore::new();
    let ctx = EvalContext::default();
    let fresh = make_pos("4k3/8/8/8/8/8/R7/4K3 w - - 0 1");
    let stale = make_pos("4k3/8/8/8/8/8/R7/4K3 w - - 40 90");
    assert_eq!(
        evaluate_network(&store, &fresh, &ctx),
        evaluate_network(&store, &stale, &ctx)
    );
}

#[test]
fn verify_reports_missing_network() {
    let store = NetworkStore::new();
    let options = EvalOptions::default();
    let err = store.verify(&options).expect_err("nothing loaded");
    assert_eq!(err.net, NetSize::Big);
    let text = err.to_string();
    assert!(text.contains("was not loaded successfully"));
    assert!(text.contains("terminated"));
}

#[test]
fn option_changes_request_network_reload() {
    let mut options = EvalOptions::default();
    assert_eq!(
        options.apply_setoption("EvalFileSmall", Some("nn-123456789abc.nnue")),
        Some(EvalOptionAction::ReloadNetworks)
    );
    assert_eq!(options.eval_file_small, "nn-123456789abc.nnue");
}

#[cfg(feature = "serde")]
#[test]
fn options_serde_roundtrip() {
    let options = EvalOptions {
        use_style: true,
        tal_weight: 55,
        ..EvalOptions::default()
    };
    let json = serde_json::to_string(&options).unwrap();
    let back: EvalOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(back, options);
}
