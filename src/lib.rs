//! Adaptive position-scoring core for a chess engine.
//!
//! Given a read-only position view, produces a single centipawn score
//! from the side to move's perspective. The score comes from a
//! quantized network (loaded and verified by [`nnue::NetworkStore`])
//! blended with a simple material evaluation and steered by a dynamic
//! style control loop ([`eval::EvalContext`]).
//!
//! # Example
//! ```
//! use chess_eval::{evaluate, EvalContext, EvalOptions, NetworkStore, Position};
//!
//! let store = NetworkStore::new();
//! let mut ctx = EvalContext::new(EvalOptions::default());
//! let pos = Position::new();
//! // Without a loaded network the score degrades to the material eval.
//! assert_eq!(evaluate(&store, &pos, &mut ctx, 0), 0);
//! ```

pub mod config;
pub mod eval;
pub mod nnue;
pub mod position;

pub use config::{EvalOptionAction, EvalOptions};
pub use eval::{
    evaluate, evaluate_network, simple_eval, EvalContext, GamePhase, SharedEvalContext, Style,
};
pub use nnue::{NetSize, NetworkStore};
pub use position::{Color, Piece, Position, Square};
