//! Configuration surface consumed by the evaluation core.
//!
//! Values arrive as opaque strings from the host's option interface and
//! are normalized and clamped here, mirroring the UCI `setoption`
//! handling of the surrounding engine.

use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::nnue::{EVAL_FILE_DEFAULT_BIG, EVAL_FILE_DEFAULT_SMALL};

/// Follow-up work an option change requires from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOptionAction {
    /// An evaluation file name changed; re-run network resolution
    ReloadNetworks,
}

/// Evaluation options. Field semantics follow the engine's option
/// names; out-of-range values are clamped on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvalOptions {
    /// Requested big-network file name; empty means the built-in default
    pub eval_file: String,
    /// Requested small-network file name; empty means the built-in default
    pub eval_file_small: String,
    /// Extra directory probed during network resolution
    pub network_directory: Option<PathBuf>,
    /// Master switch for style-based evaluation
    pub use_style: bool,
    /// Enables in-search dynamic style adjustment
    pub dynamic_style: bool,
    /// Blend weight for the aggressive style, 0-100
    pub tal_weight: u32,
    /// Blend weight for the defensive style, 0-100
    pub petrosian_weight: u32,
    /// Blend weight for the balanced style, 0-100
    pub capablanca_weight: u32,
    /// Enables the manual material/positional emphasis overrides
    pub manual_weights: bool,
    /// Manual material emphasis, -12..12
    pub materialistic: i32,
    /// Manual positional emphasis, -12..12
    pub positional: i32,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            eval_file: String::new(),
            eval_file_small: String::new(),
            network_directory: None,
            use_style: false,
            dynamic_style: false,
            tal_weight: 20,
            petrosian_weight: 20,
            capablanca_weight: 20,
            manual_weights: false,
            materialistic: 0,
            positional: 0,
        }
    }
}

impl EvalOptions {
    /// Material emphasis applied to the adjusted network blend.
    #[must_use]
    pub fn material_bias(&self) -> i32 {
        if self.manual_weights {
            10 * self.materialistic
        } else {
            0
        }
    }

    /// Positional emphasis applied to the adjusted network blend.
    #[must_use]
    pub fn positional_bias(&self) -> i32 {
        if self.manual_weights {
            10 * self.positional
        } else {
            0
        }
    }

    /// Print the option declarations in UCI format.
    pub fn print(&self) {
        println!(
            "option name EvalFile type string default {}",
            EVAL_FILE_DEFAULT_BIG
        );
        println!(
            "option name EvalFileSmall type string default {}",
            EVAL_FILE_DEFAULT_SMALL
        );
        println!(
            "option name Use Shashin Style type check default {}",
            self.use_style
        );
        println!(
            "option name Shashin Dynamic Style type check default {}",
            self.dynamic_style
        );
        println!(
            "option name Shashin Tal Weight type spin default {} min 0 max 100",
            self.tal_weight
        );
        println!(
            "option name Shashin Petrosian Weight type spin default {} min 0 max 100",
            self.petrosian_weight
        );
        println!(
            "option name Shashin Capablanca Weight type spin default {} min 0 max 100",
            self.capablanca_weight
        );
        println!(
            "option name Manual Evaluation Strategy type check default {}",
            self.manual_weights
        );
        println!(
            "option name Materialistic Evaluation Strategy type spin default {} min -12 max 12",
            self.materialistic
        );
        println!(
            "option name Positional Evaluation Strategy type spin default {} min -12 max 12",
            self.positional
        );
    }

    /// Apply one `setoption`-style change. Unknown names are ignored.
    pub fn apply_setoption(&mut self, name: &str, value: Option<&str>) -> Option<EvalOptionAction> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "evalfile" => {
                let new = value.unwrap_or("").trim().to_string();
                if new != self.eval_file {
                    self.eval_file = new;
                    return Some(EvalOptionAction::ReloadNetworks);
                }
            }
            "evalfilesmall" => {
                let new = value.unwrap_or("").trim().to_string();
                if new != self.eval_file_small {
                    self.eval_file_small = new;
                    return Some(EvalOptionAction::ReloadNetworks);
                }
            }
            "use shashin style" => {
                if let Some(v) = value {
                    self.use_style = parse_bool(v);
                }
            }
            "shashin dynamic style" => {
                if let Some(v) = value {
                    self.dynamic_style = parse_bool(v);
                }
            }
            "shashin tal weight" => {
                if let Some(v) = value.and_then(|v| v.parse::<i64>().ok()) {
                    self.tal_weight = v.clamp(0, 100) as u32;
                }
            }
            "shashin petrosian weight" => {
                if let Some(v) = value.and_then(|v| v.parse::<i64>().ok()) {
                    self.petrosian_weight = v.clamp(0, 100) as u32;
                }
            }
            "shashin capablanca weight" => {
                if let Some(v) = value.and_then(|v| v.parse::<i64>().ok()) {
                    self.capablanca_weight = v.clamp(0, 100) as u32;
                }
            }
            "manual evaluation strategy" => {
                if let Some(v) = value {
                    self.manual_weights = parse_bool(v);
                }
            }
            "materialistic evaluation strategy" => {
                if let Some(v) = value.and_then(|v| v.parse::<i64>().ok()) {
                    self.materialistic = v.clamp(-12, 12) as i32;
                }
            }
            "positional evaluation strategy" => {
                if let Some(v) = value.and_then(|v| v.parse::<i64>().ok()) {
                    self.positional = v.clamp(-12, 12) as i32;
                }
            }
            _ => {}
        }
        None
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1")
}
