//! Quantized network parameter blocks and inference.
//!
//! Architecture: 768 input features (64 squares x 6 piece types x 2
//! colors) feed a perspective-pair feature transformer; per-bucket layer
//! stacks propagate the transformed features to a positional output,
//! while per-bucket PSQT weights produce the material-like output
//! directly from the transformer.

use std::io::{Read, Write};

use super::align::{boxed_zeroed, Align64};
use crate::position::{Color, Piece, Position, Square};

/// Input feature count: 64 squares x 6 piece types x 2 colors
pub const FEATURE_DIMS: usize = 768;

/// Feature transformer output width, big network
pub const TRANSFORMED_DIMS_BIG: usize = 128;

/// Feature transformer output width, small network
pub const TRANSFORMED_DIMS_SMALL: usize = 32;

/// Number of layer-stack buckets (also the PSQT bucket count)
pub const LAYER_STACKS: usize = 8;

const L2: usize = 16;
const L3: usize = 32;

/// Clipped ReLU ceiling for quantized activations
const ACTIVATION_MAX: i32 = 127;

/// Shift applied after each quantized affine layer
const WEIGHT_SCALE_BITS: u32 = 6;

/// Compute the input-feature index for a piece from one perspective.
///
/// Index layout: perspective-relative color (own 0, enemy 1) * 384 +
/// piece type * 64 + perspective-oriented square.
#[inline]
#[must_use]
pub fn feature_index(piece: Piece, color: Color, sq: Square, perspective: Color) -> usize {
    let (oriented_sq, oriented_color) = if perspective == Color::Black {
        (sq.index() ^ 56, color.opponent())
    } else {
        (sq.index(), color)
    };
    oriented_color.index() * 384 + piece.index() * 64 + oriented_sq
}

// Little-endian wire helpers shared with the store.

pub(crate) fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_i16<R: Read>(r: &mut R) -> std::io::Result<i16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

pub(crate) fn read_i8<R: Read>(r: &mut R) -> std::io::Result<i8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0] as i8)
}

pub(crate) fn write_u32<W: Write>(w: &mut W, v: u32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub(crate) fn write_i32<W: Write>(w: &mut W, v: i32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub(crate) fn write_i16<W: Write>(w: &mut W, v: i16) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub(crate) fn write_i8<W: Write>(w: &mut W, v: i8) -> std::io::Result<()> {
    w.write_all(&[v as u8])
}

/// Feature transformer: accumulates feature weights for both
/// perspectives and yields the material-like (PSQT) raw output.
pub struct FeatureTransformer<const DIMS: usize> {
    pub(crate) biases: Box<Align64<[i16; DIMS]>>,
    pub(crate) weights: Box<Align64<[[i16; DIMS]; FEATURE_DIMS]>>,
    pub(crate) psqt_weights: Box<Align64<[[i32; LAYER_STACKS]; FEATURE_DIMS]>>,
}

impl<const DIMS: usize> FeatureTransformer<DIMS> {
    /// Architecture hash for this block
    pub const HASH: u32 = 0x5D69_D5B8 ^ ((DIMS as u32) * 2);

    pub(crate) fn new_zeroed() -> Option<Self> {
        Some(FeatureTransformer {
            biases: boxed_zeroed()?,
            weights: boxed_zeroed()?,
            psqt_weights: boxed_zeroed()?,
        })
    }

    pub(crate) fn read_parameters<R: Read>(&mut self, r: &mut R) -> std::io::Result<()> {
        for b in self.biases.iter_mut() {
            *b = read_i16(r)?;
        }
        for row in self.weights.iter_mut() {
            for w in row.iter_mut() {
                *w = read_i16(r)?;
            }
        }
        for row in self.psqt_weights.iter_mut() {
            for w in row.iter_mut() {
                *w = read_i32(r)?;
            }
        }
        Ok(())
    }

    pub(crate) fn write_parameters<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for &b in self.biases.iter() {
            write_i16(w, b)?;
        }
        for row in self.weights.iter() {
            for &v in row.iter() {
                write_i16(w, v)?;
            }
        }
        for row in self.psqt_weights.iter() {
            for &v in row.iter() {
                write_i32(w, v)?;
            }
        }
        Ok(())
    }

    /// Accumulate the active features of `pos` from both perspectives.
    ///
    /// Fills `buffer` (own half then enemy half) with clipped activations
    /// unless `psqt_only` is set, and returns the raw PSQT output for the
    /// side to move.
    pub(crate) fn transform(
        &self,
        pos: &Position,
        buffer: &mut [u8],
        bucket: usize,
        psqt_only: bool,
    ) -> i32 {
        debug_assert_eq!(buffer.len(), 2 * DIMS);

        let us = pos.side_to_move();
        let perspectives = [us, us.opponent()];
        let mut psqt = [0i32; 2];
        let mut acc = [[0i32; DIMS]; 2];

        for acc_half in acc.iter_mut() {
            for (slot, &b) in acc_half.iter_mut().zip(self.biases.iter()) {
                *slot = i32::from(b);
            }
        }

        for color in [Color::White, Color::Black] {
            for piece in Piece::ALL {
                for sq in pos.pieces(color, piece).iter() {
                    for (p, &perspective) in perspectives.iter().enumerate() {
                        let f = feature_index(piece, color, sq, perspective);
                        psqt[p] += self.psqt_weights[f][bucket];
                        if !psqt_only {
                            let weights = &self.weights[f];
                            for (slot, &w) in acc[p].iter_mut().zip(weights.iter()) {
                                *slot += i32::from(w);
                            }
                        }
                    }
                }
            }
        }

        if !psqt_only {
            for p in 0..2 {
                for (i, &v) in acc[p].iter().enumerate() {
                    buffer[p * DIMS + i] = v.clamp(0, ACTIVATION_MAX) as u8;
                }
            }
        }

        (psqt[0] - psqt[1]) / 2
    }
}

/// One per-bucket layer stack producing the positional raw output.
pub struct LayerStack<const INPUT: usize> {
    pub(crate) l1_weights: Box<Align64<[[i8; INPUT]; L2]>>,
    pub(crate) l1_biases: [i32; L2],
    pub(crate) l2_weights: Box<Align64<[[i8; L2]; L3]>>,
    pub(crate) l2_biases: [i32; L3],
    pub(crate) output_weights: [i8; L3],
    pub(crate) output_bias: i32,
}

impl<const INPUT: usize> LayerStack<INPUT> {
    /// Architecture hash for this block
    pub const HASH: u32 = 0xCC03_DAE4 ^ (INPUT as u32);

    pub(crate) fn new_zeroed() -> Option<Self> {
        Some(LayerStack {
            l1_weights: boxed_zeroed()?,
            l1_biases: [0; L2],
            l2_weights: boxed_zeroed()?,
            l2_biases: [0; L3],
            output_weights: [0; L3],
            output_bias: 0,
        })
    }

    pub(crate) fn read_parameters<R: Read>(&mut self, r: &mut R) -> std::io::Result<()> {
        for b in self.l1_biases.iter_mut() {
            *b = read_i32(r)?;
        }
        for row in self.l1_weights.iter_mut() {
            for w in row.iter_mut() {
                *w = read_i8(r)?;
            }
        }
        for b in self.l2_biases.iter_mut() {
            *b = read_i32(r)?;
        }
        for row in self.l2_weights.iter_mut() {
            for w in row.iter_mut() {
                *w = read_i8(r)?;
            }
        }
        self.output_bias = read_i32(r)?;
        for w in self.output_weights.iter_mut() {
            *w = read_i8(r)?;
        }
        Ok(())
    }

    pub(crate) fn write_parameters<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for &b in self.l1_biases.iter() {
            write_i32(w, b)?;
        }
        for row in self.l1_weights.iter() {
            for &v in row.iter() {
                write_i8(w, v)?;
            }
        }
        for &b in self.l2_biases.iter() {
            write_i32(w, b)?;
        }
        for row in self.l2_weights.iter() {
            for &v in row.iter() {
                write_i8(w, v)?;
            }
        }
        write_i32(w, self.output_bias)?;
        for &v in self.output_weights.iter() {
            write_i8(w, v)?;
        }
        Ok(())
    }

    /// Propagate clipped transformer activations to the raw positional
    /// output.
    pub(crate) fn propagate(&self, input: &[u8]) -> i32 {
        debug_assert_eq!(input.len(), INPUT);

        let mut l1_out = [0u8; L2];
        for (o, out) in l1_out.iter_mut().enumerate() {
            let mut sum = self.l1_biases[o];
            for (i, &v) in input.iter().enumerate() {
                sum += i32::from(self.l1_weights[o][i]) * i32::from(v);
            }
            *out = (sum >> WEIGHT_SCALE_BITS).clamp(0, ACTIVATION_MAX) as u8;
        }

        let mut l2_out = [0u8; L3];
        for (o, out) in l2_out.iter_mut().enumerate() {
            let mut sum = self.l2_biases[o];
            for (i, &v) in l1_out.iter().enumerate() {
                sum += i32::from(self.l2_weights[o][i]) * i32::from(v);
            }
            *out = (sum >> WEIGHT_SCALE_BITS).clamp(0, ACTIVATION_MAX) as u8;
        }

        let mut out = self.output_bias;
        for (i, &v) in l2_out.iter().enumerate() {
            out += i32::from(self.output_weights[i]) * i32::from(v);
        }
        out
    }
}

/// Full parameter set for one network size variant.
pub struct NetworkParams<const DIMS: usize, const INPUT: usize> {
    pub(crate) transformer: FeatureTransformer<DIMS>,
    pub(crate) stacks: Vec<LayerStack<INPUT>>,
}

/// Big-variant parameters
pub type BigNetwork = NetworkParams<TRANSFORMED_DIMS_BIG, { 2 * TRANSFORMED_DIMS_BIG }>;

/// Small-variant parameters
pub type SmallNetwork = NetworkParams<TRANSFORMED_DIMS_SMALL, { 2 * TRANSFORMED_DIMS_SMALL }>;

impl<const DIMS: usize, const INPUT: usize> NetworkParams<DIMS, INPUT> {
    /// Combined architecture hash (transformer ^ layer stack)
    pub const HASH: u32 = FeatureTransformer::<DIMS>::HASH ^ LayerStack::<INPUT>::HASH;

    pub(crate) fn new_zeroed() -> Option<Self> {
        let transformer = FeatureTransformer::new_zeroed()?;
        let mut stacks = Vec::with_capacity(LAYER_STACKS);
        for _ in 0..LAYER_STACKS {
            stacks.push(LayerStack::new_zeroed()?);
        }
        Some(NetworkParams { transformer, stacks })
    }

    /// Raw (psqt, positional) outputs for `pos` using `bucket`.
    pub(crate) fn evaluate_raw(&self, pos: &Position, bucket: usize, psqt_only: bool) -> (i32, i32) {
        let mut buffer = [0u8; INPUT];
        let psqt = self.transformer.transform(pos, &mut buffer, bucket, psqt_only);
        let positional = if psqt_only {
            0
        } else {
            self.stacks[bucket].propagate(&buffer)
        };
        (psqt, positional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_index_white_perspective() {
        // White pawn on e2 seen by white: own block, pawn row, e2
        let idx = feature_index(Piece::Pawn, Color::White, Square(1, 4), Color::White);
        assert_eq!(idx, Square(1, 4).index());
        // Black pawn seen by white lands in the enemy block
        let idx = feature_index(Piece::Pawn, Color::Black, Square(6, 4), Color::White);
        assert_eq!(idx, 384 + Square(6, 4).index());
    }

    #[test]
    fn test_feature_index_black_perspective_mirrors() {
        // A white pawn on e2 from black's view maps like a black pawn on e7
        // from white's view
        let from_black = feature_index(Piece::Pawn, Color::White, Square(1, 4), Color::Black);
        let mirrored = feature_index(Piece::Pawn, Color::Black, Square(6, 4), Color::White);
        assert_eq!(from_black, mirrored);
    }

    #[test]
    fn test_zeroed_network_evaluates_to_zero() {
        let net = SmallNetwork::new_zeroed().unwrap();
        let pos = Position::new();
        let (psqt, positional) = net.evaluate_raw(&pos, 0, false);
        assert_eq!(psqt, 0);
        assert_eq!(positional, 0);
    }

    #[test]
    fn test_psqt_sign_flips_with_side_to_move() {
        let mut net = SmallNetwork::new_zeroed().unwrap();
        // Reward the own-perspective white-pawn-on-e2 feature in every bucket
        let f = feature_index(Piece::Pawn, Color::White, Square(1, 4), Color::White);
        for bucket in 0..LAYER_STACKS {
            net.transformer.psqt_weights[f][bucket] = 64;
        }

        let white_to_move: Position = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1".parse().unwrap();
        let black_to_move: Position = "4k3/8/8/8/8/8/4P3/4K3 b - - 0 1".parse().unwrap();

        let (psqt_w, _) = net.evaluate_raw(&white_to_move, 0, true);
        let (psqt_b, _) = net.evaluate_raw(&black_to_move, 0, true);
        assert!(psqt_w > 0, "psqt_w={psqt_w}");
        assert_eq!(psqt_w, -psqt_b);
    }

    #[test]
    fn test_propagate_zero_input_yields_bias() {
        let mut stack: LayerStack<64> = LayerStack::new_zeroed().unwrap();
        stack.output_bias = 1234;
        let input = [0u8; 64];
        assert_eq!(stack.propagate(&input), 1234);
    }

    #[test]
    fn test_hashes_distinguish_variants() {
        assert_ne!(BigNetwork::HASH, SmallNetwork::HASH);
        assert_ne!(
            FeatureTransformer::<TRANSFORMED_DIMS_BIG>::HASH,
            FeatureTransformer::<TRANSFORMED_DIMS_SMALL>::HASH
        );
    }
}
