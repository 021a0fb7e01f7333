//! Binary load/save of network parameters and startup resolution.
//!
//! File layout, all integers little-endian:
//! `[u32 version][u32 arch hash][u32 desc len][desc bytes]` followed by
//! the feature-transformer block and one block per layer-stack bucket.
//! Every block carries a 4-byte hash header: the block's compile-time
//! architecture hash folded with a checksum of the block payload, so a
//! single flipped byte anywhere in the stream fails the load.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::PathBuf;

use super::network::{
    read_u32, write_u32, BigNetwork, LayerStack, NetworkParams, SmallNetwork, LAYER_STACKS,
};
use super::{NetSize, RawEval, OUTPUT_SCALE};
use crate::config::EvalOptions;
use crate::position::Position;

/// Network file format version tag
pub const VERSION: u32 = 0x7AF3_2F20;

/// Default big-network file name (nn-<12 hex digits of sha256>.nnue)
pub const EVAL_FILE_DEFAULT_BIG: &str = "nn-e8bac1c07f5b.nnue";

/// Default small-network file name
pub const EVAL_FILE_DEFAULT_SMALL: &str = "nn-9ffa467f3b08.nnue";

const MAX_DESCRIPTION_LEN: u32 = 4096;

#[cfg(feature = "embedded_nnue")]
static EMBEDDED_BIG: &[u8] = include_bytes!("nets/default_big.nnue");
#[cfg(feature = "embedded_nnue")]
static EMBEDDED_SMALL: &[u8] = include_bytes!("nets/default_small.nnue");

/// Errors from the network store.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying I/O failure (including short reads)
    Io(io::Error),
    /// File version tag does not match this build
    BadVersion { found: u32 },
    /// Architecture or block hash mismatch
    HashMismatch { expected: u32, found: u32 },
    /// Description length field is implausible
    BadDescription { len: u32 },
    /// Description bytes are not valid UTF-8
    DescriptionNotUtf8,
    /// Stream had bytes left after the last block
    TrailingBytes,
    /// Aligned parameter allocation failed
    Allocation,
    /// Save requested for a variant that was never loaded
    NothingLoaded,
    /// Exporting a non-default network requires an explicit file name
    ExportNeedsFilename,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "network file I/O error: {e}"),
            StoreError::BadVersion { found } => {
                write!(f, "unsupported network file version {found:#010x}")
            }
            StoreError::HashMismatch { expected, found } => {
                write!(
                    f,
                    "network hash mismatch: expected {expected:#010x}, found {found:#010x}"
                )
            }
            StoreError::BadDescription { len } => {
                write!(f, "implausible description length {len}")
            }
            StoreError::DescriptionNotUtf8 => write!(f, "description is not valid UTF-8"),
            StoreError::TrailingBytes => write!(f, "trailing bytes after network parameters"),
            StoreError::Allocation => write!(f, "aligned parameter allocation failed"),
            StoreError::NothingLoaded => write!(f, "no network loaded for this variant"),
            StoreError::ExportNeedsFilename => {
                write!(
                    f,
                    "a non-embedded net can only be saved if the filename is specified"
                )
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Reader wrapper accumulating an FNV-1a checksum over everything read.
struct CheckedReader<'a, R: Read> {
    inner: &'a mut R,
    hash: u32,
}

impl<'a, R: Read> CheckedReader<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        CheckedReader {
            inner,
            hash: FNV_OFFSET,
        }
    }
}

impl<R: Read> Read for CheckedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for &b in &buf[..n] {
            self.hash ^= u32::from(b);
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
        Ok(n)
    }
}

fn read_block<R, F>(r: &mut R, expected_hash: u32, deserialize: F) -> Result<(), StoreError>
where
    R: Read,
    F: FnOnce(&mut CheckedReader<'_, R>) -> io::Result<()>,
{
    let header = read_u32(r)?;
    let mut checked = CheckedReader::new(r);
    deserialize(&mut checked)?;
    // The header carries the expected hash folded with the payload
    // checksum; unfolding it must recover the expected value.
    if header != expected_hash ^ checked.hash {
        return Err(StoreError::HashMismatch {
            expected: expected_hash,
            found: header ^ checked.hash,
        });
    }
    Ok(())
}

fn write_block<W, F>(w: &mut W, expected_hash: u32, serialize: F) -> Result<(), StoreError>
where
    W: Write,
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    let mut payload = Vec::new();
    serialize(&mut payload)?;
    write_u32(w, expected_hash ^ fnv1a(&payload))?;
    w.write_all(&payload)?;
    Ok(())
}

fn read_network<const DIMS: usize, const INPUT: usize>(
    r: &mut impl Read,
) -> Result<(NetworkParams<DIMS, INPUT>, String), StoreError> {
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(StoreError::BadVersion { found: version });
    }
    let arch_hash = read_u32(r)?;
    if arch_hash != NetworkParams::<DIMS, INPUT>::HASH {
        return Err(StoreError::HashMismatch {
            expected: NetworkParams::<DIMS, INPUT>::HASH,
            found: arch_hash,
        });
    }
    let desc_len = read_u32(r)?;
    if desc_len > MAX_DESCRIPTION_LEN {
        return Err(StoreError::BadDescription { len: desc_len });
    }
    let mut desc_bytes = vec![0u8; desc_len as usize];
    r.read_exact(&mut desc_bytes)?;
    let description = String::from_utf8(desc_bytes).map_err(|_| StoreError::DescriptionNotUtf8)?;

    let mut params = NetworkParams::<DIMS, INPUT>::new_zeroed().ok_or(StoreError::Allocation)?;
    read_block(r, super::network::FeatureTransformer::<DIMS>::HASH, |r| {
        params.transformer.read_parameters(r)
    })?;
    for stack in params.stacks.iter_mut() {
        read_block(r, LayerStack::<INPUT>::HASH, |r| stack.read_parameters(r))?;
    }

    // The stream must be exactly exhausted
    let mut probe = [0u8; 1];
    if r.read(&mut probe)? != 0 {
        return Err(StoreError::TrailingBytes);
    }

    Ok((params, description))
}

fn write_network<const DIMS: usize, const INPUT: usize>(
    w: &mut impl Write,
    params: &NetworkParams<DIMS, INPUT>,
    description: &str,
) -> Result<(), StoreError> {
    write_u32(w, VERSION)?;
    write_u32(w, NetworkParams::<DIMS, INPUT>::HASH)?;
    write_u32(w, description.len() as u32)?;
    w.write_all(description.as_bytes())?;

    write_block(w, super::network::FeatureTransformer::<DIMS>::HASH, |buf| {
        params.transformer.write_parameters(buf)
    })?;
    for stack in params.stacks.iter() {
        write_block(w, LayerStack::<INPUT>::HASH, |buf| stack.write_parameters(buf))?;
    }
    Ok(())
}

/// Descriptor for one network size variant.
#[derive(Clone, Debug)]
pub struct EvalFile {
    /// Configuration option carrying the requested file name
    pub option_name: &'static str,
    /// Name used when the option is unset
    pub default_name: &'static str,
    /// Name of the successfully loaded file, if any
    pub selected_name: Option<String>,
}

/// Raised by `verify` when a requested network was never loaded.
#[derive(Debug, Clone)]
pub struct VerifyError {
    pub net: NetSize,
    pub requested: String,
    pub default_name: &'static str,
}

impl VerifyError {
    /// The operator-facing diagnostic, one message per line.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        vec![
            "Network evaluation parameters compatible with the engine must be available."
                .to_string(),
            format!(
                "The network file {} was not loaded successfully.",
                self.requested
            ),
            format!(
                "The option {} might need to specify the full path, including the directory name, to the network file.",
                match self.net {
                    NetSize::Big => "EvalFile",
                    NetSize::Small => "EvalFileSmall",
                }
            ),
            format!(
                "The default net can be downloaded from: https://tests.stockfishchess.org/api/nn/{}",
                self.default_name
            ),
            "The engine will be terminated now.".to_string(),
        ]
    }
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages().join("\n"))
    }
}

impl std::error::Error for VerifyError {}

/// Owner of the loaded network parameters for both size variants.
///
/// All writes happen during single-threaded initialization or the
/// serialized option-change path; searches only read.
pub struct NetworkStore {
    files: [EvalFile; 2],
    descriptions: [String; 2],
    big: Option<BigNetwork>,
    small: Option<SmallNetwork>,
    embedded: [Option<Cow<'static, [u8]>>; 2],
}

impl NetworkStore {
    #[must_use]
    pub fn new() -> Self {
        #[cfg(feature = "embedded_nnue")]
        let embedded = [
            Some(Cow::Borrowed(EMBEDDED_BIG)),
            Some(Cow::Borrowed(EMBEDDED_SMALL)),
        ];
        #[cfg(not(feature = "embedded_nnue"))]
        let embedded = [None, None];

        NetworkStore {
            files: [
                EvalFile {
                    option_name: "EvalFile",
                    default_name: EVAL_FILE_DEFAULT_BIG,
                    selected_name: None,
                },
                EvalFile {
                    option_name: "EvalFileSmall",
                    default_name: EVAL_FILE_DEFAULT_SMALL,
                    selected_name: None,
                },
            ],
            descriptions: [String::new(), String::new()],
            big: None,
            small: None,
            embedded,
        }
    }

    /// Descriptor for one variant.
    #[must_use]
    pub fn descriptor(&self, net: NetSize) -> &EvalFile {
        &self.files[net.index()]
    }

    /// Description string carried by the loaded file, empty if none.
    #[must_use]
    pub fn description(&self, net: NetSize) -> &str {
        &self.descriptions[net.index()]
    }

    /// True if a validated network is loaded for `net`.
    #[must_use]
    pub fn is_loaded(&self, net: NetSize) -> bool {
        match net {
            NetSize::Big => self.big.is_some(),
            NetSize::Small => self.small.is_some(),
        }
    }

    /// Install an embedded network image resolved before any file
    /// candidates (the runtime flavor of the compile-time
    /// `embedded_nnue` blob).
    pub fn install_embedded(&mut self, net: NetSize, bytes: impl Into<Cow<'static, [u8]>>) {
        self.embedded[net.index()] = Some(bytes.into());
    }

    /// Read one network from `reader` and commit it under `name`.
    ///
    /// On any failure the previously loaded parameters and descriptor
    /// are left untouched.
    pub fn load(
        &mut self,
        name: &str,
        reader: &mut impl Read,
        net: NetSize,
    ) -> Result<(), StoreError> {
        match net {
            NetSize::Big => {
                let (params, description) = read_network(reader)?;
                self.big = Some(params);
                self.descriptions[net.index()] = description;
            }
            NetSize::Small => {
                let (params, description) = read_network(reader)?;
                self.small = Some(params);
                self.descriptions[net.index()] = description;
            }
        }
        self.files[net.index()].selected_name = Some(name.to_string());
        #[cfg(feature = "logging")]
        log::debug!("loaded {net:?} network from {name}");
        Ok(())
    }

    /// Write the loaded network for `net` as a bit-exact mirror of the
    /// load format.
    pub fn save(&self, writer: &mut impl Write, net: NetSize) -> Result<(), StoreError> {
        if self.files[net.index()].selected_name.is_none() {
            return Err(StoreError::NothingLoaded);
        }
        let description = &self.descriptions[net.index()];
        match net {
            NetSize::Big => {
                let params = self.big.as_ref().ok_or(StoreError::NothingLoaded)?;
                write_network(writer, params, description)
            }
            NetSize::Small => {
                let params = self.small.as_ref().ok_or(StoreError::NothingLoaded)?;
                write_network(writer, params, description)
            }
        }
    }

    /// Export the loaded network to a file. Without an explicit name the
    /// selected network must be the default one.
    pub fn save_to_file(
        &self,
        filename: Option<&str>,
        net: NetSize,
    ) -> Result<String, StoreError> {
        let file = &self.files[net.index()];
        let actual = match filename {
            Some(name) => name.to_string(),
            None => {
                if file.selected_name.as_deref() != Some(file.default_name) {
                    return Err(StoreError::ExportNeedsFilename);
                }
                file.default_name.to_string()
            }
        };
        let mut writer = BufWriter::new(File::create(&actual)?);
        self.save(&mut writer, net)?;
        writer.flush()?;
        Ok(actual)
    }

    fn requested_name(options: &EvalOptions, file: &EvalFile, net: NetSize) -> String {
        let configured = match net {
            NetSize::Big => options.eval_file.as_str(),
            NetSize::Small => options.eval_file_small.as_str(),
        };
        if configured.is_empty() {
            file.default_name.to_string()
        } else {
            configured.to_string()
        }
    }

    /// Resolve and load both network variants.
    ///
    /// Candidates are probed in order: the embedded image (only for the
    /// default name), the working directory, the executable's directory
    /// and the configured network directory. The first validated load
    /// wins; the rest are skipped.
    pub fn init(&mut self, options: &EvalOptions) {
        for net in NetSize::ALL {
            let file = self.files[net.index()].clone();
            let requested = Self::requested_name(options, &file, net);

            if file.selected_name.as_deref() == Some(requested.as_str()) {
                continue;
            }

            if requested == file.default_name {
                if let Some(bytes) = self.embedded[net.index()].take() {
                    let loaded = self
                        .load(&requested, &mut Cursor::new(bytes.as_ref()), net)
                        .is_ok();
                    self.embedded[net.index()] = Some(bytes);
                    if loaded {
                        continue;
                    }
                    #[cfg(feature = "logging")]
                    log::warn!("embedded {net:?} network failed validation");
                }
            }

            let mut dirs: Vec<PathBuf> = vec![PathBuf::new()];
            if let Some(dir) = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(PathBuf::from))
            {
                dirs.push(dir);
            }
            if let Some(dir) = &options.network_directory {
                dirs.push(dir.clone());
            }

            for dir in dirs {
                if self.files[net.index()].selected_name.as_deref() == Some(requested.as_str()) {
                    break;
                }
                let path = dir.join(&requested);
                let Ok(handle) = File::open(&path) else {
                    continue;
                };
                let mut reader = BufReader::new(handle);
                if self.load(&requested, &mut reader, net).is_err() {
                    #[cfg(feature = "logging")]
                    log::warn!("candidate {} failed validation", path.display());
                }
            }
        }
    }

    /// Check that every variant resolved to its requested file name.
    pub fn verify(&self, options: &EvalOptions) -> Result<(), VerifyError> {
        for net in NetSize::ALL {
            let file = &self.files[net.index()];
            let requested = Self::requested_name(options, file, net);
            if file.selected_name.as_deref() != Some(requested.as_str()) {
                return Err(VerifyError {
                    net,
                    requested,
                    default_name: file.default_name,
                });
            }
        }
        Ok(())
    }

    /// `verify`, escalated: print the diagnostic and terminate the
    /// process. Search correctness depends on a loaded network, so a
    /// failed verification is not recoverable.
    pub fn verify_or_exit(&self, options: &EvalOptions) {
        match self.verify(options) {
            Ok(()) => {
                for net in NetSize::ALL {
                    let file = &self.files[net.index()];
                    if let Some(name) = &file.selected_name {
                        eprintln!("info string NNUE evaluation using {name}");
                    }
                }
            }
            Err(err) => {
                for line in err.messages() {
                    eprintln!("info string ERROR: {line}");
                }
                std::process::exit(1);
            }
        }
    }

    /// Run raw inference for `pos` on the selected variant.
    ///
    /// Returns `None` when that variant is not loaded. `psqt_only` skips
    /// the layer-stack propagation; `want_complexity` requests the
    /// disagreement measure between the two outputs.
    #[must_use]
    pub fn infer(
        &self,
        pos: &Position,
        net: NetSize,
        want_complexity: bool,
        psqt_only: bool,
    ) -> Option<RawEval> {
        let bucket = ((pos.piece_count().max(1) - 1) / 4) as usize;
        let bucket = bucket.min(LAYER_STACKS - 1);
        let (psqt, positional) = match net {
            NetSize::Big => self.big.as_ref()?.evaluate_raw(pos, bucket, psqt_only),
            NetSize::Small => self.small.as_ref()?.evaluate_raw(pos, bucket, psqt_only),
        };
        let complexity = if want_complexity && !psqt_only {
            (psqt - positional).abs() / OUTPUT_SCALE
        } else {
            0
        };
        Some(RawEval {
            psqt,
            positional,
            complexity,
        })
    }
}

impl Default for NetworkStore {
    fn default() -> Self {
        NetworkStore::new()
    }
}
