//! Uniform "next unsigned integer" interface over every kind of bitstream.
//!
//! Every source implements [`RandomSource`]. A [`Generator`] owns one boxed
//! source and layers bit-level access on top of it, so tests never care
//! whether values come from an algorithm, a file, or an XOR of several.
//!
//! ```text
//! builtin (by name + seed) ─┐
//! file (raw u32 stream)    ─┼─> RandomSource ─> Generator ─> tests
//! xor (1..=100 of the above)┘
//! ```

pub mod builtin;
pub mod file;
pub mod xor;

use std::fmt;

use serde::Serialize;

use crate::config::RunConfig;
use crate::error::{BatteryError, Result};

pub use builtin::{BUILTIN_GENERATORS, BuiltinDescriptor, create_builtin};
pub use file::{FileSource, StreamState, StreamStats};
pub use xor::{MAX_XOR_MEMBERS, XorMember, XorSource};

/// How a source produces its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeneratorKind {
    /// Algorithmic generator selected by name.
    Builtin,
    /// Finite stream replayed from a file.
    File,
    /// Bitwise XOR of several sources.
    Xor,
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::File => write!(f, "file"),
            Self::Xor => write!(f, "xor"),
        }
    }
}

/// Metadata about a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorInfo {
    /// Display name (e.g. `"randu"`, `"file_input_raw"`, `"xor(stdrng,randu)"`).
    pub name: String,
    pub kind: GeneratorKind,
    /// Number of valid low-order bits in each value, 1..=32.
    pub bits: u32,
}

impl GeneratorInfo {
    pub fn new(name: impl Into<String>, kind: GeneratorKind, bits: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            bits,
        }
    }

    /// Exclusive upper bound of values returned by `next_uint`.
    pub fn max(&self) -> u64 {
        1u64 << self.bits
    }
}

/// Trait that every bitstream source implements.
pub trait RandomSource {
    fn info(&self) -> &GeneratorInfo;

    /// Next value, uniformly distributed in `[0, 2^bits)` for a good source.
    fn next_uint(&mut self) -> u32;

    /// Reseed. Sources without a seed (files) ignore this.
    fn reset(&mut self, seed: u64);

    /// Failure recorded during an earlier `next_uint`, if any.
    fn take_error(&mut self) -> Option<BatteryError> {
        None
    }

    /// Rewind/served counters for stream-backed sources.
    fn stream_stats(&self) -> Option<StreamStats> {
        None
    }

    fn bits(&self) -> u32 {
        self.info().bits
    }
}

/// A source plus a bit buffer for sub-word reads.
pub struct Generator {
    source: Box<dyn RandomSource>,
    pinned_seed: Option<u64>,
    bit_buffer: u32,
    bits_left: u32,
}

impl Generator {
    pub fn new(source: Box<dyn RandomSource>) -> Self {
        Self {
            source,
            pinned_seed: None,
            bit_buffer: 0,
            bits_left: 0,
        }
    }

    /// Wrap a source that always reseeds to `seed`, whatever `reset` is given.
    pub fn pinned(source: Box<dyn RandomSource>, seed: u64) -> Self {
        Self {
            pinned_seed: Some(seed),
            ..Self::new(source)
        }
    }

    /// Build the generator described by a run configuration.
    ///
    /// One builtin or one file is used directly; anything more becomes an XOR
    /// composite with the file (if any) as its last member.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let total = config.generators.len() + usize::from(config.input_file.is_some());
        if total == 0 {
            return Err(BatteryError::NoGenerators);
        }
        if total > MAX_XOR_MEMBERS {
            return Err(BatteryError::TooManyGenerators {
                count: total,
                max: MAX_XOR_MEMBERS,
            });
        }
        let initial = config.seed.unwrap_or_else(fresh_seed);

        if total == 1 {
            if let Some(path) = &config.input_file {
                return Ok(Self::new(Box::new(FileSource::open(path)?)));
            }
            let spec = &config.generators[0];
            let source = create_builtin(&spec.name, spec.seed.unwrap_or(initial))?;
            return Ok(match spec.seed {
                Some(seed) => Self::pinned(source, seed),
                None => Self::new(source),
            });
        }

        let mut members = Vec::with_capacity(total);
        for (i, spec) in config.generators.iter().enumerate() {
            let seed = spec.seed.unwrap_or(initial.wrapping_add(i as u64));
            members.push(XorMember::new(create_builtin(&spec.name, seed)?, spec.seed));
        }
        if let Some(path) = &config.input_file {
            members.push(XorMember::new(Box::new(FileSource::open(path)?), None));
        }
        Ok(Self::new(Box::new(XorSource::new(members)?)))
    }

    pub fn info(&self) -> &GeneratorInfo {
        self.source.info()
    }

    pub fn name(&self) -> &str {
        &self.source.info().name
    }

    pub fn bits(&self) -> u32 {
        self.source.bits()
    }

    pub fn max(&self) -> u64 {
        1u64 << self.bits()
    }

    pub fn next_uint(&mut self) -> u32 {
        self.source.next_uint()
    }

    /// Next `nbits` bits (1..=32) of the stream, right-aligned.
    ///
    /// Only the source's valid bits are used, and bits left over from one
    /// call are consumed by the next, so consecutive calls read one
    /// continuous bitstream.
    pub fn next_bits(&mut self, nbits: u32) -> u32 {
        let mut need = nbits.clamp(1, 32);
        let mut value: u64 = 0;
        while need > 0 {
            if self.bits_left == 0 {
                self.bit_buffer = self.source.next_uint();
                self.bits_left = self.source.bits();
            }
            let take = need.min(self.bits_left);
            let shift = self.bits_left - take;
            let chunk = (self.bit_buffer as u64 >> shift) & ((1u64 << take) - 1);
            value = (value << take) | chunk;
            self.bits_left -= take;
            need -= take;
        }
        value as u32
    }

    /// Full 32-bit word assembled from the bitstream, whatever the source width.
    pub fn next_u32(&mut self) -> u32 {
        if self.bits() == 32 && self.bits_left == 0 {
            return self.source.next_uint();
        }
        self.next_bits(32)
    }

    /// Uniform double in `[0, 1)`.
    pub fn next_uniform(&mut self) -> f64 {
        self.source.next_uint() as f64 / self.max() as f64
    }

    /// Integer uniformly chosen from `0..n` (`n` ≥ 1), by scaling a uniform.
    pub fn next_below(&mut self, n: u32) -> u32 {
        let n = n.max(1);
        ((self.next_uniform() * n as f64) as u32).min(n - 1)
    }

    /// Fill `buf` with full 32-bit words.
    pub fn fill_uints(&mut self, buf: &mut [u32]) {
        for slot in buf.iter_mut() {
            *slot = self.next_u32();
        }
    }

    /// Reseed and discard any buffered bits.
    pub fn reset(&mut self, seed: u64) {
        let seed = self.pinned_seed.unwrap_or(seed);
        log::debug!("reseeding {} with {seed}", self.name());
        self.source.reset(seed);
        self.bit_buffer = 0;
        self.bits_left = 0;
    }

    pub fn take_error(&mut self) -> Option<BatteryError> {
        self.source.take_error()
    }

    pub fn stream_stats(&self) -> Option<StreamStats> {
        self.source.stream_stats()
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("info", self.info())
            .field("pinned_seed", &self.pinned_seed)
            .field("bits_left", &self.bits_left)
            .finish()
    }
}

/// Seed drawn from the OS CSPRNG, falling back to the clock if it is unavailable.
pub fn fresh_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::fill(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(e) => {
            log::warn!("OS entropy unavailable ({e}), seeding from the clock");
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x9E37_79B9_7F4A_7C15)
        }
    }
}
