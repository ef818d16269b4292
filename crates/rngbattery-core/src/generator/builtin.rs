//! Algorithmic generators selectable by name.
//!
//! Two are modern generators from the `rand` crate and serve as "should pass"
//! references. The rest are small classic generators with well known
//! weaknesses (RANDU's planes, MINSTD's short period) that the battery is
//! expected to catch.

use rand::rngs::{SmallRng, StdRng};
use rand::{RngCore, SeedableRng};

use super::{GeneratorInfo, GeneratorKind, RandomSource};
use crate::error::{BatteryError, Result};

/// Registry entry for a builtin generator.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub bits: u32,
    construct: fn(u64) -> Box<dyn RandomSource>,
}

impl BuiltinDescriptor {
    pub fn create(&self, seed: u64) -> Box<dyn RandomSource> {
        (self.construct)(seed)
    }
}

/// Every builtin generator, in listing order.
pub const BUILTIN_GENERATORS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "stdrng",
        description: "rand StdRng (ChaCha12), cryptographic reference",
        bits: 32,
        construct: |seed| Box::new(RandCrate::<StdRng>::new("stdrng", seed)),
    },
    BuiltinDescriptor {
        name: "smallrng",
        description: "rand SmallRng (Xoshiro256++), fast non-cryptographic reference",
        bits: 32,
        construct: |seed| Box::new(RandCrate::<SmallRng>::new("smallrng", seed)),
    },
    BuiltinDescriptor {
        name: "xorshift32",
        description: "Marsaglia xorshift with 13/17/5 shifts",
        bits: 32,
        construct: |seed| Box::new(Xorshift32::new(seed)),
    },
    BuiltinDescriptor {
        name: "lcg64",
        description: "Knuth MMIX 64-bit LCG, high 32 bits",
        bits: 32,
        construct: |seed| Box::new(Lcg64::new(seed)),
    },
    BuiltinDescriptor {
        name: "randu",
        description: "IBM RANDU, x = 65539 x mod 2^31 (notoriously bad)",
        bits: 31,
        construct: |seed| Box::new(Randu::new(seed)),
    },
    BuiltinDescriptor {
        name: "minstd",
        description: "Park-Miller minimal standard, x = 16807 x mod (2^31 - 1)",
        bits: 31,
        construct: |seed| Box::new(Minstd::new(seed)),
    },
];

/// Construct a builtin generator by (case-insensitive) name.
pub fn create_builtin(name: &str, seed: u64) -> Result<Box<dyn RandomSource>> {
    BUILTIN_GENERATORS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .map(|d| d.create(seed))
        .ok_or_else(|| BatteryError::UnknownGenerator(name.to_string()))
}

// ---------------------------------------------------------------------------
// rand crate generators
// ---------------------------------------------------------------------------

struct RandCrate<R> {
    info: GeneratorInfo,
    rng: R,
}

impl<R: SeedableRng> RandCrate<R> {
    fn new(name: &'static str, seed: u64) -> Self {
        Self {
            info: GeneratorInfo::new(name, GeneratorKind::Builtin, 32),
            rng: R::seed_from_u64(seed),
        }
    }
}

impl<R: RngCore + SeedableRng> RandomSource for RandCrate<R> {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn reset(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
    }
}

// ---------------------------------------------------------------------------
// Classic generators
// ---------------------------------------------------------------------------

/// SplitMix64 finalizer, spreads small seeds over the whole state.
fn mix_seed(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

struct Xorshift32 {
    info: GeneratorInfo,
    state: u32,
}

impl Xorshift32 {
    fn new(seed: u64) -> Self {
        let mut g = Self {
            info: GeneratorInfo::new("xorshift32", GeneratorKind::Builtin, 32),
            state: 1,
        };
        g.reset(seed);
        g
    }
}

impl RandomSource for Xorshift32 {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    fn reset(&mut self, seed: u64) {
        // Zero is a fixed point.
        self.state = match mix_seed(seed) as u32 {
            0 => 0x2545_F491,
            s => s,
        };
    }
}

struct Lcg64 {
    info: GeneratorInfo,
    state: u64,
}

impl Lcg64 {
    fn new(seed: u64) -> Self {
        Self {
            info: GeneratorInfo::new("lcg64", GeneratorKind::Builtin, 32),
            state: seed,
        }
    }
}

impl RandomSource for Lcg64 {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 32) as u32
    }

    fn reset(&mut self, seed: u64) {
        self.state = seed;
    }
}

struct Randu {
    info: GeneratorInfo,
    state: u32,
}

impl Randu {
    fn new(seed: u64) -> Self {
        let mut g = Self {
            info: GeneratorInfo::new("randu", GeneratorKind::Builtin, 31),
            state: 1,
        };
        g.reset(seed);
        g
    }
}

impl RandomSource for Randu {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(65539) & 0x7FFF_FFFF;
        self.state
    }

    fn reset(&mut self, seed: u64) {
        // RANDU requires an odd seed.
        self.state = ((seed as u32) & 0x7FFF_FFFF) | 1;
    }
}

struct Minstd {
    info: GeneratorInfo,
    state: u32,
}

impl Minstd {
    const MODULUS: u64 = 2_147_483_647;

    fn new(seed: u64) -> Self {
        let mut g = Self {
            info: GeneratorInfo::new("minstd", GeneratorKind::Builtin, 31),
            state: 1,
        };
        g.reset(seed);
        g
    }
}

impl RandomSource for Minstd {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        self.state = ((self.state as u64 * 16807) % Self::MODULUS) as u32;
        self.state
    }

    fn reset(&mut self, seed: u64) {
        // State must lie in [1, m - 1].
        self.state = (seed % (Self::MODULUS - 1)) as u32 + 1;
    }
}
