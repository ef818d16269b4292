//! The concrete randomness tests.
//!
//! Each test turns `tsamples` draws from a [`Generator`] into one p-value per
//! trial. The battery runs `psamples` trials and reduces them with the
//! KS/Kuiper aggregator, so a test only ever has to get a single trial right.

use std::ops::RangeInclusive;

use rngbattery_core::Generator;
use serde::Serialize;

mod diehard;
mod other;
mod sts;

pub use diehard::{
    Birthdays, Craps, ParkingLot, Rank32x32, Rank6x8, Sphere2d, Sphere3d, Sums,
};
pub use other::{
    BitDistribution, ByteDistribution, Dct, FillTree, KsUniformity, LaggedSums,
    MinimumDistance, Monobit2, Permutations,
};
pub use sts::{Monobit, Runs, Serial};

/// Static description of a test.
#[derive(Debug, Clone, Serialize)]
pub struct TestInfo {
    pub id: u32,
    /// Short name in the style `diehard_birthdays`.
    pub name: &'static str,
    pub description: &'static str,
    /// Draws (or structures built from draws) consumed per trial.
    pub tsamples: u64,
    /// Trials per run.
    pub psamples: u32,
    /// ntuple used when the run has none; 0 if the test takes no ntuple.
    pub ntuple: u32,
    /// ntuple values the test can use.
    #[serde(skip)]
    pub ntuple_range: Option<RangeInclusive<u32>>,
}

impl TestInfo {
    /// The ntuple a single run should use, given the configured one.
    ///
    /// Zero selects the default. A value the test cannot use also falls back
    /// to the default, with a warning.
    pub fn effective_ntuple(&self, configured: u32) -> u32 {
        match &self.ntuple_range {
            None => self.ntuple,
            Some(_) if configured == 0 => self.ntuple,
            Some(range) if range.contains(&configured) => configured,
            Some(range) => {
                log::warn!(
                    "{}: ntuple {configured} outside {}..={}, using {}",
                    self.name,
                    range.start(),
                    range.end(),
                    self.ntuple
                );
                self.ntuple
            }
        }
    }
}

/// Parameters of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialParams {
    pub tsamples: u64,
    pub ntuple: u32,
}

/// Trait every randomness test implements.
pub trait BatteryTest {
    fn info(&self) -> &TestInfo;

    /// Run one trial and return its p-value.
    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64;
}

/// Every test in id order.
pub fn standard_tests() -> Vec<Box<dyn BatteryTest>> {
    vec![
        Box::new(Birthdays::new()),
        Box::new(Rank32x32::new()),
        Box::new(Rank6x8::new()),
        Box::new(ParkingLot::new()),
        Box::new(Sphere2d::new()),
        Box::new(Sphere3d::new()),
        Box::new(Sums::new()),
        Box::new(Craps::new()),
        Box::new(Monobit::new()),
        Box::new(Runs::new()),
        Box::new(Serial::new()),
        Box::new(BitDistribution::new()),
        Box::new(MinimumDistance::new()),
        Box::new(Permutations::new()),
        Box::new(LaggedSums::new()),
        Box::new(KsUniformity::new()),
        Box::new(ByteDistribution::new()),
        Box::new(Dct::new()),
        Box::new(FillTree::new()),
        Box::new(Monobit2::new()),
    ]
}

#[cfg(test)]
pub(crate) mod testutil {
    use rngbattery_core::{Generator, GeneratorInfo, GeneratorKind, RandomSource, create_builtin};

    pub fn good(seed: u64) -> Generator {
        Generator::new(create_builtin("stdrng", seed).unwrap())
    }

    /// Always returns the same word.
    pub struct Constant {
        info: GeneratorInfo,
        value: u32,
    }

    impl RandomSource for Constant {
        fn info(&self) -> &GeneratorInfo {
            &self.info
        }
        fn next_uint(&mut self) -> u32 {
            self.value
        }
        fn reset(&mut self, _seed: u64) {}
    }

    pub fn constant(value: u32) -> Generator {
        Generator::new(Box::new(Constant {
            info: GeneratorInfo::new("constant", GeneratorKind::Builtin, 32),
            value,
        }))
    }
}
