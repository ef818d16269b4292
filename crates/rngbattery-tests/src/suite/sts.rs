//! NIST STS tests (ids 100..200).
//!
//! Each trial reads `tsamples` full 32-bit words as one bitstream.

use rngbattery_core::Generator;
use statrs::function::erf::erfc;

use super::{BatteryTest, TestInfo, TrialParams};
use crate::stats::chisq_sf;

fn read_words(generator: &mut Generator, tsamples: u64) -> Vec<u32> {
    let mut words = vec![0u32; tsamples as usize];
    generator.fill_uints(&mut words);
    words
}

// ═══════════════════════════════════════════════════════════════════════════════
// 100. Monobit
// ═══════════════════════════════════════════════════════════════════════════════

/// Proportion of ones in the stream should be 1/2.
pub struct Monobit {
    info: TestInfo,
}

impl Monobit {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 100,
                name: "sts_monobit",
                description: "Count of ones against n/2",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: None,
            },
        }
    }
}

impl BatteryTest for Monobit {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let n = params.tsamples * 32;
        let ones: u64 = (0..params.tsamples)
            .map(|_| generator.next_u32().count_ones() as u64)
            .sum();
        let s = 2 * ones as i64 - n as i64;
        let s_obs = (s as f64).abs() / (n as f64).sqrt();
        erfc(s_obs / std::f64::consts::SQRT_2)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 101. Runs
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of uninterrupted runs of identical bits.
pub struct Runs {
    info: TestInfo,
}

impl Runs {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 101,
                name: "sts_runs",
                description: "Runs of identical bits",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: None,
            },
        }
    }

    fn runs_p(words: &[u32]) -> f64 {
        let n = words.len() as f64 * 32.0;
        let ones: u64 = words.iter().map(|w| w.count_ones() as u64).sum();
        let prop = ones as f64 / n;
        // Frequency pre-test.
        if (prop - 0.5).abs() >= 2.0 / n.sqrt() {
            return 0.0;
        }
        // Transitions inside each word plus across word boundaries.
        let mut runs = 1u64;
        for (i, &w) in words.iter().enumerate() {
            runs += ((w ^ (w >> 1)) & 0x7FFF_FFFF).count_ones() as u64;
            if let Some(&next) = words.get(i + 1) {
                runs += ((w & 1) ^ (next >> 31)) as u64;
            }
        }
        let expected = 2.0 * n * prop * (1.0 - prop);
        let z = (runs as f64 - expected).abs() / (2.0 * (2.0 * n).sqrt() * prop * (1.0 - prop));
        erfc(z / std::f64::consts::SQRT_2)
    }
}

impl BatteryTest for Runs {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        Self::runs_p(&read_words(generator, params.tsamples))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 102. Serial
// ═══════════════════════════════════════════════════════════════════════════════

/// Frequencies of all overlapping `ntuple`-bit patterns (cyclic).
pub struct Serial {
    info: TestInfo,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 102,
                name: "sts_serial",
                description: "Overlapping m-bit pattern frequencies",
                tsamples: 10_000,
                psamples: 100,
                ntuple: 4,
                ntuple_range: Some(2..=16),
            },
        }
    }

    /// psi-squared statistic for overlapping `m`-bit patterns.
    fn psi_sq(words: &[u32], m: u32) -> f64 {
        if m == 0 {
            return 0.0;
        }
        let n = words.len() * 32;
        let num_patterns = 1usize << m;
        let mask = num_patterns - 1;
        let mut counts = vec![0u64; num_patterns];
        let bit = |i: usize| ((words[(i % n) / 32] >> (31 - (i % 32))) & 1) as usize;
        let mut val = (0..m as usize - 1).fold(0usize, |acc, j| (acc << 1) | bit(j));
        for i in 0..n {
            val = ((val << 1) | bit(i + m as usize - 1)) & mask;
            counts[val] += 1;
        }
        let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
        sum_sq * num_patterns as f64 / n as f64 - n as f64
    }
}

impl BatteryTest for Serial {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let m = params.ntuple.clamp(2, 16);
        let words = read_words(generator, params.tsamples);
        let delta1 = Self::psi_sq(&words, m) - Self::psi_sq(&words, m - 1);
        chisq_sf(delta1, (1u64 << (m - 1)) as f64)
    }
}
