//! Extended tests (ids 200..300): ntuple-parameterised distribution tests
//! and a few structural probes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rngbattery_core::Generator;
use rngbattery_core::bits::get_bit_ntuple;
use rustfft::{FftPlanner, num_complex::Complex};
use statrs::distribution::{Binomial, Discrete};

use super::{BatteryTest, TestInfo, TrialParams};
use crate::aggregate::uniformity_p;
use crate::stats::{chisq_lumped, chisq_sf, normal_cdf, normal_two_sided, unit_ball_volume};

/// Chi-square p-value of `counts` against equal expected counts.
fn uniform_counts_p(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    let expected = vec![total as f64 / counts.len() as f64; counts.len()];
    let (stat, df) = chisq_lumped(counts, &expected);
    chisq_sf(stat, df)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 200. Bit distribution
// ═══════════════════════════════════════════════════════════════════════════════

/// Frequencies of non-overlapping `ntuple`-bit values in the bitstream.
pub struct BitDistribution {
    info: TestInfo,
}

impl BitDistribution {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 200,
                name: "rgb_bitdist",
                description: "Distribution of n-bit patterns",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 8,
                ntuple_range: Some(1..=16),
            },
        }
    }
}

impl BatteryTest for BitDistribution {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let n = params.ntuple.clamp(1, 16);
        let nwords = (params.tsamples * n as u64).div_ceil(32) as usize;
        let mut words = vec![0u32; nwords];
        generator.fill_uints(&mut words);

        let mut counts = vec![0u64; 1 << n];
        for k in 0..params.tsamples {
            counts[get_bit_ntuple(&words, nwords, n, k * n as u64) as usize] += 1;
        }
        uniform_counts_p(&counts)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 201. Minimum distance
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum distance between `tsamples` points in the unit `ntuple`-torus.
///
/// With N = n(n-1)/2 pairs, `1 - exp(-N V_d r^d)` is uniform for the
/// observed minimum distance r.
pub struct MinimumDistance {
    info: TestInfo,
}

impl MinimumDistance {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 201,
                name: "rgb_minimum_distance",
                description: "Minimum distance between points in a d-dimensional torus",
                tsamples: 1000,
                psamples: 100,
                ntuple: 5,
                ntuple_range: Some(2..=5),
            },
        }
    }

    fn torus_distance_sq(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| {
                let d = (x - y).abs();
                let d = d.min(1.0 - d);
                d * d
            })
            .sum()
    }
}

impl BatteryTest for MinimumDistance {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let d = params.ntuple.clamp(2, 5) as usize;
        let n = params.tsamples.max(2) as usize;
        let coords: Vec<f64> = (0..n * d).map(|_| generator.next_uniform()).collect();
        let points: Vec<&[f64]> = coords.chunks_exact(d).collect();

        let mut min_sq = f64::INFINITY;
        for i in 0..n {
            for j in i + 1..n {
                min_sq = min_sq.min(Self::torus_distance_sq(points[i], points[j]));
            }
        }
        let pairs = (n * (n - 1) / 2) as f64;
        let r = min_sq.sqrt();
        1.0 - (-pairs * unit_ball_volume(d as u32) * r.powi(d as i32)).exp()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 202. Permutations
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordinal patterns of non-overlapping `ntuple`-tuples; all k! orders are
/// equally likely.
pub struct Permutations {
    info: TestInfo,
}

impl Permutations {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 202,
                name: "rgb_permutations",
                description: "Ordering of consecutive k-tuples",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 5,
                ntuple_range: Some(2..=8),
            },
        }
    }

    /// Lehmer-code index of the ordinal pattern of `window` in `0..k!`.
    fn pattern_index(window: &[u32]) -> usize {
        let k = window.len();
        let mut index = 0usize;
        for i in 0..k {
            let smaller = window[i + 1..].iter().filter(|&&v| v < window[i]).count();
            index = index * (k - i) + smaller;
        }
        index
    }
}

impl BatteryTest for Permutations {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let k = params.ntuple.clamp(2, 8) as usize;
        let factorial: usize = (1..=k).product();
        let mut counts = vec![0u64; factorial];
        let mut window = vec![0u32; k];
        for _ in 0..params.tsamples {
            for v in window.iter_mut() {
                *v = generator.next_uint();
            }
            counts[Self::pattern_index(&window)] += 1;
        }
        uniform_counts_p(&counts)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 203. Lagged sums
// ═══════════════════════════════════════════════════════════════════════════════

/// Sum of `tsamples` uniforms taken `ntuple` draws apart (lag 0 = consecutive).
pub struct LaggedSums {
    info: TestInfo,
}

impl LaggedSums {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 203,
                name: "rgb_lagged_sum",
                description: "Sum of uniforms separated by a lag",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: Some(0..=32),
            },
        }
    }
}

impl BatteryTest for LaggedSums {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let lag = params.ntuple.min(32);
        let mut sum = 0.0;
        for _ in 0..params.tsamples {
            for _ in 0..lag {
                generator.next_uint();
            }
            sum += generator.next_uniform();
        }
        let n = params.tsamples as f64;
        normal_cdf((sum - n / 2.0) / (n / 12.0).sqrt())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 204. KS uniformity
// ═══════════════════════════════════════════════════════════════════════════════

/// Kolmogorov-Smirnov test of `tsamples` uniform deviates.
pub struct KsUniformity {
    info: TestInfo,
}

impl KsUniformity {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 204,
                name: "rgb_kstest_test",
                description: "KS test of uniform deviates",
                tsamples: 10_000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: None,
            },
        }
    }
}

impl BatteryTest for KsUniformity {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let values: Vec<f64> = (0..params.tsamples).map(|_| generator.next_uniform()).collect();
        uniformity_p(&values)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 205. Byte distribution
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte values in each of the four lanes of a word (4 x 256 bins).
pub struct ByteDistribution {
    info: TestInfo,
}

impl ByteDistribution {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 205,
                name: "dab_bytedistrib",
                description: "Byte value distribution per byte lane",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: None,
            },
        }
    }
}

impl BatteryTest for ByteDistribution {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let mut hist = [[0u64; 256]; 4];
        for _ in 0..params.tsamples {
            let bytes = generator.next_u32().to_be_bytes();
            for (lane, &b) in bytes.iter().enumerate() {
                hist[lane][b as usize] += 1;
            }
        }
        let expected = params.tsamples as f64 / 256.0;
        let chi2: f64 = hist
            .iter()
            .flatten()
            .map(|&c| {
                let diff = c as f64 - expected;
                diff * diff / expected
            })
            .sum();
        chisq_sf(chi2, 4.0 * 255.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 206. DCT
// ═══════════════════════════════════════════════════════════════════════════════

/// Position of the largest coefficient of an orthonormal DCT-II over 256
/// centred uniforms; every position is equally likely.
pub struct Dct {
    info: TestInfo,
}

impl Dct {
    const LEN: usize = 256;

    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 206,
                name: "dab_dct",
                description: "Position of the largest DCT coefficient",
                tsamples: 5000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: None,
            },
        }
    }

    /// Orthonormal DCT-II via a 2N-point FFT of the even extension.
    fn transform(
        input: &[f64],
        fft: &dyn rustfft::Fft<f64>,
        buffer: &mut Vec<Complex<f64>>,
    ) -> Vec<f64> {
        let n = input.len();
        buffer.clear();
        buffer.extend(input.iter().map(|&x| Complex { re: x, im: 0.0 }));
        buffer.extend(input.iter().rev().map(|&x| Complex { re: x, im: 0.0 }));
        fft.process(buffer);
        (0..n)
            .map(|k| {
                let angle = -std::f64::consts::PI * k as f64 / (2.0 * n as f64);
                let twiddle = Complex::new(angle.cos(), angle.sin());
                let scale = if k == 0 { (1.0 / n as f64).sqrt() } else { (2.0 / n as f64).sqrt() };
                0.5 * (twiddle * buffer[k]).re * scale
            })
            .collect()
    }
}

impl BatteryTest for Dct {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let fft = FftPlanner::new().plan_fft_forward(2 * Self::LEN);
        let mut buffer = Vec::with_capacity(2 * Self::LEN);
        let mut input = vec![0.0; Self::LEN];
        let mut counts = vec![0u64; Self::LEN];
        for _ in 0..params.tsamples {
            for x in input.iter_mut() {
                *x = generator.next_uniform() - 0.5;
            }
            let coeffs = Self::transform(&input, fft.as_ref(), &mut buffer);
            let peak = coeffs
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                .map_or(0, |(i, _)| i);
            counts[peak] += 1;
        }
        uniform_counts_p(&counts)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 207. Fill tree
// ═══════════════════════════════════════════════════════════════════════════════

/// Uniforms inserted into a depth-5 binary search tree until one falls off
/// the bottom; the mean fill count is compared with the same experiment
/// driven by a reference generator.
///
/// The reference sample shares the trial's noise, so trial p-values are not
/// independent and the battery does not schedule this test.
pub struct FillTree {
    info: TestInfo,
}

impl FillTree {
    const NODES: usize = 31;

    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 207,
                name: "dab_filltree",
                description: "Inserts until a binary tree overflows",
                tsamples: 15_000,
                psamples: 100,
                ntuple: 0,
                ntuple_range: None,
            },
        }
    }

    fn fill(mut next: impl FnMut() -> f64) -> u32 {
        let mut tree = [f64::NAN; Self::NODES];
        let mut inserted = 0;
        loop {
            let v = next();
            let mut i = 0;
            loop {
                if i >= Self::NODES {
                    return inserted;
                }
                if tree[i].is_nan() {
                    tree[i] = v;
                    inserted += 1;
                    break;
                }
                i = if v < tree[i] { 2 * i + 1 } else { 2 * i + 2 };
            }
        }
    }

    fn mean_var(samples: &[f64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, var)
    }
}

impl BatteryTest for FillTree {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let trees = params.tsamples.max(2) as usize;
        let mut reference = StdRng::seed_from_u64(u64::from(generator.next_u32()));
        let observed: Vec<f64> = (0..trees)
            .map(|_| Self::fill(|| generator.next_uniform()) as f64)
            .collect();
        let baseline: Vec<f64> = (0..trees)
            .map(|_| Self::fill(|| reference.random::<f64>()) as f64)
            .collect();
        let (m1, v1) = Self::mean_var(&observed);
        let (m2, v2) = Self::mean_var(&baseline);
        let se = ((v1 + v2) / trees as f64).sqrt();
        if se == 0.0 {
            return if m1 == m2 { 1.0 } else { 0.0 };
        }
        normal_two_sided((m1 - m2) / se)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 208. Monobit 2
// ═══════════════════════════════════════════════════════════════════════════════

/// Ones per block of `ntuple` words against Binomial(32 * ntuple, 1/2).
pub struct Monobit2 {
    info: TestInfo,
}

impl Monobit2 {
    pub fn new() -> Self {
        Self {
            info: TestInfo {
                id: 208,
                name: "dab_monobit2",
                description: "Block monobit test",
                tsamples: 100_000,
                psamples: 100,
                ntuple: 2,
                ntuple_range: Some(1..=32),
            },
        }
    }
}

impl BatteryTest for Monobit2 {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let words = params.ntuple.clamp(1, 32) as u64;
        let bits = 32 * words;
        let mut counts = vec![0u64; bits as usize + 1];
        for _ in 0..params.tsamples {
            let ones: u32 = (0..words).map(|_| generator.next_u32().count_ones()).sum();
            counts[ones as usize] += 1;
        }
        let Ok(dist) = Binomial::new(0.5, bits) else {
            return 0.0;
        };
        let expected: Vec<f64> = (0..=bits)
            .map(|k| dist.pmf(k) * params.tsamples as f64)
            .collect();
        let (stat, df) = chisq_lumped(&counts, &expected);
        chisq_sf(stat, df)
    }
}
