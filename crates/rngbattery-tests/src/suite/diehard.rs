//! Marsaglia's Diehard tests (ids 0..100).

use rngbattery_core::Generator;

use super::{BatteryTest, TestInfo, TrialParams};
use crate::stats::{chisq_lumped, chisq_sf, gf2_rank_probability, normal_cdf, normal_two_sided, poisson_histogram_p};

fn fixed(id: u32, name: &'static str, description: &'static str, tsamples: u64, psamples: u32) -> TestInfo {
    TestInfo {
        id,
        name,
        description,
        tsamples,
        psamples,
        ntuple: 0,
        ntuple_range: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 0. Birthday spacings
// ═══════════════════════════════════════════════════════════════════════════════

/// Repeated spacings between 512 sorted 24-bit "birthdays".
///
/// The number of repeated spacings is Poisson with mean m³/(4n) = 2. Each
/// trial runs `tsamples` experiments and checks their histogram.
pub struct Birthdays {
    info: TestInfo,
}

impl Birthdays {
    const DAYS_BITS: u32 = 24;
    const BIRTHDAYS: usize = 512;
    const MAX_COUNT: usize = 10;

    pub fn new() -> Self {
        Self {
            info: fixed(
                0,
                "diehard_birthdays",
                "Birthday spacings: repeated gaps between 512 sorted 24-bit values",
                100,
                100,
            ),
        }
    }

    fn lambda() -> f64 {
        let m = Self::BIRTHDAYS as f64;
        m * m * m / (4.0 * (1u64 << Self::DAYS_BITS) as f64)
    }

    /// Repeated spacings among one set of birthdays.
    fn repeats(days: &mut [u32], spacings: &mut Vec<u32>) -> usize {
        days.sort_unstable();
        spacings.clear();
        spacings.push(days[0]);
        spacings.extend(days.windows(2).map(|w| w[1] - w[0]));
        spacings.sort_unstable();
        spacings.windows(2).filter(|w| w[0] == w[1]).count()
    }
}

impl BatteryTest for Birthdays {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let mut histogram = [0u64; Self::MAX_COUNT + 1];
        let mut days = vec![0u32; Self::BIRTHDAYS];
        let mut spacings = Vec::with_capacity(Self::BIRTHDAYS);
        for _ in 0..params.tsamples {
            for day in days.iter_mut() {
                *day = generator.next_bits(Self::DAYS_BITS);
            }
            let k = Self::repeats(&mut days, &mut spacings);
            histogram[k.min(Self::MAX_COUNT)] += 1;
        }
        poisson_histogram_p(&histogram, Self::lambda())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2, 3. Binary matrix rank
// ═══════════════════════════════════════════════════════════════════════════════

/// Rank over GF(2) of a matrix stored one row per word.
pub(crate) fn gf2_rank(rows: &mut [u32]) -> u32 {
    let mut rank = 0usize;
    for bit in (0..32).rev() {
        let mask = 1u32 << bit;
        let Some(pivot) = (rank..rows.len()).find(|&r| rows[r] & mask != 0) else {
            continue;
        };
        rows.swap(rank, pivot);
        let pivot_row = rows[rank];
        for (r, row) in rows.iter_mut().enumerate() {
            if r != rank && *row & mask != 0 {
                *row ^= pivot_row;
            }
        }
        rank += 1;
        if rank == rows.len() {
            break;
        }
    }
    rank as u32
}

/// Chi-square of observed ranks against the exact GF(2) rank distribution.
/// Ranks below `lowest` are lumped with it.
fn rank_p(counts: &[u64], rows: u32, cols: u32, lowest: u32) -> f64 {
    let full = rows.min(cols);
    let mut expected: Vec<f64> = (lowest..=full)
        .map(|r| gf2_rank_probability(rows, cols, r))
        .collect();
    let lumped: f64 = (0..lowest).map(|r| gf2_rank_probability(rows, cols, r)).sum();
    expected[0] += lumped;
    let total: u64 = counts.iter().sum();
    for e in expected.iter_mut() {
        *e *= total as f64;
    }
    let (stat, df) = chisq_lumped(counts, &expected);
    chisq_sf(stat, df)
}

/// Ranks of 32x32 binary matrices built from 32 consecutive words.
pub struct Rank32x32 {
    info: TestInfo,
}

impl Rank32x32 {
    pub fn new() -> Self {
        Self {
            info: fixed(
                2,
                "diehard_rank_32x32",
                "Binary rank of 32x32 matrices",
                40_000,
                100,
            ),
        }
    }
}

impl BatteryTest for Rank32x32 {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        // Bins: rank <= 29, 30, 31, 32.
        let mut counts = [0u64; 4];
        let mut rows = [0u32; 32];
        for _ in 0..params.tsamples {
            generator.fill_uints(&mut rows);
            let r = gf2_rank(&mut rows);
            counts[r.saturating_sub(29) as usize] += 1;
        }
        rank_p(&counts, 32, 32, 29)
    }
}

/// Ranks of 6x8 binary matrices, one byte per row.
pub struct Rank6x8 {
    info: TestInfo,
}

impl Rank6x8 {
    pub fn new() -> Self {
        Self {
            info: fixed(
                3,
                "diehard_rank_6x8",
                "Binary rank of 6x8 matrices",
                100_000,
                100,
            ),
        }
    }
}

impl BatteryTest for Rank6x8 {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        // Bins: rank <= 4, 5, 6.
        let mut counts = [0u64; 3];
        let mut rows = [0u32; 6];
        for _ in 0..params.tsamples {
            for row in rows.iter_mut() {
                *row = generator.next_bits(8);
            }
            let r = gf2_rank(&mut rows);
            counts[r.saturating_sub(4) as usize] += 1;
        }
        rank_p(&counts, 6, 8, 4)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 10. Parking lot
// ═══════════════════════════════════════════════════════════════════════════════

/// Park unit squares at random in a 100x100 lot; count how many fit.
///
/// For 12000 attempts the number parked is close to N(3523, 21.9).
pub struct ParkingLot {
    info: TestInfo,
}

impl ParkingLot {
    const SIDE: usize = 100;
    const ATTEMPTS: u64 = 12_000;
    const MEAN: f64 = 3523.0;
    const SIGMA: f64 = 21.9;

    pub fn new() -> Self {
        Self {
            info: fixed(
                10,
                "diehard_parking_lot",
                "Cars parked in a 100x100 lot after 12000 attempts",
                Self::ATTEMPTS,
                100,
            ),
        }
    }
}

impl BatteryTest for ParkingLot {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    /// The reference distribution is only known for 12000 attempts, so
    /// `tsamples` is ignored.
    fn trial(&self, generator: &mut Generator, _params: &TrialParams) -> f64 {
        let side = Self::SIDE;
        let mut grid: Vec<Vec<(f64, f64)>> = vec![Vec::new(); side * side];
        let mut parked = 0u64;
        for _ in 0..Self::ATTEMPTS {
            let x = generator.next_uniform() * side as f64;
            let y = generator.next_uniform() * side as f64;
            let (cx, cy) = (x as usize, y as usize);
            let crashed = (cx.saturating_sub(1)..=(cx + 1).min(side - 1)).any(|gx| {
                (cy.saturating_sub(1)..=(cy + 1).min(side - 1)).any(|gy| {
                    grid[gx * side + gy]
                        .iter()
                        .any(|&(px, py)| (px - x).abs() <= 1.0 && (py - y).abs() <= 1.0)
                })
            });
            if !crashed {
                grid[cx * side + cy].push((x, y));
                parked += 1;
            }
        }
        normal_two_sided((parked as f64 - Self::MEAN) / Self::SIGMA)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 11, 12. Minimum distance in 2d and 3d
// ═══════════════════════════════════════════════════════════════════════════════

/// Smallest pairwise distance among points, by sweeping along the first axis.
pub(crate) fn min_distance<const D: usize>(points: &mut [[f64; D]]) -> f64 {
    points.sort_by(|a, b| a[0].total_cmp(&b[0]));
    let mut best = f64::INFINITY;
    for i in 0..points.len() {
        for j in i + 1..points.len() {
            let dx = points[j][0] - points[i][0];
            if dx >= best {
                break;
            }
            let d2: f64 = (0..D).map(|k| (points[j][k] - points[i][k]).powi(2)).sum();
            best = best.min(d2.sqrt());
        }
    }
    best
}

/// 8000 points in a square of side 10000; the squared minimum distance is
/// exponential with mean 0.995.
pub struct Sphere2d {
    info: TestInfo,
}

impl Sphere2d {
    const POINTS: usize = 8000;
    const SIDE: f64 = 10_000.0;

    pub fn new() -> Self {
        Self {
            info: fixed(
                11,
                "diehard_2dsphere",
                "Minimum distance between 8000 random points in a square",
                Self::POINTS as u64,
                100,
            ),
        }
    }
}

impl BatteryTest for Sphere2d {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, _params: &TrialParams) -> f64 {
        let mut points: Vec<[f64; 2]> = (0..Self::POINTS)
            .map(|_| [generator.next_uniform() * Self::SIDE, generator.next_uniform() * Self::SIDE])
            .collect();
        let d = min_distance(&mut points);
        1.0 - (-d * d / 0.995).exp()
    }
}

/// 4000 points in a cube of side 1000; the cubed minimum distance is
/// exponential with mean 30.
pub struct Sphere3d {
    info: TestInfo,
}

impl Sphere3d {
    const POINTS: usize = 4000;
    const SIDE: f64 = 1000.0;

    pub fn new() -> Self {
        Self {
            info: fixed(
                12,
                "diehard_3dsphere",
                "Minimum distance between 4000 random points in a cube",
                Self::POINTS as u64,
                100,
            ),
        }
    }
}

impl BatteryTest for Sphere3d {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, _params: &TrialParams) -> f64 {
        let mut points: Vec<[f64; 3]> = (0..Self::POINTS)
            .map(|_| {
                [
                    generator.next_uniform() * Self::SIDE,
                    generator.next_uniform() * Self::SIDE,
                    generator.next_uniform() * Self::SIDE,
                ]
            })
            .collect();
        let r = min_distance(&mut points);
        1.0 - (-r * r * r / 30.0).exp()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 14. Sums (legacy)
// ═══════════════════════════════════════════════════════════════════════════════

/// Sum of `tsamples` uniforms against its normal approximation.
///
/// Kept for single runs only; the full battery leaves it out.
pub struct Sums {
    info: TestInfo,
}

impl Sums {
    pub fn new() -> Self {
        Self {
            info: fixed(14, "diehard_sums", "Sum of uniform deviates (legacy)", 100, 100),
        }
    }
}

impl BatteryTest for Sums {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let n = params.tsamples as f64;
        let sum: f64 = (0..params.tsamples).map(|_| generator.next_uniform()).sum();
        normal_cdf((sum - n / 2.0) / (n / 12.0).sqrt())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 16. Craps
// ═══════════════════════════════════════════════════════════════════════════════

/// Wins in `tsamples` games of craps; a game is won with probability 244/495.
pub struct Craps {
    info: TestInfo,
}

impl Craps {
    const P_WIN: f64 = 244.0 / 495.0;

    pub fn new() -> Self {
        Self {
            info: fixed(16, "diehard_craps", "Wins in games of craps", 200_000, 100),
        }
    }

    fn roll(generator: &mut Generator) -> u32 {
        generator.next_below(6) + generator.next_below(6) + 2
    }

    fn play(generator: &mut Generator) -> bool {
        match Self::roll(generator) {
            7 | 11 => true,
            2 | 3 | 12 => false,
            point => loop {
                match Self::roll(generator) {
                    7 => break false,
                    r if r == point => break true,
                    _ => {}
                }
            },
        }
    }
}

impl BatteryTest for Craps {
    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn trial(&self, generator: &mut Generator, params: &TrialParams) -> f64 {
        let n = params.tsamples as f64;
        let wins = (0..params.tsamples).filter(|_| Self::play(generator)).count() as f64;
        let sigma = (n * Self::P_WIN * (1.0 - Self::P_WIN)).sqrt();
        normal_two_sided((wins - n * Self::P_WIN) / sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testutil::{constant, good};

    fn params(tsamples: u64) -> TrialParams {
        TrialParams { tsamples, ntuple: 0 }
    }

    #[test]
    fn test_gf2_rank() {
        let mut identity: Vec<u32> = (0..32).map(|i| 1u32 << i).collect();
        assert_eq!(gf2_rank(&mut identity), 32);
        let mut dup = [0b1010u32, 0b1010, 0b0110];
        assert_eq!(gf2_rank(&mut dup), 2);
        let mut zeros = [0u32; 6];
        assert_eq!(gf2_rank(&mut zeros), 0);
        // Third row is the XOR of the first two.
        let mut dependent = [0xF0u32, 0x0F, 0xFF];
        assert_eq!(gf2_rank(&mut dependent), 2);
    }

    #[test]
    fn test_birthday_repeats() {
        let mut days = [10u32, 1, 4, 7];
        let mut spacings = Vec::new();
        // Sorted 1, 4, 7, 10: spacings 1, 3, 3, 3 -> two repeats.
        assert_eq!(Birthdays::repeats(&mut days, &mut spacings), 2);
        assert!((Birthdays::lambda() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_distance() {
        let mut pts = [[0.0, 0.0], [5.0, 5.0], [0.5, 0.0], [9.0, 1.0]];
        assert!((min_distance(&mut pts) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rank_constant_generator_fails() {
        let mut g = constant(0xDEAD_BEEF);
        assert!(Rank32x32::new().trial(&mut g, &params(200)) < 1e-6);
    }

    #[test]
    fn test_pvalues_in_range_for_good_generator() {
        let mut g = good(1);
        let tests: Vec<Box<dyn BatteryTest>> = vec![
            Box::new(Birthdays::new()),
            Box::new(Rank32x32::new()),
            Box::new(Rank6x8::new()),
            Box::new(Sums::new()),
            Box::new(Craps::new()),
        ];
        for t in &tests {
            let p = t.trial(&mut g, &params(200));
            assert!((0.0..=1.0).contains(&p), "{}: {p}", t.info().name);
        }
    }

    #[test]
    fn test_craps_constant_dice_fails() {
        // Zero words always roll snake eyes.
        let mut g = constant(0);
        assert!(Craps::new().trial(&mut g, &params(1000)) < 1e-6);
    }

    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_geometric_tests_good_generator() {
        let mut g = good(2);
        for t in [
            Box::new(ParkingLot::new()) as Box<dyn BatteryTest>,
            Box::new(Sphere2d::new()),
            Box::new(Sphere3d::new()),
        ] {
            let p = t.trial(&mut g, &params(t.info().tsamples));
            assert!(p > 1e-4 && p < 1.0, "{}: {p}", t.info().name);
        }
    }
}
