//! Distribution helpers shared by the tests.
//!
//! Every helper returns a p-value that is uniform on [0, 1] under the null
//! hypothesis, so trial results can be fed straight into the aggregator.

use statrs::distribution::{ChiSquared, ContinuousCDF, Discrete, Poisson};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Upper tail of a chi-square with `df` degrees of freedom.
///
/// Degenerate inputs (no degrees of freedom, non-finite statistic) give 1.0 or 0.0.
pub fn chisq_sf(statistic: f64, df: f64) -> f64 {
    if statistic.is_nan() {
        return 0.0;
    }
    ChiSquared::new(df).map_or(1.0, |dist| dist.sf(statistic))
}

/// Two-sided normal tail, `P(|Z| >= |z|)`.
pub fn normal_two_sided(z: f64) -> f64 {
    erfc(z.abs() / SQRT_2)
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Pearson chi-square of `observed` against `expected`, with adjacent bins
/// merged until each group expects at least [`MIN_EXPECTED`] counts.
///
/// Returns `(statistic, degrees_of_freedom)`.
pub fn chisq_lumped(observed: &[u64], expected: &[f64]) -> (f64, f64) {
    let mut groups: Vec<(f64, f64)> = Vec::new();
    let mut obs = 0.0;
    let mut exp = 0.0;
    for (&o, &e) in observed.iter().zip(expected) {
        obs += o as f64;
        exp += e;
        if exp >= MIN_EXPECTED {
            groups.push((obs, exp));
            obs = 0.0;
            exp = 0.0;
        }
    }
    if exp > 0.0 || obs > 0.0 {
        match groups.last_mut() {
            Some(last) => {
                last.0 += obs;
                last.1 += exp;
            }
            None => groups.push((obs, exp)),
        }
    }
    let statistic = groups
        .iter()
        .filter(|(_, e)| *e > 0.0)
        .map(|(o, e)| (o - e) * (o - e) / e)
        .sum();
    (statistic, groups.len().saturating_sub(1) as f64)
}

/// Smallest expected count kept in its own bin by [`chisq_lumped`].
pub const MIN_EXPECTED: f64 = 5.0;

/// Chi-square p-value of a histogram of counts against Poisson(`lambda`).
///
/// Bin `k` holds the number of trials that observed `k` events; the last bin
/// collects the whole upper tail.
pub fn poisson_histogram_p(histogram: &[u64], lambda: f64) -> f64 {
    let Ok(dist) = Poisson::new(lambda) else {
        return 0.0;
    };
    let total: u64 = histogram.iter().sum();
    if total == 0 || histogram.is_empty() {
        return 1.0;
    }
    let last = histogram.len() - 1;
    let mut expected: Vec<f64> = (0..last).map(|k| dist.pmf(k as u64) * total as f64).collect();
    let head: f64 = expected.iter().sum();
    expected.push((total as f64 - head).max(0.0));
    let (stat, df) = chisq_lumped(histogram, &expected);
    chisq_sf(stat, df)
}

/// Probability that a random `rows` x `cols` matrix over GF(2) has rank `r`.
pub fn gf2_rank_probability(rows: u32, cols: u32, r: u32) -> f64 {
    if r > rows.min(cols) {
        return 0.0;
    }
    let (m, n, r) = (rows as f64, cols as f64, r as f64);
    let mut p = 2f64.powf(r * (m + n - r) - m * n);
    for i in 0..r as i32 {
        let i = i as f64;
        p *= (1.0 - 2f64.powf(i - m)) * (1.0 - 2f64.powf(i - n)) / (1.0 - 2f64.powf(i - r));
    }
    p
}

/// Volume of the unit ball in `d` dimensions.
pub fn unit_ball_volume(d: u32) -> f64 {
    use std::f64::consts::PI;
    match d {
        0 => 1.0,
        1 => 2.0,
        _ => unit_ball_volume(d - 2) * 2.0 * PI / d as f64,
    }
}
