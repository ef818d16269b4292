//! Reduce a vector of trial p-values to one p-value.
//!
//! Under the null hypothesis trial p-values are uniform on [0, 1), so a
//! goodness-of-fit test against the uniform CDF measures how plausible the
//! whole vector is. Kolmogorov-Smirnov is the default; Kuiper's variant is
//! equally sensitive at both ends of the interval.

use rngbattery_core::KsStatistic;

/// Terms summed in the asymptotic series.
const SERIES_TERMS: i32 = 100;

/// Final p-value for a set of trial p-values.
///
/// A single value passes through unchanged; an empty set gives NaN.
pub fn aggregate(pvalues: &[f64], statistic: KsStatistic) -> f64 {
    match pvalues.len() {
        0 => f64::NAN,
        1 => pvalues[0],
        n => {
            let sorted = sorted_copy(pvalues);
            match statistic {
                KsStatistic::Kolmogorov => kolmogorov_p(kolmogorov_statistic(&sorted), n),
                KsStatistic::Kuiper => kuiper_p(kuiper_statistic(&sorted), n),
            }
        }
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// One-sided deviations `(d+, d-)` of the empirical CDF of sorted values.
fn deviations(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len() as f64;
    let mut d_plus = 0.0f64;
    let mut d_minus = 0.0f64;
    for (i, &x) in sorted.iter().enumerate() {
        d_plus = d_plus.max((i + 1) as f64 / n - x);
        d_minus = d_minus.max(x - i as f64 / n);
    }
    (d_plus, d_minus)
}

/// Kolmogorov D = max(d+, d-) of ascending-sorted values.
pub fn kolmogorov_statistic(sorted: &[f64]) -> f64 {
    let (d_plus, d_minus) = deviations(sorted);
    d_plus.max(d_minus)
}

/// Kuiper V = d+ + d- of ascending-sorted values.
pub fn kuiper_statistic(sorted: &[f64]) -> f64 {
    let (d_plus, d_minus) = deviations(sorted);
    d_plus + d_minus
}

/// Asymptotic Kolmogorov p-value for statistic `d` over `n` samples.
pub fn kolmogorov_p(d: f64, n: usize) -> f64 {
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    // Below 0.2 the tail equals 1 to double precision, and the series
    // is still far from converged after SERIES_TERMS terms.
    if lambda < 0.2 {
        return 1.0;
    }
    let mut p = 0.0;
    for k in 1..=SERIES_TERMS {
        let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
        p += sign * (-2.0 * (k as f64 * lambda).powi(2)).exp();
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// Asymptotic Kuiper p-value for statistic `v` over `n` samples.
pub fn kuiper_p(v: f64, n: usize) -> f64 {
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.155 + 0.24 / sqrt_n) * v;
    // The series does not converge for small lambda; the tail is 1 there.
    if lambda < 0.4 {
        return 1.0;
    }
    let mut p = 0.0;
    for k in 1..=SERIES_TERMS {
        let k2l2 = (k as f64 * lambda).powi(2);
        p += (4.0 * k2l2 - 1.0) * (-2.0 * k2l2).exp();
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// KS p-value of `values` against the uniform distribution on [0, 1).
pub fn uniformity_p(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted_copy(values);
    kolmogorov_p(kolmogorov_statistic(&sorted), sorted.len())
}
