//! Run-level summary: mean and standard deviation of every final p-value a
//! battery run produced, and the footer that reports them.

use std::io::{self, Write};

use rngbattery_core::TableFlags;
use serde::Serialize;

/// Rule line framing headers in every report.
pub const RULE: &str = "#=============================================================================#";

/// Final p-values in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    values: Vec<f64>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Arithmetic mean; 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Sample standard deviation (divisor n - 1); 0.0 for fewer than two values.
    pub fn stddev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ss: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    }

    /// Write the mean/stddev footer and flush.
    pub fn write_footer<W: Write>(&self, out: &mut W, flags: TableFlags, separator: char) -> io::Result<()> {
        let sep = separator;
        let (mean, sd) = (self.mean(), self.stddev());
        writeln!(out, "{RULE}")?;
        if flags.contains(TableFlags::TNO_WHITE) {
            writeln!(out, "#mean{sep}stddev{sep}")?;
        } else {
            writeln!(out, "#   mean  {sep}  stddev {sep}  error-rate (best = 0.0, worst = 0.5)")?;
        }
        writeln!(out, "{RULE}")?;
        if flags.contains(TableFlags::TNO_WHITE) {
            write!(out, "{mean:.6}{sep}{sd:.6}{sep}")?;
        } else {
            write!(out, "{mean:.6}  {sep}{sd:.6}  {sep}")?;
        }
        writeln!(out)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_of(values: &[f64]) -> RunSummary {
        let mut s = RunSummary::new();
        for &v in values {
            s.push(v);
        }
        s
    }

    fn footer(s: &RunSummary, flags: TableFlags, sep: char) -> String {
        let mut out = Vec::new();
        s.write_footer(&mut out, flags, sep).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_mean_and_stddev() {
        let s = summary_of(&[0.2, 0.4, 0.6]);
        assert!((s.mean() - 0.4).abs() < 1e-12);
        assert!((s.stddev() - 0.2).abs() < 1e-12);
        assert_eq!(s.count(), 3);
    }

    #[test]
    fn test_degenerate_counts() {
        let empty = RunSummary::new();
        assert_eq!(empty.mean(), 0.0);
        assert_eq!(empty.stddev(), 0.0);
        let one = summary_of(&[0.7]);
        assert_eq!(one.mean(), 0.7);
        assert_eq!(one.stddev(), 0.0);
    }

    #[test]
    fn test_footer_standard() {
        let s = summary_of(&[0.2, 0.4, 0.6]);
        let text = footer(&s, TableFlags::standard(), '|');
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], RULE);
        assert_eq!(lines[1], "#   mean  |  stddev |  error-rate (best = 0.0, worst = 0.5)");
        assert_eq!(lines[2], RULE);
        assert_eq!(lines[3], "0.400000  |0.200000  |");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_footer_no_white() {
        let s = summary_of(&[0.5, 0.5]);
        let text = footer(&s, TableFlags::from_bits(TableFlags::TNO_WHITE), ',');
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "#mean,stddev,");
        assert_eq!(lines[3], "0.500000,0.000000,");
    }
}
