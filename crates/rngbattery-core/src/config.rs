//! Run configuration shared by the test catalog, the dispatcher and the CLI.
//!
//! A [`RunConfig`] is built once per invocation and passed by reference into
//! the battery. The only field the battery ever overwrites is `ntuple`, and it
//! does so through a scoped save/restore (see `rngbattery_tests::battery`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{BatteryError, Result};
use crate::generator::xor::MAX_XOR_MEMBERS;

/// Default p-value below which a test is reported as WEAK.
pub const DEFAULT_WEAK: f64 = 0.005;

/// Default p-value below which a test is reported as FAILED.
pub const DEFAULT_FAIL: f64 = 0.000_001;

// ---------------------------------------------------------------------------
// Goodness-of-fit statistic selection
// ---------------------------------------------------------------------------

/// Statistic used to reduce a vector of trial p-values to one p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum KsStatistic {
    /// Kolmogorov-Smirnov maximum deviation.
    #[default]
    Kolmogorov,
    /// Kuiper's V = D+ + D-, invariant under rotation of [0,1).
    Kuiper,
}

impl fmt::Display for KsStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kolmogorov => write!(f, "kolmogorov"),
            Self::Kuiper => write!(f, "kuiper"),
        }
    }
}

impl FromStr for KsStatistic {
    type Err = BatteryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "ks" | "kolmogorov" => Ok(Self::Kolmogorov),
            "1" | "kuiper" => Ok(Self::Kuiper),
            other => Err(BatteryError::InvalidConfig(format!(
                "unknown goodness-of-fit statistic '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Output field flags
// ---------------------------------------------------------------------------

/// Bitmask selecting which report fields are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TableFlags(u32);

impl TableFlags {
    pub const THEADER: u32 = 1;
    pub const TSHOW_RNG: u32 = 2;
    pub const TLINE_HEADER: u32 = 4;
    pub const TTEST_NAME: u32 = 8;
    pub const TNTUPLE: u32 = 16;
    pub const TTSAMPLES: u32 = 32;
    pub const TPSAMPLES: u32 = 64;
    pub const TPVALUES: u32 = 128;
    pub const TASSESSMENT: u32 = 256;
    pub const TPREFIX: u32 = 512;
    pub const TDESCRIPTION: u32 = 1024;
    pub const THISTOGRAM: u32 = 2048;
    pub const TSEED: u32 = 4096;
    pub const TRATE: u32 = 8192;
    pub const TNUM: u32 = 16384;
    pub const TNO_WHITE: u32 = 32768;
    pub const TDBLRATE: u32 = 65536;
    pub const TALL: u32 = Self::TDBLRATE * 2 - 1;

    /// Field names in bit order; index `i` names bit `1 << i`.
    pub const FIELD_NAMES: [&'static str; 17] = [
        "header",
        "show_rng",
        "line_header",
        "test_name",
        "ntuple",
        "tsamples",
        "psamples",
        "pvalues",
        "assessment",
        "prefix",
        "description",
        "histogram",
        "seed",
        "rate",
        "num",
        "no_white",
        "dblrate",
    ];

    /// Flags used when none (or `0`) are requested.
    pub const fn standard() -> Self {
        Self(
            Self::THEADER
                | Self::TSHOW_RNG
                | Self::TLINE_HEADER
                | Self::TTEST_NAME
                | Self::TNTUPLE
                | Self::TTSAMPLES
                | Self::TPSAMPLES
                | Self::TPVALUES
                | Self::TASSESSMENT
                | Self::TSEED,
        )
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::TALL)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn insert(&mut self, flag: u32) {
        self.0 |= flag & Self::TALL;
    }

    /// Accumulate a list of `-T` arguments, each numeric or a field name.
    ///
    /// An empty list, or an accumulated value of zero, yields [`TableFlags::standard`].
    pub fn parse_all<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let mut flags = Self(0);
        for item in items {
            flags.insert(Self::parse_one(item.as_ref())?);
        }
        if flags.0 == 0 {
            return Ok(Self::standard());
        }
        Ok(flags)
    }

    fn parse_one(item: &str) -> Result<u32> {
        let item = item.trim();
        if let Ok(n) = item.parse::<u32>() {
            return Ok(n & Self::TALL);
        }
        let lower = item.to_ascii_lowercase();
        match lower.as_str() {
            "default" => Ok(0),
            "all" => Ok(Self::TALL),
            name => Self::FIELD_NAMES
                .iter()
                .position(|f| *f == name)
                .map(|i| 1u32 << i)
                .ok_or_else(|| BatteryError::InvalidConfig(format!("unknown output field '{item}'"))),
        }
    }
}

impl Default for TableFlags {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Generator selection
// ---------------------------------------------------------------------------

/// One generator named on the command line, with an optional fixed seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorSpec {
    pub name: String,
    pub seed: Option<u64>,
}

impl GeneratorSpec {
    pub fn new(name: impl Into<String>, seed: Option<u64>) -> Self {
        Self {
            name: name.into(),
            seed,
        }
    }
}

impl FromStr for GeneratorSpec {
    type Err = BatteryError;

    /// Parse `name` or `name:seed`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((name, seed)) => {
                let seed = seed.trim().parse::<u64>().map_err(|_| {
                    BatteryError::InvalidConfig(format!("bad seed '{seed}' for generator '{name}'"))
                })?;
                Ok(Self::new(name.trim(), Some(seed)))
            }
            None => Ok(Self::new(s.trim(), None)),
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything one battery run needs to know.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// Generators to test. More than one becomes an XOR composite.
    pub generators: Vec<GeneratorSpec>,
    /// Raw binary file to read instead of (or XOR'd with) builtin generators.
    pub input_file: Option<PathBuf>,
    /// Fixed seed applied before every test; `None` draws a fresh OS seed per test.
    pub seed: Option<u64>,
    /// Values consumed per trial; `None` uses each test's default.
    pub tsamples: Option<u64>,
    /// Trials per test; `None` uses each test's default scaled by `multiply_p`.
    pub psamples: Option<u32>,
    /// Multiplier for default psamples.
    pub multiply_p: f64,
    /// ntuple/lag/dimension override, 0 = unset.
    pub ntuple: u32,
    pub ks_test: KsStatistic,
    pub tflag: TableFlags,
    pub separator: char,
    pub weak_threshold: f64,
    pub fail_threshold: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            generators: vec![GeneratorSpec::new("stdrng", None)],
            input_file: None,
            seed: None,
            tsamples: None,
            psamples: None,
            multiply_p: 1.0,
            ntuple: 0,
            ks_test: KsStatistic::default(),
            tflag: TableFlags::standard(),
            separator: ' ',
            weak_threshold: DEFAULT_WEAK,
            fail_threshold: DEFAULT_FAIL,
        }
    }
}

impl RunConfig {
    /// Check every field before any generator is built or test executed.
    pub fn validate(&self) -> Result<()> {
        let sources = self.generators.len() + usize::from(self.input_file.is_some());
        if sources == 0 {
            return Err(BatteryError::NoGenerators);
        }
        if sources > MAX_XOR_MEMBERS {
            return Err(BatteryError::TooManyGenerators {
                count: sources,
                max: MAX_XOR_MEMBERS,
            });
        }
        if self.tsamples == Some(0) {
            return Err(BatteryError::InvalidConfig("tsamples must be positive".into()));
        }
        if self.psamples == Some(0) {
            return Err(BatteryError::InvalidConfig("psamples must be positive".into()));
        }
        if !(self.multiply_p.is_finite() && self.multiply_p > 0.0) {
            return Err(BatteryError::InvalidConfig(format!(
                "psample multiplier must be positive, got {}",
                self.multiply_p
            )));
        }
        if !(0.0 < self.fail_threshold
            && self.fail_threshold <= self.weak_threshold
            && self.weak_threshold < 0.5)
        {
            return Err(BatteryError::InvalidConfig(format!(
                "thresholds must satisfy 0 < fail ({}) <= weak ({}) < 0.5",
                self.fail_threshold, self.weak_threshold
            )));
        }
        Ok(())
    }

    /// Trials to run for a test whose own default is `default`.
    pub fn psamples_for(&self, default: u32) -> u32 {
        match self.psamples {
            Some(p) => p,
            None => ((default as f64 * self.multiply_p).round() as u32).max(1),
        }
    }

    /// Values per trial for a test whose own default is `default`.
    pub fn tsamples_for(&self, default: u64) -> u64 {
        self.tsamples.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_no_generators() {
        let cfg = RunConfig {
            generators: Vec::new(),
            ..RunConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(BatteryError::NoGenerators)));
    }

    #[test]
    fn test_validate_rejects_too_many_generators() {
        let cfg = RunConfig {
            generators: (0..101).map(|i| GeneratorSpec::new("stdrng", Some(i))).collect(),
            ..RunConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(BatteryError::TooManyGenerators { count: 101, max: 100 })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_samples() {
        let cfg = RunConfig {
            psamples: Some(0),
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = RunConfig {
            tsamples: Some(0),
            ..RunConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_any_ntuple() {
        // Tests fall back to a sweep or their default for values they cannot use.
        for ntuple in [0, 33, 1000, u32::MAX] {
            let cfg = RunConfig {
                ntuple,
                ..RunConfig::default()
            };
            assert!(cfg.validate().is_ok(), "ntuple {ntuple}");
        }
    }

    #[test]
    fn test_psamples_scaling() {
        let cfg = RunConfig {
            multiply_p: 2.5,
            ..RunConfig::default()
        };
        assert_eq!(cfg.psamples_for(100), 250);
        let cfg = RunConfig {
            psamples: Some(7),
            multiply_p: 2.5,
            ..RunConfig::default()
        };
        assert_eq!(cfg.psamples_for(100), 7);
    }

    #[test]
    fn test_table_flags_parse() {
        let flags = TableFlags::parse_all(&["no_white", "1"]).unwrap();
        assert!(flags.contains(TableFlags::TNO_WHITE));
        assert!(flags.contains(TableFlags::THEADER));
        assert!(!flags.contains(TableFlags::TSEED));

        let empty: [&str; 0] = [];
        assert_eq!(TableFlags::parse_all(&empty).unwrap(), TableFlags::standard());
        assert_eq!(TableFlags::parse_all(&["0"]).unwrap(), TableFlags::standard());
        assert_eq!(TableFlags::parse_all(&["all"]).unwrap().bits(), 131_071);
        assert!(TableFlags::parse_all(&["bogus"]).is_err());
    }

    #[test]
    fn test_field_names_match_bits() {
        assert_eq!(TableFlags::parse_all(&["no_white"]).unwrap().bits(), TableFlags::TNO_WHITE);
        assert_eq!(TableFlags::parse_all(&["dblrate"]).unwrap().bits(), TableFlags::TDBLRATE);
    }

    #[test]
    fn test_generator_spec_parse() {
        let g: GeneratorSpec = "randu:42".parse().unwrap();
        assert_eq!(g, GeneratorSpec::new("randu", Some(42)));
        let g: GeneratorSpec = "stdrng".parse().unwrap();
        assert_eq!(g.seed, None);
        assert!("randu:x".parse::<GeneratorSpec>().is_err());
    }

    #[test]
    fn test_ks_statistic_parse() {
        assert_eq!("kuiper".parse::<KsStatistic>().unwrap(), KsStatistic::Kuiper);
        assert_eq!("0".parse::<KsStatistic>().unwrap(), KsStatistic::Kolmogorov);
        assert!("anderson".parse::<KsStatistic>().is_err());
    }
}
