//! Error types for generator construction, configuration and test execution.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the rngbattery crates.
pub type Result<T> = std::result::Result<T, BatteryError>;

/// Errors raised while configuring or running a battery.
///
/// Configuration variants are reported before any test runs. `Io` and
/// `Allocation` are localized to the test that hit them.
#[derive(Error, Debug)]
pub enum BatteryError {
    /// No builtin generator is registered under this name.
    #[error("unknown generator '{0}' (see `rngbattery list-generators`)")]
    UnknownGenerator(String),

    /// An XOR composite was configured with more members than allowed.
    #[error("too many generators to XOR: {count} given, at most {max} allowed")]
    TooManyGenerators { count: usize, max: usize },

    /// An XOR composite was configured with no members.
    #[error("no generators selected")]
    NoGenerators,

    /// No test is registered under this id.
    #[error("unknown test id {0}")]
    UnknownTest(u32),

    /// A run parameter is outside every range the engine can use.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A file-backed generator was opened on a stream with no whole words.
    #[error("input file '{path}' holds no complete 32-bit values")]
    EmptyStream { path: PathBuf },

    /// Reading a file-backed generator failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scratch buffer could not be allocated.
    #[error("failed to allocate {requested} values for {purpose}")]
    Allocation {
        requested: usize,
        purpose: &'static str,
    },
}

impl BatteryError {
    /// Whether this error invalidates the whole run rather than one test.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BatteryError::UnknownGenerator(_)
                | BatteryError::TooManyGenerators { .. }
                | BatteryError::NoGenerators
                | BatteryError::UnknownTest(_)
                | BatteryError::InvalidConfig(_)
                | BatteryError::EmptyStream { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(BatteryError::UnknownGenerator("x".into()).is_configuration());
        assert!(BatteryError::TooManyGenerators { count: 101, max: 100 }.is_configuration());
        assert!(
            !BatteryError::Allocation {
                requested: 4,
                purpose: "sweep"
            }
            .is_configuration()
        );
        let io = std::io::Error::other("boom");
        assert!(!BatteryError::from(io).is_configuration());
    }

    #[test]
    fn test_messages() {
        let e = BatteryError::TooManyGenerators { count: 101, max: 100 };
        assert_eq!(
            e.to_string(),
            "too many generators to XOR: 101 given, at most 100 allowed"
        );
        assert_eq!(BatteryError::UnknownTest(999).to_string(), "unknown test id 999");
    }
}
