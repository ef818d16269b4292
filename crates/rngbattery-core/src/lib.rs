//! # rngbattery-core
//!
//! Bitstream sources and run configuration for the `rngbattery` test runner.
//!
//! Every source implements the [`RandomSource`] trait: an algorithmic
//! generator chosen by name, a raw binary file replayed with rewinds, or the
//! XOR of up to [`MAX_XOR_MEMBERS`] of those. A [`Generator`] wraps one source
//! and adds bit-level reads for the tests.
//!
//! ## Quick Start
//!
//! ```
//! use rngbattery_core::{Generator, GeneratorSpec, RunConfig};
//!
//! let config = RunConfig {
//!     generators: vec![GeneratorSpec::new("randu", Some(1))],
//!     ..RunConfig::default()
//! };
//! config.validate().unwrap();
//!
//! let mut generator = Generator::from_config(&config).unwrap();
//! let nibble = generator.next_bits(4);
//! assert!(nibble < 16);
//! ```

pub mod bits;
pub mod config;
pub mod error;
pub mod generator;

pub use config::{
    DEFAULT_FAIL, DEFAULT_WEAK, GeneratorSpec, KsStatistic, RunConfig, TableFlags,
};
pub use error::{BatteryError, Result};
pub use generator::{
    BUILTIN_GENERATORS, BuiltinDescriptor, FileSource, Generator, GeneratorInfo, GeneratorKind,
    MAX_XOR_MEMBERS, RandomSource, StreamState, StreamStats, XorMember, XorSource, create_builtin,
    fresh_seed,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
