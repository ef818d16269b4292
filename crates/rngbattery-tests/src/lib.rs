//! Randomness test battery for `rngbattery`.
//!
//! Provides 20 tests in three families (Diehard, NIST STS and an extended
//! set), the [`Catalog`] that schedules them, the KS/Kuiper [`aggregate`]
//! that turns a test's trial p-values into one final p-value, and the
//! [`RunSummary`] of a whole run.
//!
//! ```no_run
//! use rngbattery_core::{Generator, RunConfig};
//! use rngbattery_tests::{Catalog, run_all};
//!
//! let mut config = RunConfig::default();
//! let mut generator = Generator::from_config(&config).unwrap();
//! let run = run_all(&Catalog::standard(), &mut generator, &mut config, &mut ());
//! let mut out = std::io::stdout();
//! run.summary.write_footer(&mut out, config.tflag, config.separator).unwrap();
//! ```

pub mod aggregate;
pub mod battery;
pub mod catalog;
pub mod stats;
pub mod suite;
pub mod summary;

pub use aggregate::aggregate;
pub use battery::{
    Assessment, BatteryRun, Reporter, TestFailure, TestOutcome, execute_test, run_all, run_one,
    with_ntuple,
};
pub use catalog::{Availability, Catalog, CatalogEntry, Family, SweepPlan, SweepPolicy};
pub use suite::{BatteryTest, TestInfo, TrialParams, standard_tests};
pub use summary::RunSummary;
