//! Battery dispatch: run one test, or the whole catalog family by family.
//!
//! A test run reseeds the generator, collects `psamples` trial p-values and
//! reduces them to one final p-value. The full battery walks the Diehard,
//! STS and Other families in ascending id order, applies each test's sweep
//! policy, and appends every final value to the run summary.

use std::fmt;

use rngbattery_core::{BatteryError, Generator, Result, RunConfig, StreamState, fresh_seed};
use serde::Serialize;

use crate::aggregate::aggregate;
use crate::catalog::{Availability, Catalog, CatalogEntry, Family, SweepPlan};
use crate::suite::TrialParams;
use crate::summary::RunSummary;

// ═══════════════════════════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════════════════════════

/// Verdict on a final p-value. Values too close to 1 are as suspicious as
/// values too close to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Assessment {
    Passed,
    Weak,
    Failed,
}

impl Assessment {
    pub fn of(p: f64, weak: f64, fail: f64) -> Self {
        if p.is_nan() || p < fail || p > 1.0 - fail {
            Assessment::Failed
        } else if p < weak || p > 1.0 - weak {
            Assessment::Weak
        } else {
            Assessment::Passed
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assessment::Passed => write!(f, "PASSED"),
            Assessment::Weak => write!(f, "WEAK"),
            Assessment::Failed => write!(f, "FAILED"),
        }
    }
}

/// Result of one run of one test at one ntuple.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub id: u32,
    pub name: &'static str,
    pub ntuple: u32,
    pub tsamples: u64,
    pub psamples: u32,
    pub seed: u64,
    /// Trial p-values in the order they were produced.
    pub pvalues: Vec<f64>,
    /// Aggregated p-value.
    pub pvalue: f64,
    pub assessment: Assessment,
}

/// A test that could not produce a value.
#[derive(Debug, Clone, Serialize)]
pub struct TestFailure {
    pub id: u32,
    pub name: &'static str,
    pub error: String,
}

/// Everything a full battery run produced.
#[derive(Debug, Default, Serialize)]
pub struct BatteryRun {
    /// Every individual run, sweeps included, in execution order.
    pub outcomes: Vec<TestOutcome>,
    pub failures: Vec<TestFailure>,
    /// Ids skipped as broken.
    pub skipped: Vec<u32>,
    pub summary: RunSummary,
}

/// Receives results as the battery produces them.
pub trait Reporter {
    fn outcome(&mut self, outcome: &TestOutcome);

    fn skipped(&mut self, _entry: &CatalogEntry) {}

    fn failed(&mut self, _failure: &TestFailure) {}
}

/// Reporter that discards everything.
impl Reporter for () {
    fn outcome(&mut self, _outcome: &TestOutcome) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// Single test execution
// ═══════════════════════════════════════════════════════════════════════════════

/// Temporarily set `config.ntuple`, run `f`, and restore the caller's value.
pub fn with_ntuple<T>(config: &mut RunConfig, ntuple: u32, f: impl FnOnce(&RunConfig) -> T) -> T {
    let saved = config.ntuple;
    config.ntuple = ntuple;
    let result = f(config);
    config.ntuple = saved;
    result
}

fn reserve<T>(len: usize, purpose: &'static str) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| BatteryError::Allocation {
            requested: len,
            purpose,
        })?;
    Ok(buf)
}

fn closed_stream(generator: &Generator) -> bool {
    generator
        .stream_stats()
        .is_some_and(|s| s.state == StreamState::Closed)
}

/// Run `entry` once with `config.ntuple` (0 selects the test's default).
pub fn execute_test(entry: &CatalogEntry, generator: &mut Generator, config: &RunConfig) -> Result<TestOutcome> {
    let info = entry.info();
    if closed_stream(generator) {
        return Err(BatteryError::Io(std::io::Error::other("input stream is closed")));
    }

    let params = TrialParams {
        tsamples: config.tsamples_for(info.tsamples),
        ntuple: info.effective_ntuple(config.ntuple),
    };
    let psamples = config.psamples_for(info.psamples);
    let seed = config.seed.unwrap_or_else(fresh_seed);
    generator.reset(seed);
    log::debug!(
        "{}: tsamples={} psamples={psamples} ntuple={} seed={seed}",
        info.name,
        params.tsamples,
        params.ntuple
    );

    let mut pvalues = reserve(psamples as usize, "trial p-values")?;
    for trial in 0..psamples {
        let p = entry.test.trial(generator, &params);
        if let Some(err) = generator.take_error() {
            log::warn!("{}: generator failed during trial {trial}: {err}", info.name);
            return Err(err);
        }
        log::trace!("{} trial {trial}: p = {p:.6}", info.name);
        pvalues.push(p);
    }

    let pvalue = aggregate(&pvalues, config.ks_test);
    Ok(TestOutcome {
        id: info.id,
        name: info.name,
        ntuple: params.ntuple,
        tsamples: params.tsamples,
        psamples,
        seed,
        pvalues,
        pvalue,
        assessment: Assessment::of(pvalue, config.weak_threshold, config.fail_threshold),
    })
}

/// Run a single test by id, whatever its availability.
pub fn run_one(
    catalog: &Catalog,
    id: u32,
    generator: &mut Generator,
    config: &RunConfig,
) -> Result<TestOutcome> {
    let entry = catalog.get(id).ok_or(BatteryError::UnknownTest(id))?;
    match entry.availability {
        Availability::Active => {}
        Availability::Excluded => log::warn!("test {id} ({}) is superseded", entry.info().name),
        Availability::Broken => log::warn!("test {id} ({}) is known to be unreliable", entry.info().name),
    }
    execute_test(entry, generator, config)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Full battery
// ═══════════════════════════════════════════════════════════════════════════════

struct Dispatch<'a, R: Reporter + ?Sized> {
    generator: &'a mut Generator,
    reporter: &'a mut R,
    run: BatteryRun,
}

impl<R: Reporter + ?Sized> Dispatch<'_, R> {
    fn fail(&mut self, entry: &CatalogEntry, err: BatteryError) {
        log::error!("test {} ({}) failed: {err}", entry.id(), entry.info().name);
        let failure = TestFailure {
            id: entry.id(),
            name: entry.info().name,
            error: err.to_string(),
        };
        self.reporter.failed(&failure);
        self.run.failures.push(failure);
    }

    fn record(&mut self, outcome: TestOutcome) -> f64 {
        self.reporter.outcome(&outcome);
        let p = outcome.pvalue;
        self.run.outcomes.push(outcome);
        p
    }

    /// One run; its final value goes to the summary.
    fn single(&mut self, entry: &CatalogEntry, config: &RunConfig) {
        match execute_test(entry, self.generator, config) {
            Ok(outcome) => {
                let p = self.record(outcome);
                self.run.summary.push(p);
            }
            Err(err) => self.fail(entry, err),
        }
    }

    /// One run per ntuple in `range`; the mean final value goes to the summary.
    ///
    /// Leaves `config.ntuple` unset (0) afterwards, so later sweep-policy
    /// tests sweep too.
    fn sweep(&mut self, entry: &CatalogEntry, config: &mut RunConfig, range: std::ops::RangeInclusive<u32>) {
        let result = self.sweep_mean(entry, config, range);
        config.ntuple = 0;
        match result {
            Ok(mean) => self.run.summary.push(mean),
            Err(err) => self.fail(entry, err),
        }
    }

    fn sweep_mean(
        &mut self,
        entry: &CatalogEntry,
        config: &mut RunConfig,
        range: std::ops::RangeInclusive<u32>,
    ) -> Result<f64> {
        let len = range.clone().count();
        let mut finals: Vec<f64> = reserve(len, "sweep averaging buffer")?;
        for ntuple in range {
            config.ntuple = ntuple;
            let outcome = execute_test(entry, self.generator, config)?;
            finals.push(self.record(outcome));
        }
        let mean = finals.iter().sum::<f64>() / finals.len().max(1) as f64;
        log::info!("{}: mean p-value over {len} ntuples = {mean:.6}", entry.info().name);
        Ok(mean)
    }

    fn entry(&mut self, entry: &CatalogEntry, family: Family, config: &mut RunConfig) {
        // Broken tests are announced whether or not they are enabled.
        if entry.availability == Availability::Broken {
            log::warn!("Skipping test {} ({}): known to be broken", entry.id(), entry.info().name);
            self.reporter.skipped(entry);
            self.run.skipped.push(entry.id());
            return;
        }
        if !entry.enabled {
            return;
        }
        if entry.availability == Availability::Excluded {
            log::debug!("test {} is excluded from full runs", entry.id());
            return;
        }
        match &entry.sweep {
            Some(policy) => match policy.plan(config.ntuple) {
                SweepPlan::Single(_) => self.single(entry, config),
                SweepPlan::Substitute(ntuple) => {
                    log::info!(
                        "test {}: ntuple {} unusable, running once at {ntuple}",
                        entry.id(),
                        config.ntuple
                    );
                    let result = with_ntuple(config, ntuple, |cfg| execute_test(entry, self.generator, cfg));
                    match result {
                        Ok(outcome) => {
                            let p = self.record(outcome);
                            self.run.summary.push(p);
                        }
                        Err(err) => self.fail(entry, err),
                    }
                }
                SweepPlan::Sweep(range) => self.sweep(entry, config, range),
            },
            None => {
                if family == Family::Other {
                    log::info!("Preparing to run test {}. ntuple = {}", entry.id(), config.ntuple);
                }
                self.single(entry, config);
            }
        }
    }
}

/// Run every enabled, available test in the catalog.
///
/// A substituted ntuple is undone after its single run. A sweep leaves
/// `config.ntuple` at 0, so every later sweep-policy test sweeps as well.
pub fn run_all<R: Reporter + ?Sized>(
    catalog: &Catalog,
    generator: &mut Generator,
    config: &mut RunConfig,
    reporter: &mut R,
) -> BatteryRun {
    let mut dispatch = Dispatch {
        generator,
        reporter,
        run: BatteryRun::default(),
    };
    for family in Family::ALL {
        log::info!("running {family} tests");
        for entry in catalog.family(family) {
            dispatch.entry(entry, family, config);
        }
    }
    let run = dispatch.run;
    log::info!(
        "battery finished: {} values, {} failures, {} skipped",
        run.summary.count(),
        run.failures.len(),
        run.skipped.len()
    );
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SweepPolicy;
    use crate::suite::{BatteryTest, TestInfo};
    use rngbattery_core::create_builtin;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Test that records the ntuple of every trial and returns a fixed p.
    struct Probe {
        info: TestInfo,
        seen: Rc<RefCell<Vec<u32>>>,
        p: f64,
    }

    impl BatteryTest for Probe {
        fn info(&self) -> &TestInfo {
            &self.info
        }
        fn trial(&self, _generator: &mut Generator, params: &TrialParams) -> f64 {
            self.seen.borrow_mut().push(params.ntuple);
            self.p
        }
    }

    fn probe(id: u32, p: f64, range: Option<std::ops::RangeInclusive<u32>>) -> (Box<Probe>, Rc<RefCell<Vec<u32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let test = Probe {
            info: TestInfo {
                id,
                name: "probe",
                description: "",
                tsamples: 1,
                psamples: 1,
                ntuple: range.as_ref().map_or(0, |r| *r.start()),
                ntuple_range: range,
            },
            seen: Rc::clone(&seen),
            p,
        };
        (Box::new(test), seen)
    }

    fn generator() -> Generator {
        Generator::new(create_builtin("stdrng", 1).unwrap())
    }

    fn config() -> RunConfig {
        RunConfig {
            seed: Some(1),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_assessment() {
        assert_eq!(Assessment::of(0.5, 0.005, 1e-6), Assessment::Passed);
        assert_eq!(Assessment::of(0.001, 0.005, 1e-6), Assessment::Weak);
        assert_eq!(Assessment::of(0.9999, 0.005, 1e-6), Assessment::Weak);
        assert_eq!(Assessment::of(1e-9, 0.005, 1e-6), Assessment::Failed);
        assert_eq!(Assessment::of(f64::NAN, 0.005, 1e-6), Assessment::Failed);
        assert_eq!(Assessment::Weak.to_string(), "WEAK");
    }

    #[test]
    fn test_with_ntuple_restores() {
        let mut cfg = config();
        cfg.ntuple = 7;
        let inside = with_ntuple(&mut cfg, 3, |c| c.ntuple);
        assert_eq!(inside, 3);
        assert_eq!(cfg.ntuple, 7);
    }

    #[test]
    fn test_single_psample_passes_through() {
        let (test, _) = probe(150, 0.321, None);
        let entry = CatalogEntry::new(test);
        let cfg = RunConfig {
            psamples: Some(1),
            ..config()
        };
        let outcome = execute_test(&entry, &mut generator(), &cfg).unwrap();
        assert_eq!(outcome.pvalue, 0.321);
        assert_eq!(outcome.pvalues, [0.321]);
    }

    #[test]
    fn test_sweep_averages_and_restores() {
        let mut catalog = Catalog::new();
        let (test, seen) = probe(203, 0.25, Some(0..=32));
        catalog
            .register(CatalogEntry::new(test).with_sweep(SweepPolicy::lagged_sums()))
            .unwrap();
        let mut cfg = config();
        cfg.ntuple = 0;
        let run = run_all(&catalog, &mut generator(), &mut cfg, &mut ());
        assert_eq!(*seen.borrow(), (0..=32).collect::<Vec<u32>>());
        assert_eq!(run.outcomes.len(), 33);
        assert_eq!(run.summary.values(), [0.25]);
        assert_eq!(cfg.ntuple, 0);
    }

    /// Catalog of recording tests at 200, 201 and 203 with their standard policies.
    fn swept_catalog() -> (Catalog, [Rc<RefCell<Vec<u32>>>; 3]) {
        let mut catalog = Catalog::new();
        let (bitdist, seen200) = probe(200, 0.5, Some(1..=16));
        let (mindist, seen201) = probe(201, 0.5, Some(2..=5));
        let (lagged, seen203) = probe(203, 0.5, Some(0..=32));
        for entry in [
            CatalogEntry::new(bitdist).with_sweep(SweepPolicy::bit_distribution()),
            CatalogEntry::new(mindist).with_sweep(SweepPolicy::minimum_distance()),
            CatalogEntry::new(lagged).with_sweep(SweepPolicy::lagged_sums()),
        ] {
            catalog.register(entry).unwrap();
        }
        (catalog, [seen200, seen201, seen203])
    }

    #[test]
    fn test_sweep_leaves_ntuple_unset_for_later_tests() {
        let (catalog, [seen200, seen201, seen203]) = swept_catalog();
        let mut cfg = config();
        cfg.ntuple = 20;
        let run = run_all(&catalog, &mut generator(), &mut cfg, &mut ());

        // 20 is outside bitdist's accepted values, so it sweeps and unsets ntuple.
        assert_eq!(*seen200.borrow(), (1..=12).collect::<Vec<u32>>());
        assert_eq!(*seen201.borrow(), [2, 3, 4, 5]);
        assert_eq!(*seen203.borrow(), (0..=32).collect::<Vec<u32>>());
        assert_eq!(run.summary.count(), 3);
        assert_eq!(cfg.ntuple, 0);
    }

    #[test]
    fn test_accepted_ntuple_reaches_every_test() {
        let (catalog, [seen200, seen201, seen203]) = swept_catalog();
        let mut cfg = config();
        cfg.ntuple = 3;
        run_all(&catalog, &mut generator(), &mut cfg, &mut ());
        assert_eq!(*seen200.borrow(), [3]);
        assert_eq!(*seen201.borrow(), [3]);
        assert_eq!(*seen203.borrow(), [3]);
        assert_eq!(cfg.ntuple, 3);
    }

    #[test]
    fn test_substitute_restores_caller_value() {
        let mut catalog = Catalog::new();
        let (test, seen) = probe(201, 0.5, Some(2..=5));
        catalog
            .register(CatalogEntry::new(test).with_sweep(SweepPolicy::minimum_distance()))
            .unwrap();
        let mut cfg = config();
        cfg.ntuple = 9;
        let run = run_all(&catalog, &mut generator(), &mut cfg, &mut ());
        assert_eq!(*seen.borrow(), [5]);
        assert_eq!(run.summary.count(), 1);
        assert_eq!(cfg.ntuple, 9);
    }

    #[test]
    fn test_skips_excluded_and_broken() {
        let mut catalog = Catalog::new();
        let (excluded, seen_excluded) = probe(14, 0.5, None);
        let (broken, seen_broken) = probe(207, 0.5, None);
        let (active, _) = probe(100, 0.5, None);
        catalog
            .register(CatalogEntry::new(excluded).with_availability(Availability::Excluded))
            .unwrap();
        catalog
            .register(CatalogEntry::new(broken).with_availability(Availability::Broken))
            .unwrap();
        catalog.register(CatalogEntry::new(active)).unwrap();

        let run = run_all(&catalog, &mut generator(), &mut config(), &mut ());
        assert!(seen_excluded.borrow().is_empty());
        assert!(seen_broken.borrow().is_empty());
        assert_eq!(run.skipped, [207]);
        assert_eq!(run.summary.count(), 1);

        // Singly selected, both still run.
        run_one(&catalog, 14, &mut generator(), &config()).unwrap();
        run_one(&catalog, 207, &mut generator(), &config()).unwrap();
        assert_eq!(seen_excluded.borrow().len(), 1);
        assert_eq!(seen_broken.borrow().len(), 1);
    }

    #[test]
    fn test_run_one_unknown_id() {
        let catalog = Catalog::new();
        assert!(matches!(
            run_one(&catalog, 5, &mut generator(), &config()),
            Err(BatteryError::UnknownTest(5))
        ));
    }

    #[test]
    fn test_execution_order_is_family_then_id() {
        let mut catalog = Catalog::new();
        let mut probes = Vec::new();
        for (id, p) in [(205, 0.1), (2, 0.2), (101, 0.3), (0, 0.4)] {
            let (test, seen) = probe(id, p, None);
            catalog.register(CatalogEntry::new(test)).unwrap();
            probes.push(seen);
        }
        let run = run_all(&catalog, &mut generator(), &mut config(), &mut ());
        let ids: Vec<u32> = run.outcomes.iter().map(|o| o.id).collect();
        assert_eq!(ids, [0, 2, 101, 205]);
        assert_eq!(run.summary.values(), [0.4, 0.2, 0.3, 0.1]);
    }

    #[test]
    fn test_disabled_broken_test_still_announced() {
        let mut catalog = Catalog::new();
        let (broken, seen) = probe(207, 0.5, None);
        catalog
            .register(CatalogEntry::new(broken).with_availability(Availability::Broken))
            .unwrap();
        catalog.set_enabled(207, false).unwrap();
        let run = run_all(&catalog, &mut generator(), &mut config(), &mut ());
        assert!(seen.borrow().is_empty());
        assert_eq!(run.skipped, [207]);
        assert_eq!(run.summary.count(), 0);
    }

    #[test]
    fn test_disabled_entries_skipped() {
        let mut catalog = Catalog::new();
        let (test, seen) = probe(100, 0.5, None);
        catalog.register(CatalogEntry::new(test)).unwrap();
        catalog.set_enabled(100, false).unwrap();
        let run = run_all(&catalog, &mut generator(), &mut config(), &mut ());
        assert!(seen.borrow().is_empty());
        assert_eq!(run.summary.count(), 0);
    }
}
