//! Test catalog: which tests exist, which family they belong to, whether
//! the full battery schedules them, and how their ntuple is swept.

use std::fmt;
use std::ops::RangeInclusive;

use rngbattery_core::{BatteryError, Result};
use serde::Serialize;

use crate::suite::{BatteryTest, TestInfo, standard_tests};

// ---------------------------------------------------------------------------
// Families
// ---------------------------------------------------------------------------

/// Test families, each owning a block of 100 ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Family {
    /// Marsaglia's Diehard tests, ids 0..100.
    Diehard,
    /// NIST STS tests, ids 100..200.
    Sts,
    /// Extended tests, ids 200..300.
    Other,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Diehard, Family::Sts, Family::Other];

    pub fn of(id: u32) -> Option<Family> {
        match id {
            0..100 => Some(Family::Diehard),
            100..200 => Some(Family::Sts),
            200..300 => Some(Family::Other),
            _ => None,
        }
    }

    pub fn ids(self) -> RangeInclusive<u32> {
        match self {
            Family::Diehard => 0..=99,
            Family::Sts => 100..=199,
            Family::Other => 200..=299,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Diehard => write!(f, "diehard"),
            Family::Sts => write!(f, "sts"),
            Family::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Whether the full battery schedules a test.
///
/// Excluded and broken tests still run when selected on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Active,
    /// Superseded; skipped silently.
    Excluded,
    /// Known to give unreliable p-values; skipped with a notice.
    Broken,
}

// ---------------------------------------------------------------------------
// Sweep policy
// ---------------------------------------------------------------------------

/// Replace out-of-range ntuple values with a default for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub valid: RangeInclusive<u32>,
    pub default: u32,
}

/// How a test's ntuple is chosen in a full battery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Values run (and averaged) when the run has no usable ntuple.
    pub sweep: RangeInclusive<u32>,
    /// Nonzero values that select a single run.
    pub accepted: RangeInclusive<u32>,
    pub substitute: Option<Substitution>,
}

/// What a [`SweepPolicy`] decided for one configured ntuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepPlan {
    /// One run with this ntuple.
    Single(u32),
    /// One run with the substitute ntuple in place of the configured one.
    Substitute(u32),
    /// One run per value, results averaged.
    Sweep(RangeInclusive<u32>),
}

impl SweepPolicy {
    pub fn plan(&self, ntuple: u32) -> SweepPlan {
        if ntuple != 0 && self.accepted.contains(&ntuple) {
            match &self.substitute {
                Some(sub) if !sub.valid.contains(&ntuple) => SweepPlan::Substitute(sub.default),
                _ => SweepPlan::Single(ntuple),
            }
        } else {
            SweepPlan::Sweep(self.sweep.clone())
        }
    }

    /// Bit distribution: sweep 1..=12, single run for 1..=16.
    pub fn bit_distribution() -> Self {
        Self {
            sweep: 1..=12,
            accepted: 1..=16,
            substitute: None,
        }
    }

    /// Minimum distance: sweep dimensions 2..=5; any other nonzero value runs once at 5.
    pub fn minimum_distance() -> Self {
        Self {
            sweep: 2..=5,
            accepted: 1..=u32::MAX,
            substitute: Some(Substitution {
                valid: 2..=5,
                default: 5,
            }),
        }
    }

    /// Permutations: sweep 2..=5, single run for 2..=8, 1 runs once at 5.
    pub fn permutations() -> Self {
        Self {
            sweep: 2..=5,
            accepted: 1..=8,
            substitute: Some(Substitution {
                valid: 2..=8,
                default: 5,
            }),
        }
    }

    /// Lagged sums: sweep lags 0..=32, single run for 1..=32.
    pub fn lagged_sums() -> Self {
        Self {
            sweep: 0..=32,
            accepted: 1..=32,
            substitute: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One registered test and its scheduling metadata.
pub struct CatalogEntry {
    pub test: Box<dyn BatteryTest>,
    pub enabled: bool,
    pub availability: Availability,
    pub sweep: Option<SweepPolicy>,
}

impl CatalogEntry {
    pub fn new(test: Box<dyn BatteryTest>) -> Self {
        Self {
            test,
            enabled: true,
            availability: Availability::Active,
            sweep: None,
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_sweep(mut self, policy: SweepPolicy) -> Self {
        self.sweep = Some(policy);
        self
    }

    pub fn info(&self) -> &TestInfo {
        self.test.info()
    }

    pub fn id(&self) -> u32 {
        self.info().id
    }

    pub fn family(&self) -> Option<Family> {
        Family::of(self.id())
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("id", &self.id())
            .field("name", &self.info().name)
            .field("enabled", &self.enabled)
            .field("availability", &self.availability)
            .field("sweep", &self.sweep)
            .finish()
    }
}

/// Registered tests, kept sorted by id.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Id of the legacy sums test, superseded and left out of full runs.
    pub const LEGACY_EXCLUDED: u32 = 14;
    /// Id of the fill tree test, whose p-values are unreliable.
    pub const BROKEN: u32 = 207;

    pub fn new() -> Self {
        Self::default()
    }

    /// Every test with its standard availability and sweep policy.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for test in standard_tests() {
            let id = test.info().id;
            let mut entry = CatalogEntry::new(test);
            match id {
                Self::LEGACY_EXCLUDED => entry = entry.with_availability(Availability::Excluded),
                Self::BROKEN => entry = entry.with_availability(Availability::Broken),
                200 => entry = entry.with_sweep(SweepPolicy::bit_distribution()),
                201 => entry = entry.with_sweep(SweepPolicy::minimum_distance()),
                202 => entry = entry.with_sweep(SweepPolicy::permutations()),
                203 => entry = entry.with_sweep(SweepPolicy::lagged_sums()),
                _ => {}
            }
            if let Err(e) = catalog.register(entry) {
                log::error!("standard catalog: {e}");
            }
        }
        catalog
    }

    /// Add an entry. Ids must be unique and belong to a family.
    pub fn register(&mut self, entry: CatalogEntry) -> Result<()> {
        let id = entry.id();
        if Family::of(id).is_none() {
            return Err(BatteryError::InvalidConfig(format!(
                "test id {id} is outside every family"
            )));
        }
        match self.entries.binary_search_by_key(&id, CatalogEntry::id) {
            Ok(_) => Err(BatteryError::InvalidConfig(format!(
                "test id {id} registered twice"
            ))),
            Err(pos) => {
                self.entries.insert(pos, entry);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&CatalogEntry> {
        self.entries
            .binary_search_by_key(&id, CatalogEntry::id)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Look up by id or by name.
    pub fn find(&self, key: &str) -> Option<&CatalogEntry> {
        match key.parse::<u32>() {
            Ok(id) => self.get(id),
            Err(_) => self.entries.iter().find(|e| e.info().name == key),
        }
    }

    pub fn set_enabled(&mut self, id: u32, enabled: bool) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(BatteryError::UnknownTest(id))?;
        entry.enabled = enabled;
        Ok(())
    }

    pub fn set_family_enabled(&mut self, family: Family, enabled: bool) {
        for entry in self.entries.iter_mut().filter(|e| e.family() == Some(family)) {
            entry.enabled = enabled;
        }
    }

    /// Entries of one family in ascending id order.
    pub fn family(&self, family: Family) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(move |e| e.family() == Some(family))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_of() {
        assert_eq!(Family::of(0), Some(Family::Diehard));
        assert_eq!(Family::of(99), Some(Family::Diehard));
        assert_eq!(Family::of(100), Some(Family::Sts));
        assert_eq!(Family::of(203), Some(Family::Other));
        assert_eq!(Family::of(300), None);
    }

    #[test]
    fn test_bitdist_plan() {
        let p = SweepPolicy::bit_distribution();
        assert_eq!(p.plan(0), SweepPlan::Sweep(1..=12));
        assert_eq!(p.plan(8), SweepPlan::Single(8));
        assert_eq!(p.plan(16), SweepPlan::Single(16));
        assert_eq!(p.plan(17), SweepPlan::Sweep(1..=12));
    }

    #[test]
    fn test_minimum_distance_plan() {
        let p = SweepPolicy::minimum_distance();
        assert_eq!(p.plan(0), SweepPlan::Sweep(2..=5));
        assert_eq!(p.plan(3), SweepPlan::Single(3));
        assert_eq!(p.plan(1), SweepPlan::Substitute(5));
        assert_eq!(p.plan(6), SweepPlan::Substitute(5));
        assert_eq!(p.plan(u32::MAX), SweepPlan::Substitute(5));
    }

    #[test]
    fn test_permutations_plan() {
        let p = SweepPolicy::permutations();
        assert_eq!(p.plan(0), SweepPlan::Sweep(2..=5));
        assert_eq!(p.plan(1), SweepPlan::Substitute(5));
        assert_eq!(p.plan(2), SweepPlan::Single(2));
        assert_eq!(p.plan(8), SweepPlan::Single(8));
        assert_eq!(p.plan(9), SweepPlan::Sweep(2..=5));
    }

    #[test]
    fn test_lagged_sums_plan() {
        let p = SweepPolicy::lagged_sums();
        assert_eq!(p.plan(0), SweepPlan::Sweep(0..=32));
        assert_eq!(p.plan(32), SweepPlan::Single(32));
        assert_eq!(p.plan(33), SweepPlan::Sweep(0..=32));
    }

    #[test]
    fn test_standard_catalog() {
        let c = Catalog::standard();
        assert_eq!(c.len(), 20);
        assert_eq!(c.get(14).unwrap().availability, Availability::Excluded);
        assert_eq!(c.get(207).unwrap().availability, Availability::Broken);
        assert!(c.get(200).unwrap().sweep.is_some());
        assert!(c.get(204).unwrap().sweep.is_none());
        assert_eq!(c.find("sts_runs").unwrap().id(), 101);
        assert_eq!(c.find("202").unwrap().info().name, "rgb_permutations");
        let ids: Vec<u32> = c.family(Family::Sts).map(|e| e.id()).collect();
        assert_eq!(ids, [100, 101, 102]);
    }

    struct Stray(TestInfo);

    impl BatteryTest for Stray {
        fn info(&self) -> &TestInfo {
            &self.0
        }
        fn trial(&self, _: &mut rngbattery_core::Generator, _: &crate::suite::TrialParams) -> f64 {
            0.5
        }
    }

    #[test]
    fn test_register_rejects_duplicates_and_stray_ids() {
        let mut c = Catalog::new();
        for t in standard_tests().into_iter().take(2) {
            c.register(CatalogEntry::new(t)).unwrap();
        }
        let dup = standard_tests().into_iter().next().unwrap();
        assert!(c.register(CatalogEntry::new(dup)).is_err());

        let stray = Stray(TestInfo {
            id: 300,
            name: "stray",
            description: "",
            tsamples: 1,
            psamples: 1,
            ntuple: 0,
            ntuple_range: None,
        });
        assert!(c.register(CatalogEntry::new(Box::new(stray))).is_err());
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_enable_toggles() {
        let mut c = Catalog::standard();
        c.set_enabled(101, false).unwrap();
        assert!(!c.get(101).unwrap().enabled);
        assert!(matches!(c.set_enabled(999, true), Err(BatteryError::UnknownTest(999))));
        c.set_family_enabled(Family::Diehard, false);
        assert!(c.family(Family::Diehard).all(|e| !e.enabled));
        assert!(c.family(Family::Other).all(|e| e.enabled));
    }
}
