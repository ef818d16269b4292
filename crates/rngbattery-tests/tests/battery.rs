//! End-to-end battery runs against real generators.

use std::fs::OpenOptions;
use std::io::Write;

use rngbattery_core::{Generator, GeneratorSpec, KsStatistic, RunConfig, create_builtin};
use rngbattery_tests::aggregate::uniformity_p;
use rngbattery_tests::{
    Catalog, CatalogEntry, Family, SweepPolicy, aggregate, execute_test, run_all, run_one,
    standard_tests, with_ntuple,
};

fn config(psamples: u32, tsamples: u64, ntuple: u32) -> RunConfig {
    RunConfig {
        generators: vec![GeneratorSpec::new("stdrng", None)],
        seed: Some(2024),
        psamples: Some(psamples),
        tsamples: Some(tsamples),
        ntuple,
        ..RunConfig::default()
    }
}

fn generator(cfg: &RunConfig) -> Generator {
    Generator::from_config(cfg).unwrap()
}

/// Catalog holding only the standard test with `id`, with its sweep policy.
fn only(id: u32, policy: Option<SweepPolicy>) -> Catalog {
    let mut catalog = Catalog::new();
    let test = standard_tests().into_iter().find(|t| t.info().id == id).unwrap();
    let mut entry = CatalogEntry::new(test);
    if let Some(p) = policy {
        entry = entry.with_sweep(p);
    }
    catalog.register(entry).unwrap();
    catalog
}

#[test]
fn families_one_and_two_count_every_enabled_test_but_the_legacy_one() {
    let mut catalog = Catalog::standard();
    catalog.set_family_enabled(Family::Other, false);
    let mut cfg = config(100, 50, 0);
    let run = run_all(&catalog, &mut generator(&cfg), &mut cfg, &mut ());

    let expected = catalog
        .iter()
        .filter(|e| e.family() != Some(Family::Other) && e.id() != Catalog::LEGACY_EXCLUDED)
        .count();
    assert_eq!(expected, 10);
    assert_eq!(run.summary.count(), expected);
    assert!(run.failures.is_empty());
    assert!(run.outcomes.iter().all(|o| o.pvalues.len() == 100));
}

#[test]
fn unset_ntuple_sweeps_and_averages_every_value() {
    let catalog = only(200, Some(SweepPolicy::bit_distribution()));
    let mut cfg = config(3, 600, 0);
    let run = run_all(&catalog, &mut generator(&cfg), &mut cfg, &mut ());
    assert_eq!(cfg.ntuple, 0);

    let swept: Vec<u32> = run.outcomes.iter().map(|o| o.ntuple).collect();
    assert_eq!(swept, (1..=12).collect::<Vec<u32>>());

    // Recompute each value independently; a fixed seed makes runs repeatable.
    let entry = catalog.get(200).unwrap();
    let mut g = generator(&cfg);
    let finals: Vec<f64> = (1..=12)
        .map(|n| with_ntuple(&mut cfg, n, |c| execute_test(entry, &mut g, c).unwrap().pvalue))
        .collect();
    let mean = finals.iter().sum::<f64>() / finals.len() as f64;
    assert_eq!(run.summary.count(), 1);
    assert!((run.summary.values()[0] - mean).abs() < 1e-12);
    assert_eq!(cfg.ntuple, 0);
}

#[test]
fn lag_sweep_includes_zero() {
    let catalog = only(203, Some(SweepPolicy::lagged_sums()));
    let mut cfg = config(2, 100, 0);
    let run = run_all(&catalog, &mut generator(&cfg), &mut cfg, &mut ());
    assert_eq!(run.outcomes.len(), 33);
    assert_eq!(run.outcomes[0].ntuple, 0);
    assert_eq!(run.outcomes[32].ntuple, 32);
}

#[test]
fn out_of_domain_ntuple_runs_once_at_default_and_is_restored() {
    let catalog = only(202, Some(SweepPolicy::permutations()));
    let mut cfg = config(3, 500, 1);
    let run = run_all(&catalog, &mut generator(&cfg), &mut cfg, &mut ());
    assert_eq!(run.outcomes.len(), 1);
    assert_eq!(run.outcomes[0].ntuple, 5);
    assert_eq!(run.summary.count(), 1);
    assert_eq!(cfg.ntuple, 1);

    let catalog = only(201, Some(SweepPolicy::minimum_distance()));
    let mut cfg = config(2, 50, 9);
    let run = run_all(&catalog, &mut generator(&cfg), &mut cfg, &mut ());
    assert_eq!(run.outcomes.len(), 1);
    assert_eq!(run.outcomes[0].ntuple, 5);
    assert_eq!(cfg.ntuple, 9);
}

#[test]
fn single_trial_is_passed_through() {
    let catalog = only(100, None);
    let cfg = config(1, 1000, 0);
    let outcome = run_one(&catalog, 100, &mut generator(&cfg), &cfg).unwrap();
    assert_eq!(outcome.pvalues.len(), 1);
    assert_eq!(outcome.pvalue, outcome.pvalues[0]);
}

#[test]
fn aggregated_pvalues_of_uniform_vectors_are_uniform() {
    let mut g = Generator::new(create_builtin("stdrng", 99).unwrap());
    for stat in [KsStatistic::Kolmogorov, KsStatistic::Kuiper] {
        let finals: Vec<f64> = (0..300)
            .map(|_| {
                let trial: Vec<f64> = (0..100).map(|_| g.next_uniform()).collect();
                aggregate(&trial, stat)
            })
            .collect();
        let p = uniformity_p(&finals);
        assert!(p > 1e-4, "{stat}: {p}");
    }
}

#[test]
fn file_stream_rewinds_during_a_run() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    let mut src = create_builtin("stdrng", 5).unwrap();
    for _ in 0..1000 {
        f.write_all(&src.next_uint().to_le_bytes()).unwrap();
    }
    f.flush().unwrap();

    let cfg = RunConfig {
        generators: Vec::new(),
        input_file: Some(f.path().to_path_buf()),
        ..config(5, 1000, 0)
    };
    let catalog = only(100, None);
    let mut g = generator(&cfg);
    run_one(&catalog, 100, &mut g, &cfg).unwrap();
    let stats = g.stream_stats().unwrap();
    assert_eq!(stats.total_served, 5000);
    assert_eq!(stats.rewind_count, 5);
}

#[test]
fn stream_failure_is_localized_to_tests() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    let words: Vec<u8> = (0..100_000u32).flat_map(|w| w.wrapping_mul(2_654_435_761).to_le_bytes()).collect();
    f.write_all(&words).unwrap();
    f.flush().unwrap();

    let mut cfg = RunConfig {
        generators: Vec::new(),
        input_file: Some(f.path().to_path_buf()),
        ..config(2, 20_000, 0)
    };
    let mut g = generator(&cfg);
    // Shrink the file underneath the open stream.
    OpenOptions::new().write(true).open(f.path()).unwrap().set_len(16).unwrap();

    let mut catalog = Catalog::standard();
    catalog.set_family_enabled(Family::Diehard, false);
    catalog.set_family_enabled(Family::Other, false);
    let run = run_all(&catalog, &mut g, &mut cfg, &mut ());
    assert_eq!(run.failures.len(), 3);
    assert_eq!(run.summary.count(), 0);
    assert!(run.outcomes.is_empty());
}

#[test]
#[ignore] // Run with: cargo test --release -- --ignored
fn full_battery_on_a_good_generator() {
    let catalog = Catalog::standard();
    let mut cfg = RunConfig {
        seed: Some(1),
        ..RunConfig::default()
    };
    let run = run_all(&catalog, &mut generator(&cfg), &mut cfg, &mut ());
    assert!(run.failures.is_empty());
    assert_eq!(run.skipped, [Catalog::BROKEN]);
    assert_eq!(run.summary.count(), 18);
    let mean = run.summary.mean();
    assert!(mean > 0.2 && mean < 0.8, "mean p-value {mean}");
}
