use rngbattery_core::{Generator, GeneratorInfo, RunConfig};
use rngbattery_tests::{BatteryRun, Catalog, TestOutcome};
use serde::Serialize;

use super::table::TableReporter;
use super::{BatteryArgs, exit_with, exit_with_error, make_generator};

#[derive(Serialize)]
struct RunReport<'a> {
    version: &'static str,
    generator: &'a GeneratorInfo,
    config: &'a RunConfig,
    #[serde(flatten)]
    run: &'a BatteryRun,
    mean: f64,
    stddev: f64,
}

#[derive(Serialize)]
struct SingleReport<'a> {
    version: &'static str,
    generator: &'a GeneratorInfo,
    config: &'a RunConfig,
    outcome: &'a TestOutcome,
}

fn prepare(args: &BatteryArgs) -> (RunConfig, Generator) {
    let config = args.config().unwrap_or_else(|e| exit_with_error(e));
    let generator = make_generator(&config);
    log::info!("testing {} ({} bits)", generator.name(), generator.bits());
    (config, generator)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => exit_with(e),
    }
}

/// Report how often a file-backed stream was replayed.
fn report_rewinds(generator: &Generator) {
    let Some(stats) = generator.stream_stats() else {
        return;
    };
    if stats.rewind_count > 0 {
        eprintln!(
            "# {} rewound {} times ({} values served from {} on file)",
            generator.name(),
            stats.rewind_count,
            stats.total_served,
            stats.total_values
        );
    }
}

/// `rngbattery all`
pub fn run_all(args: &BatteryArgs) {
    let (mut config, mut generator) = prepare(args);
    let catalog = Catalog::standard();

    let run = if args.json {
        rngbattery_tests::run_all(&catalog, &mut generator, &mut config, &mut ())
    } else {
        let mut table = TableReporter::new(&config);
        for line in table.banner(generator.name(), config.seed) {
            println!("{line}");
        }
        rngbattery_tests::run_all(&catalog, &mut generator, &mut config, &mut table)
    };
    report_rewinds(&generator);

    if args.json {
        print_json(&RunReport {
            version: rngbattery_core::VERSION,
            generator: generator.info(),
            config: &config,
            run: &run,
            mean: run.summary.mean(),
            stddev: run.summary.stddev(),
        });
    } else {
        let mut out = std::io::stdout().lock();
        if let Err(e) = run.summary.write_footer(&mut out, config.tflag, config.separator) {
            exit_with(e);
        }
    }
}

/// `rngbattery run -d <test>`
pub fn run_single(test: &str, args: &BatteryArgs) {
    let (config, mut generator) = prepare(args);
    let catalog = Catalog::standard();
    let id = match catalog.find(test) {
        Some(entry) => entry.id(),
        None => match test.parse::<u32>() {
            Ok(id) => id,
            Err(_) => {
                eprintln!("No test matches '{test}' (see `rngbattery list-tests`).");
                std::process::exit(2);
            }
        },
    };

    let outcome = match rngbattery_tests::run_one(&catalog, id, &mut generator, &config) {
        Ok(outcome) => outcome,
        Err(e) if e.is_configuration() => exit_with_error(e),
        Err(e) => {
            report_rewinds(&generator);
            exit_with_error(e)
        }
    };
    report_rewinds(&generator);

    if args.json {
        print_json(&SingleReport {
            version: rngbattery_core::VERSION,
            generator: generator.info(),
            config: &config,
            outcome: &outcome,
        });
        return;
    }

    let table = TableReporter::new(&config);
    for line in table.banner(generator.name(), config.seed) {
        println!("{line}");
    }
    if config.tflag.contains(rngbattery_core::TableFlags::THEADER) {
        for line in table.header() {
            println!("{line}");
        }
    }
    println!("{}", table.row(&outcome));
}
