pub mod battery;
pub mod dump;
pub mod list;
pub mod table;

use std::fmt::Display;
use std::path::PathBuf;

use clap::Args;
use rngbattery_core::{
    BatteryError, DEFAULT_FAIL, DEFAULT_WEAK, Generator, GeneratorSpec, KsStatistic, RunConfig,
    TableFlags,
};

/// Where the values under test come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Generator name, optionally pinned to a seed as `name:seed`. Repeat to XOR several.
    #[arg(short = 'g', long = "generator")]
    pub generators: Vec<GeneratorSpec>,

    /// Raw binary file of little-endian 32-bit words, rewound when exhausted
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Seed applied before every test (default: fresh random seed per test)
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,
}

/// Options shared by `all` and `run`.
#[derive(Args, Debug, Clone)]
pub struct BatteryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Values per trial (default: each test's own)
    #[arg(short = 't', long)]
    pub tsamples: Option<u64>,

    /// Trials per test (default: each test's own)
    #[arg(short = 'p', long)]
    pub psamples: Option<u32>,

    /// Multiply every test's default psamples
    #[arg(short = 'm', long = "multiply-p", default_value = "1.0")]
    pub multiply_p: f64,

    /// ntuple / lag / dimension for tests that take one; 0 sweeps where supported
    #[arg(short = 'n', long, default_value = "0")]
    pub ntuple: u32,

    /// Statistic for combining trial p-values: kolmogorov (0) or kuiper (1)
    #[arg(short = 'k', long = "ks-test", default_value = "kolmogorov")]
    pub ks_test: KsStatistic,

    /// Output field flags, numeric or by name (header, no_white, all, ...). Repeatable.
    #[arg(short = 'T', long = "table")]
    pub table: Vec<String>,

    /// Field separator for the result table
    #[arg(long, default_value = "|")]
    pub separator: char,

    /// p-value distance from 0 or 1 below which a result is WEAK
    #[arg(long, default_value_t = DEFAULT_WEAK)]
    pub weak: f64,

    /// p-value distance from 0 or 1 below which a result is FAILED
    #[arg(long, default_value_t = DEFAULT_FAIL)]
    pub fail: f64,

    /// Print the run as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Initialise `env_logger` once. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Exit status for usage and configuration mistakes, as clap uses.
const EXIT_CONFIG: i32 = 2;

/// Print `err` and exit with status 1.
pub fn exit_with(err: impl Display) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}

/// Status for a run-level error: 2 when the configuration is at fault, 1 otherwise.
pub fn exit_code(err: &BatteryError) -> i32 {
    if err.is_configuration() { EXIT_CONFIG } else { 1 }
}

/// Print a battery error and exit with [`exit_code`].
pub fn exit_with_error(err: BatteryError) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(exit_code(&err));
}

impl SourceArgs {
    /// Configuration with only the source fields filled in.
    ///
    /// No generator and no file means the default generator.
    pub fn config(&self) -> RunConfig {
        let mut config = RunConfig {
            seed: self.seed,
            input_file: self.file.clone(),
            ..RunConfig::default()
        };
        if !self.generators.is_empty() || self.file.is_some() {
            config.generators = self.generators.clone();
        }
        config
    }
}

impl BatteryArgs {
    /// Build and validate the run configuration.
    pub fn config(&self) -> rngbattery_core::Result<RunConfig> {
        let config = RunConfig {
            tsamples: self.tsamples,
            psamples: self.psamples,
            multiply_p: self.multiply_p,
            ntuple: self.ntuple,
            ks_test: self.ks_test,
            tflag: TableFlags::parse_all(&self.table)?,
            separator: self.separator,
            weak_threshold: self.weak,
            fail_threshold: self.fail,
            ..self.source.config()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Build the generator `config` names, or exit.
pub fn make_generator(config: &RunConfig) -> Generator {
    match Generator::from_config(config) {
        Ok(generator) => generator,
        Err(e) => exit_with_error(e),
    }
}
