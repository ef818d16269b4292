//! CLI for rngbattery: diehard-style statistical test batteries for
//! pseudorandom number generators.

mod commands;

use clap::{Parser, Subcommand};
use commands::{BatteryArgs, SourceArgs};

#[derive(Parser)]
#[command(name = "rngbattery")]
#[command(about = "rngbattery: statistical test batteries for pseudorandom number generators")]
#[command(version = rngbattery_core::VERSION)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled test in the standard catalog and print the summary footer
    All {
        #[command(flatten)]
        battery: BatteryArgs,
    },

    /// Run a single test by id or name, whatever its availability
    Run {
        /// Test id (e.g. 0, 101, 203) or name (e.g. diehard_birthdays)
        #[arg(short = 'd', long = "test")]
        test: String,

        #[command(flatten)]
        battery: BatteryArgs,
    },

    /// List the builtin generators
    ListGenerators,

    /// List the tests in the standard catalog with their defaults
    ListTests,

    /// Print raw generator output as text, one value per line
    Dump {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of values to print
        #[arg(short = 'n', long, default_value = "10")]
        count: u64,

        /// Print values as bit strings of the generator's width
        #[arg(long)]
        bits: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    commands::init_logging(cli.verbose);

    match cli.command {
        Commands::All { battery } => commands::battery::run_all(&battery),
        Commands::Run { test, battery } => commands::battery::run_single(&test, &battery),
        Commands::ListGenerators => commands::list::generators(),
        Commands::ListTests => commands::list::tests(),
        Commands::Dump {
            source,
            count,
            bits,
        } => commands::dump::run(&source, count, bits),
    }
}
