use std::io::Write;

use rngbattery_core::bits::format_bits;
use rngbattery_core::fresh_seed;

use super::{SourceArgs, exit_with, make_generator};

/// `rngbattery dump -n N`
pub fn run(source: &SourceArgs, count: u64, bits: bool) {
    let config = source.config();
    let mut generator = make_generator(&config);
    generator.reset(config.seed.unwrap_or_else(fresh_seed));
    let width = generator.bits();

    let mut out = std::io::BufWriter::new(std::io::stdout().lock());
    for _ in 0..count {
        let value = generator.next_uint();
        let line = if bits {
            writeln!(out, "{}", format_bits(value, width))
        } else {
            writeln!(out, "{value}")
        };
        if let Err(e) = line {
            exit_with(e);
        }
        if let Some(e) = generator.take_error() {
            exit_with(e);
        }
    }
    if let Err(e) = out.flush() {
        exit_with(e);
    }
}
