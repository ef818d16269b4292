use rngbattery_core::BUILTIN_GENERATORS;
use rngbattery_tests::{Availability, Catalog};

/// `rngbattery list-generators`
pub fn generators() {
    println!("{:<12} {:>4}  Description", "Name", "Bits");
    println!("{}", "-".repeat(72));
    for g in BUILTIN_GENERATORS {
        println!("{:<12} {:>4}  {}", g.name, g.bits, g.description);
    }
    println!();
    println!("Use -g NAME[:SEED] (repeatable, XOR-combined) or -f FILE for raw 32-bit words.");
}

/// `rngbattery list-tests`
pub fn tests() {
    println!(
        "{:>4}  {:<28} {:>9} {:>8} {:>5}  Description",
        "Id", "Name", "tsamples", "psamples", "ntup"
    );
    println!("{}", "-".repeat(100));
    let catalog = Catalog::standard();
    for entry in catalog.iter() {
        let info = entry.info();
        let note = match entry.availability {
            Availability::Active => "",
            Availability::Excluded => " [excluded from `all`]",
            Availability::Broken => " [unreliable, skipped by `all`]",
        };
        println!(
            "{:>4}  {:<28} {:>9} {:>8} {:>5}  {}{note}",
            info.id, info.name, info.tsamples, info.psamples, info.ntuple, info.description
        );
    }
}
