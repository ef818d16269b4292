//! Per-test result table, printed a line at a time as tests finish.

use rngbattery_core::{RunConfig, TableFlags};
use rngbattery_tests::summary::RULE;
use rngbattery_tests::{CatalogEntry, Reporter, TestFailure, TestOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Ntuple,
    Tsamples,
    Psamples,
    Seed,
    PValue,
    Assessment,
}

impl Column {
    /// Flag bit selecting each column, in print order.
    const ORDER: [(u32, Column); 7] = [
        (TableFlags::TTEST_NAME, Column::Name),
        (TableFlags::TNTUPLE, Column::Ntuple),
        (TableFlags::TTSAMPLES, Column::Tsamples),
        (TableFlags::TPSAMPLES, Column::Psamples),
        (TableFlags::TSEED, Column::Seed),
        (TableFlags::TPVALUES, Column::PValue),
        (TableFlags::TASSESSMENT, Column::Assessment),
    ];

    fn title(self) -> &'static str {
        match self {
            Column::Name => "test_name",
            Column::Ntuple => "ntup",
            Column::Tsamples => "tsamples",
            Column::Psamples => "psamples",
            Column::Seed => "seed",
            Column::PValue => "p-value",
            Column::Assessment => "Assessment",
        }
    }

    fn width(self) -> usize {
        match self {
            Column::Name => 24,
            Column::Ntuple => 4,
            Column::Tsamples => 10,
            Column::Psamples => 8,
            Column::Seed => 20,
            Column::PValue => 10,
            Column::Assessment => 10,
        }
    }

    fn cell(self, outcome: &TestOutcome) -> String {
        match self {
            Column::Name => outcome.name.to_string(),
            Column::Ntuple => outcome.ntuple.to_string(),
            Column::Tsamples => outcome.tsamples.to_string(),
            Column::Psamples => outcome.psamples.to_string(),
            Column::Seed => outcome.seed.to_string(),
            Column::PValue => format!("{:.8}", outcome.pvalue),
            Column::Assessment => outcome.assessment.to_string(),
        }
    }
}

/// Prints the result table to stdout.
pub struct TableReporter {
    flags: TableFlags,
    separator: char,
    columns: Vec<Column>,
    header_pending: bool,
}

impl TableReporter {
    pub fn new(config: &RunConfig) -> Self {
        let flags = config.tflag;
        let columns = Column::ORDER
            .iter()
            .filter(|(bit, _)| flags.contains(*bit))
            .map(|&(_, c)| c)
            .collect();
        Self {
            flags,
            separator: config.separator,
            columns,
            header_pending: flags.contains(TableFlags::THEADER),
        }
    }

    fn join<'a>(&self, cells: impl Iterator<Item = (Column, &'a str)>) -> String {
        let no_white = self.flags.contains(TableFlags::TNO_WHITE);
        let mut line = String::new();
        for (i, (column, text)) in cells.enumerate() {
            if i > 0 {
                line.push(self.separator);
            }
            if no_white {
                line.push_str(text);
            } else {
                line.push_str(&format!("{text:>width$}", width = column.width()));
            }
        }
        line
    }

    /// Generator banner, when `TSHOW_RNG` is set.
    pub fn banner(&self, generator: &str, seed: Option<u64>) -> Vec<String> {
        if !self.flags.contains(TableFlags::TSHOW_RNG) {
            return Vec::new();
        }
        let seed = seed.map_or_else(|| "fresh per test".to_string(), |s| s.to_string());
        vec![
            RULE.to_string(),
            format!("#   rngbattery version {}", rngbattery_core::VERSION),
            format!("#   generator: {generator}   seed: {seed}"),
        ]
    }

    /// Column titles, framed by rules when `TLINE_HEADER` is set.
    pub fn header(&self) -> Vec<String> {
        let titles = self.join(self.columns.iter().map(|&c| (c, c.title())));
        let titles = format!("#{titles}");
        if self.flags.contains(TableFlags::TLINE_HEADER) {
            vec![RULE.to_string(), titles, RULE.to_string()]
        } else {
            vec![titles]
        }
    }

    pub fn row(&self, outcome: &TestOutcome) -> String {
        let cells: Vec<(Column, String)> = self.columns.iter().map(|&c| (c, c.cell(outcome))).collect();
        let line = self.join(cells.iter().map(|(c, s)| (*c, s.as_str())));
        if self.flags.contains(TableFlags::TNO_WHITE) {
            line
        } else {
            // Keep data aligned under the '#' that opens the header.
            format!(" {line}")
        }
    }
}

impl Reporter for TableReporter {
    fn outcome(&mut self, outcome: &TestOutcome) {
        if self.header_pending {
            self.header_pending = false;
            for line in self.header() {
                println!("{line}");
            }
        }
        println!("{}", self.row(outcome));
    }

    fn skipped(&mut self, entry: &CatalogEntry) {
        println!(
            "# skipping test {} ({}): known to give unreliable p-values",
            entry.id(),
            entry.info().name
        );
    }

    fn failed(&mut self, failure: &TestFailure) {
        println!("# test {} ({}) produced no result: {}", failure.id, failure.name, failure.error);
    }
}
