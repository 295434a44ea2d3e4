//! Coverage counters and the per-module report

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Kind of measurable unit a counter tracks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterKind {
    Instruction,
    Branch,
    Line,
    Complexity,
    Method,
}

impl CounterKind {
    pub const ALL: [CounterKind; 5] = [
        CounterKind::Instruction,
        CounterKind::Branch,
        CounterKind::Line,
        CounterKind::Complexity,
        CounterKind::Method,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INSTRUCTION" => Some(CounterKind::Instruction),
            "BRANCH" => Some(CounterKind::Branch),
            "LINE" => Some(CounterKind::Line),
            "COMPLEXITY" => Some(CounterKind::Complexity),
            "METHOD" => Some(CounterKind::Method),
            _ => None,
        }
    }

    /// Plural noun used in violation messages ("lines covered ratio ...")
    pub fn noun(&self) -> &'static str {
        match self {
            CounterKind::Instruction => "instructions",
            CounterKind::Branch => "branches",
            CounterKind::Line => "lines",
            CounterKind::Complexity => "complexity",
            CounterKind::Method => "methods",
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CounterKind::Instruction => "INSTRUCTION",
            CounterKind::Branch => "BRANCH",
            CounterKind::Line => "LINE",
            CounterKind::Complexity => "COMPLEXITY",
            CounterKind::Method => "METHOD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub missed: u64,
    pub covered: u64,
}

impl Counter {
    pub fn new(missed: u64, covered: u64) -> Self {
        Self { missed, covered }
    }

    /// Saturates at `u64::MAX`; see [`Counter::checked_total`].
    pub fn total(&self) -> u64 {
        self.missed.saturating_add(self.covered)
    }

    pub fn checked_total(&self) -> Option<u64> {
        self.missed.checked_add(self.covered)
    }

    /// `None` when there is nothing to measure.
    pub fn covered_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.covered as f64 / total as f64),
        }
    }

    pub fn missed_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.missed as f64 / total as f64),
        }
    }

    /// `None` when either sum, or the resulting total, does not fit in a `u64`.
    pub fn checked_add(&self, other: Counter) -> Option<Counter> {
        let sum = Counter::new(
            self.missed.checked_add(other.missed)?,
            self.covered.checked_add(other.covered)?,
        );
        sum.checked_total().map(|_| sum)
    }

    pub fn saturating_add(&self, other: Counter) -> Counter {
        Counter::new(
            self.missed.saturating_add(other.missed),
            self.covered.saturating_add(other.covered),
        )
    }
}

pub type Counters = BTreeMap<CounterKind, Counter>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} counter of {name} overflows")]
pub struct CounterOverflow {
    pub name: String,
    pub kind: CounterKind,
}

fn merge_counters(
    into: &mut Counters,
    from: &Counters,
    name: &str,
) -> Result<(), CounterOverflow> {
    for (kind, counter) in from {
        let slot = into.entry(*kind).or_default();
        *slot = slot.checked_add(*counter).ok_or_else(|| CounterOverflow {
            name: name.to_string(),
            kind: *kind,
        })?;
    }
    Ok(())
}

/// Coverage of one compiled class, named by its class path (`com/acme/Foo`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCoverage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub counters: Counters,
}

impl ClassCoverage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_file: None,
            counters: Counters::new(),
        }
    }

    pub fn with_counter(mut self, kind: CounterKind, counter: Counter) -> Self {
        self.counters.insert(kind, counter);
        self
    }

    pub fn counter(&self, kind: CounterKind) -> Counter {
        self.counters.get(&kind).copied().unwrap_or_default()
    }

    /// `com.acme.Foo` for `com/acme/Foo`
    pub fn qualified_name(&self) -> String {
        self.name.replace('/', ".")
    }

    /// `com/acme` for `com/acme/Foo`, empty for the default package
    pub fn package(&self) -> &str {
        self.name.rsplit_once('/').map(|(pkg, _)| pkg).unwrap_or("")
    }

    pub fn merge(&mut self, other: &ClassCoverage) -> Result<(), CounterOverflow> {
        merge_counters(&mut self.counters, &other.counters, &self.name)?;
        if self.source_file.is_none() {
            self.source_file = other.source_file.clone();
        }
        Ok(())
    }
}

/// Raw per-class data read from an execution trace, before filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub classes: Vec<ClassCoverage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCoverage {
    pub name: String,
    pub classes: Vec<ClassCoverage>,
    pub counters: Counters,
}

impl PackageCoverage {
    pub fn qualified_name(&self) -> String {
        self.name.replace('/', ".")
    }

    pub fn counter(&self, kind: CounterKind) -> Counter {
        self.counters.get(&kind).copied().unwrap_or_default()
    }
}

/// Filtered coverage of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub module: String,
    pub classes: Vec<ClassCoverage>,
    pub excluded: Vec<String>,
    pub totals: Counters,
    /// sha256 over the included/excluded class structure and counters
    pub digest: String,
}

impl CoverageReport {
    pub fn class(&self, name: &str) -> Option<&ClassCoverage> {
        self.classes
            .iter()
            .find(|c| c.name == name || c.qualified_name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.class(name).is_some()
    }

    pub fn total(&self, kind: CounterKind) -> Counter {
        self.totals.get(&kind).copied().unwrap_or_default()
    }

    /// Classes grouped by package, in name order. Package counters never
    /// exceed `totals`, which the collector has already checked.
    pub fn packages(&self) -> Vec<PackageCoverage> {
        let mut packages: BTreeMap<&str, PackageCoverage> = BTreeMap::new();
        for class in &self.classes {
            let pkg = packages
                .entry(class.package())
                .or_insert_with(|| PackageCoverage {
                    name: class.package().to_string(),
                    classes: Vec::new(),
                    counters: Counters::new(),
                });
            for (kind, counter) in &class.counters {
                let slot = pkg.counters.entry(*kind).or_default();
                *slot = slot.saturating_add(*counter);
            }
            pkg.classes.push(class.clone());
        }
        packages.into_values().collect()
    }
}

pub(crate) fn sum_counters<'a>(
    module: &str,
    classes: impl IntoIterator<Item = &'a ClassCoverage>,
) -> Result<Counters, CounterOverflow> {
    let mut totals = Counters::new();
    for class in classes {
        merge_counters(&mut totals, &class.counters, module)?;
    }
    Ok(totals)
}
