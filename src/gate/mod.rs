//! Coverage gate
//!
//! Every element in a rule's scope is checked on its own: one class under the
//! minimum violates the rule even when the module average is above it. An
//! empty scope never violates anything.

pub mod rule;

pub use rule::{CoverageRule, Limit, RuleConfig, RuleElement, ValueKind, GROUP_PLACEHOLDER};

use crate::coverage::model::{Counter, CounterKind, CoverageReport};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Minimum,
    Maximum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub element: RuleElement,
    /// Qualified name of the offending element
    pub name: String,
    pub counter: CounterKind,
    pub value: ValueKind,
    pub actual: f64,
    pub bound: Bound,
    pub expected: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = match self.bound {
            Bound::Minimum => "minimum",
            Bound::Maximum => "maximum",
        };
        write!(
            f,
            "Rule violated for {} {}: {} is {}, but expected {} is {}",
            self.element,
            self.name,
            self.value.describe(self.counter),
            display_actual(self.actual, self.value, self.bound),
            bound,
            display_value(self.expected, self.value),
        )
    }
}

/// Ratios print with two decimals, truncated toward the failing side so
/// 0.7999 never displays as 0.80.
fn display_actual(actual: f64, value: ValueKind, bound: Bound) -> String {
    if !value.is_ratio() {
        return format!("{}", actual);
    }
    let scaled = actual * 100.0;
    let truncated = match bound {
        Bound::Minimum => scaled.floor(),
        Bound::Maximum => scaled.ceil(),
    };
    format!("{:.2}", truncated / 100.0)
}

fn display_value(value: f64, kind: ValueKind) -> String {
    if kind.is_ratio() {
        format!("{:.2}", value)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Element/limit pairs that were compared
    pub checked: usize,
    /// Elements in scope whose counter was empty
    pub skipped: usize,
    pub violations: Vec<Violation>,
}

impl GateResult {
    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }
}

struct Element {
    name: String,
    counters: Vec<(CounterKind, Counter)>,
}

impl Element {
    fn counter(&self, kind: CounterKind) -> Counter {
        self.counters
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| *c)
            .unwrap_or_default()
    }
}

fn elements(report: &CoverageReport, element: RuleElement) -> Vec<Element> {
    let flatten = |counters: &crate::coverage::model::Counters| {
        counters.iter().map(|(k, c)| (*k, *c)).collect::<Vec<_>>()
    };
    match element {
        RuleElement::Class => report
            .classes
            .iter()
            .map(|c| Element {
                name: c.qualified_name(),
                counters: flatten(&c.counters),
            })
            .collect(),
        RuleElement::Package => report
            .packages()
            .iter()
            .map(|p| Element {
                name: p.qualified_name(),
                counters: flatten(&p.counters),
            })
            .collect(),
        RuleElement::Bundle => vec![Element {
            name: report.module.clone(),
            counters: flatten(&report.totals),
        }],
    }
}

/// Checks every rule against the filtered report.
pub fn evaluate(report: &CoverageReport, rules: &[CoverageRule]) -> GateResult {
    let mut result = GateResult::default();

    for rule in rules {
        for element in elements(report, rule.element) {
            if !rule.applies_to(&element.name) {
                continue;
            }
            for limit in &rule.limits {
                let counter = element.counter(limit.counter);
                let Some(actual) = limit.value.value(counter) else {
                    debug!(element = %element.name, counter = %limit.counter, "No data, skipping limit");
                    result.skipped += 1;
                    continue;
                };
                result.checked += 1;

                if let Some(min) = limit.minimum {
                    if actual < min {
                        result.violations.push(Violation {
                            element: rule.element,
                            name: element.name.clone(),
                            counter: limit.counter,
                            value: limit.value,
                            actual,
                            bound: Bound::Minimum,
                            expected: min,
                        });
                    }
                }
                if let Some(max) = limit.maximum {
                    if actual > max {
                        result.violations.push(Violation {
                            element: rule.element,
                            name: element.name.clone(),
                            counter: limit.counter,
                            value: limit.value,
                            actual,
                            bound: Bound::Maximum,
                            expected: max,
                        });
                    }
                }
            }
        }
    }

    result
}
