//! Coverage rules: which elements are checked and against which limits

use crate::coverage::model::{Counter, CounterKind};
use crate::coverage::pattern::{compile_all, matches_any, ClassPattern, PatternError, Separator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder replaced by the module's group in rule scopes
pub const GROUP_PLACEHOLDER: &str = "{group}";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleElement {
    /// The whole module
    Bundle,
    Package,
    #[default]
    Class,
}

impl fmt::Display for RuleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleElement::Bundle => "bundle",
            RuleElement::Package => "package",
            RuleElement::Class => "class",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueKind {
    TotalCount,
    MissedCount,
    CoveredCount,
    MissedRatio,
    #[default]
    CoveredRatio,
}

impl ValueKind {
    pub fn is_ratio(&self) -> bool {
        matches!(self, ValueKind::MissedRatio | ValueKind::CoveredRatio)
    }

    /// `None` for ratios over an empty counter.
    pub fn value(&self, counter: Counter) -> Option<f64> {
        match self {
            ValueKind::TotalCount => Some(counter.total() as f64),
            ValueKind::MissedCount => Some(counter.missed as f64),
            ValueKind::CoveredCount => Some(counter.covered as f64),
            ValueKind::MissedRatio => counter.missed_ratio(),
            ValueKind::CoveredRatio => counter.covered_ratio(),
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            ValueKind::TotalCount => "total count",
            ValueKind::MissedCount => "missed count",
            ValueKind::CoveredCount => "covered count",
            ValueKind::MissedRatio => "missed ratio",
            ValueKind::CoveredRatio => "covered ratio",
        }
    }

    pub fn describe(&self, counter: CounterKind) -> String {
        format!("{} {}", counter.noun(), self.phrase())
    }
}

/// One bound on one counter value. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    #[serde(default = "default_counter")]
    pub counter: CounterKind,
    #[serde(default)]
    pub value: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

fn default_counter() -> CounterKind {
    CounterKind::Line
}

impl Limit {
    pub fn line_minimum(minimum: f64) -> Self {
        Self {
            counter: CounterKind::Line,
            value: ValueKind::CoveredRatio,
            minimum: Some(minimum),
            maximum: None,
        }
    }
}

/// Rule as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub element: RuleElement,
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub limits: Vec<Limit>,
}

fn default_includes() -> Vec<String> {
    vec!["*".to_string()]
}

impl RuleConfig {
    /// Expands `{group}` and compiles the scope patterns.
    pub fn compile(&self, group: &str) -> Result<CoverageRule, PatternError> {
        let expand = |patterns: &[String]| -> Vec<String> {
            patterns
                .iter()
                .map(|p| p.replace(GROUP_PLACEHOLDER, group))
                .collect()
        };

        let includes = expand(&self.includes);
        let excludes = expand(&self.excludes);

        Ok(CoverageRule {
            element: self.element,
            includes: compile_all(&includes, Separator::Dot)?,
            excludes: compile_all(&excludes, Separator::Dot)?,
            limits: self.limits.clone(),
        })
    }
}

/// Rule with scopes compiled for one module
#[derive(Debug, Clone)]
pub struct CoverageRule {
    pub element: RuleElement,
    pub includes: Vec<ClassPattern>,
    pub excludes: Vec<ClassPattern>,
    pub limits: Vec<Limit>,
}

impl CoverageRule {
    /// Whether a qualified element name falls inside this rule's scope.
    pub fn applies_to(&self, name: &str) -> bool {
        matches_any(&self.includes, name) && !matches_any(&self.excludes, name)
    }
}
