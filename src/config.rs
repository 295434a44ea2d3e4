//! Configuration management for covgate
//!
//! Settings come from `covgate.toml` at the workspace root (or a file given
//! with `--config`), then environment overrides, then command-line flags.
//! Every default mirrors the conventional Gradle + JaCoCo setup, so a
//! project without a config file gets the standard gate.
//!
//! # Environment Variables
//!
//! - `COVGATE_JOBS`: Maximum modules processed at once - default: available parallelism
//! - `COVGATE_MIN_RATIO`: Replaces the minimum of every ratio limit
//! - `COVGATE_TEST_TIMEOUT`: Test command timeout in seconds - default: none
//! - `COVGATE_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```toml
//! group = "com.acme.shop"
//! jobs = 4
//!
//! [test]
//! command = "./gradlew {gradle_path}:test --console=plain"
//! timeout_secs = 900
//!
//! [coverage]
//! exclusions = ["**/config/**", "**/generated/**"]
//!
//! [[rules]]
//! element = "CLASS"
//! includes = ["{group}.**.application.service.*"]
//! limits = [{ counter = "LINE", value = "COVEREDRATIO", minimum = 0.80 }]
//! ```

use crate::coverage::pattern::{compile_all, Separator};
use crate::coverage::render::ReportFormats;
use crate::coverage::trace::TraceFormat;
use crate::coverage::lcov::DEFAULT_SOURCE_ROOTS;
use crate::gate::{Limit, RuleConfig, RuleElement};
use crate::workspace::Module;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "covgate.toml";

const DEFAULT_TEST_COMMAND: &str = "./gradlew {gradle_path}:test --console=plain";
const DEFAULT_TRACE_PATH: &str = "build/reports/jacoco/test/jacocoTestReport.xml";
const DEFAULT_RESULTS_DIR: &str = "build/test-results/test";
const DEFAULT_REPORT_DIR: &str = "build/reports/covgate";
const DEFAULT_MIN_RATIO: f64 = 0.80;

/// Placeholders available in the test command
const COMMAND_PLACEHOLDERS: [&str; 4] = ["{module}", "{gradle_path}", "{dir}", "{group}"];

/// Classes removed from coverage accounting in every module
pub fn default_exclusions() -> Vec<String> {
    [
        "**/config/**",
        "**/infrastructure/**",
        "**/*Application*",
        "**/DataInitializer*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Service and security-service classes must reach 80% line coverage.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![RuleConfig {
        element: RuleElement::Class,
        includes: vec![
            "{group}.**.application.service.*".to_string(),
            "{group}.**.application.service.security.*".to_string(),
        ],
        excludes: Vec::new(),
        limits: vec![Limit::line_minimum(DEFAULT_MIN_RATIO)],
    }]
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path}: {message}")]
    Syntax { path: PathBuf, message: String },

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkingDir {
    /// Workspace root, where the Gradle wrapper lives
    #[default]
    Root,
    Module,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    pub command: String,
    pub working_dir: WorkingDir,
    pub timeout_secs: Option<u64>,
    /// JUnit XML directory, relative to the module
    pub results_dir: PathBuf,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_TEST_COMMAND.to_string(),
            working_dir: WorkingDir::Root,
            timeout_secs: None,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    /// Execution trace, relative to the module
    pub trace: PathBuf,
    pub format: TraceFormat,
    pub exclusions: Vec<String>,
    /// Report output directory, relative to the module
    pub report_dir: PathBuf,
    /// Prefixes stripped from LCOV source paths
    pub source_roots: Vec<String>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            trace: PathBuf::from(DEFAULT_TRACE_PATH),
            format: TraceFormat::Auto,
            exclusions: default_exclusions(),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            source_roots: DEFAULT_SOURCE_ROOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A module declared explicitly, with optional per-module overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleConfig {
    pub name: String,
    /// Directory relative to the workspace root; derived from the name when absent
    pub path: Option<PathBuf>,
    pub group: Option<String>,
    pub depends_on: Vec<String>,
    pub test_command: Option<String>,
    pub trace: Option<PathBuf>,
    pub exclusions: Option<Vec<String>>,
    pub rules: Option<Vec<RuleConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CovgateConfig {
    /// Group substituted for `{group}`; read from the root build file when unset
    pub group: Option<String>,
    pub version: Option<String>,
    pub jobs: usize,
    pub test: TestConfig,
    pub coverage: CoverageConfig,
    pub reports: ReportFormats,
    pub rules: Vec<RuleConfig>,
    pub modules: Vec<ModuleConfig>,
}

impl Default for CovgateConfig {
    fn default() -> Self {
        Self {
            group: None,
            version: None,
            jobs: default_jobs(),
            test: TestConfig::default(),
            coverage: CoverageConfig::default(),
            reports: ReportFormats::default(),
            rules: default_rules(),
            modules: Vec::new(),
        }
    }
}

/// Settings resolved for one module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSettings {
    pub test_command: String,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub trace_format: TraceFormat,
    pub source_roots: Vec<String>,
    pub exclusions: Vec<String>,
    pub rules: Vec<RuleConfig>,
    pub reports: ReportFormats,
}

impl CovgateConfig {
    /// Loads `explicit` if given, else `covgate.toml` under `root`, else defaults.
    /// Environment overrides are applied on top.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Some(root.join(CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Syntax { message, .. } => ConfigError::Syntax {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Syntax {
            path: PathBuf::from(CONFIG_FILE),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(jobs) = env_parse::<usize>("COVGATE_JOBS")? {
            self.jobs = jobs;
        }
        if let Some(secs) = env_parse::<u64>("COVGATE_TEST_TIMEOUT")? {
            self.test.timeout_secs = Some(secs);
        }
        if let Some(ratio) = env_parse::<f64>("COVGATE_MIN_RATIO")? {
            self.override_min_ratio(ratio);
        }
        Ok(())
    }

    /// Replaces the minimum of every ratio limit, including module overrides.
    pub fn override_min_ratio(&mut self, ratio: f64) {
        let module_rules = self.modules.iter_mut().filter_map(|m| m.rules.as_mut());
        for rules in std::iter::once(&mut self.rules).chain(module_rules) {
            for limit in rules.iter_mut().flat_map(|r| r.limits.iter_mut()) {
                if limit.value.is_ratio() && limit.minimum.is_some() {
                    limit.minimum = Some(ratio);
                }
            }
        }
    }

    pub fn module_config(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Checks ranges, bounds and that every pattern compiles.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` naming the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::ValidationFailed(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.test.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "Test timeout must be at least 1 second".to_string(),
            ));
        }
        if let Some(group) = &self.group {
            validate_group(group)?;
        }

        validate_command(&self.test.command)?;
        validate_reports(self.reports)?;
        validate_exclusions(&self.coverage.exclusions)?;
        validate_rules(&self.rules)?;

        let mut seen = HashSet::new();
        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Module name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(module.name.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Module {} is declared more than once",
                    module.name
                )));
            }
            if let Some(group) = &module.group {
                validate_group(group)?;
            }
            if let Some(command) = &module.test_command {
                validate_command(command)?;
            }
            if let Some(exclusions) = &module.exclusions {
                validate_exclusions(exclusions)?;
            }
            if let Some(rules) = &module.rules {
                validate_rules(rules)?;
            }
        }

        Ok(())
    }

    /// Resolves test command, patterns and rules for one module.
    pub fn settings_for(&self, module: &Module, root: &Path) -> ModuleSettings {
        let overrides = self.module_config(&module.name);

        let template = overrides
            .and_then(|m| m.test_command.as_deref())
            .unwrap_or(&self.test.command);
        let test_command = expand_command(template, module);

        let working_dir = match self.test.working_dir {
            WorkingDir::Root => root.to_path_buf(),
            WorkingDir::Module => module.dir.clone(),
        };

        ModuleSettings {
            test_command,
            working_dir,
            timeout: self.test.timeout_secs.map(Duration::from_secs),
            trace_format: self.coverage.format,
            source_roots: self.coverage.source_roots.clone(),
            exclusions: overrides
                .and_then(|m| m.exclusions.clone())
                .unwrap_or_else(|| self.coverage.exclusions.clone()),
            rules: overrides
                .and_then(|m| m.rules.clone())
                .unwrap_or_else(|| self.rules.clone()),
            reports: self.reports,
        }
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        if let Some(group) = &self.group {
            map.insert("group".to_string(), group.clone());
        }
        if let Some(version) = &self.version {
            map.insert("version".to_string(), version.clone());
        }
        map.insert("jobs".to_string(), self.jobs.to_string());
        map.insert("test.command".to_string(), self.test.command.clone());
        if let Some(secs) = self.test.timeout_secs {
            map.insert("test.timeout_secs".to_string(), secs.to_string());
        }
        map.insert(
            "coverage.trace".to_string(),
            self.coverage.trace.display().to_string(),
        );
        map.insert("coverage.format".to_string(), self.coverage.format.to_string());
        map.insert(
            "coverage.exclusions".to_string(),
            self.coverage.exclusions.join(", "),
        );
        map.insert(
            "coverage.report_dir".to_string(),
            self.coverage.report_dir.display().to_string(),
        );
        map.insert("reports".to_string(), enabled_formats(self.reports));
        map.insert("rules".to_string(), self.rules.len().to_string());
        map.insert("modules".to_string(), self.modules.len().to_string());

        map
    }
}

impl fmt::Display for CovgateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Covgate Configuration:")?;
        if let Some(group) = &self.group {
            writeln!(f, "  Group: {}", group)?;
        }
        writeln!(f, "  Jobs: {}", self.jobs)?;
        writeln!(f, "  Test Command: {}", self.test.command)?;
        if let Some(secs) = self.test.timeout_secs {
            writeln!(f, "  Test Timeout: {}s", secs)?;
        }
        writeln!(f, "  Trace: {} ({})", self.coverage.trace.display(), self.coverage.format)?;
        writeln!(f, "  Exclusions:")?;
        for pattern in &self.coverage.exclusions {
            writeln!(f, "    - {}", pattern)?;
        }
        writeln!(f, "  Reports: {}", enabled_formats(self.reports))?;
        writeln!(f, "  Rules:")?;
        for rule in &self.rules {
            writeln!(f, "    - {} in [{}]", rule.element, rule.includes.join(", "))?;
            for limit in &rule.limits {
                let mut bounds = Vec::new();
                if let Some(min) = limit.minimum {
                    bounds.push(format!("minimum {}", min));
                }
                if let Some(max) = limit.maximum {
                    bounds.push(format!("maximum {}", max));
                }
                writeln!(
                    f,
                    "        {}: {}",
                    limit.value.describe(limit.counter),
                    bounds.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

fn enabled_formats(formats: ReportFormats) -> String {
    let mut enabled = Vec::new();
    if formats.json {
        enabled.push("json");
    }
    if formats.html {
        enabled.push("html");
    }
    if formats.csv {
        enabled.push("csv");
    }
    enabled.join(", ")
}

fn expand_command(template: &str, module: &Module) -> String {
    let values = [
        module.name.clone(),
        module.gradle_path.clone(),
        module.dir.display().to_string(),
        module.group.clone(),
    ];
    COMMAND_PLACEHOLDERS
        .iter()
        .zip(values.iter())
        .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            }),
        _ => Ok(None),
    }
}

fn validate_group(group: &str) -> Result<(), ConfigError> {
    if group.trim().is_empty() || group.contains(['/', '*', '?']) {
        return Err(ConfigError::ValidationFailed(format!(
            "Invalid group: '{}'",
            group
        )));
    }
    Ok(())
}

fn validate_command(command: &str) -> Result<(), ConfigError> {
    if command.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Test command cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// The JSON and HTML reports are always written; only CSV can be toggled.
fn validate_reports(reports: ReportFormats) -> Result<(), ConfigError> {
    for (name, enabled) in [("json", reports.json), ("html", reports.html)] {
        if !enabled {
            return Err(ConfigError::ValidationFailed(format!(
                "The {} report cannot be disabled",
                name
            )));
        }
    }
    Ok(())
}

fn validate_exclusions(patterns: &[String]) -> Result<(), ConfigError> {
    compile_all(patterns, Separator::Slash)
        .map(|_| ())
        .map_err(|e| ConfigError::ValidationFailed(format!("Invalid exclusion: {}", e)))
}

fn validate_rules(rules: &[RuleConfig]) -> Result<(), ConfigError> {
    for rule in rules {
        if rule.includes.is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "{} rule has no includes",
                rule.element
            )));
        }
        if rule.limits.is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "{} rule on [{}] has no limits",
                rule.element,
                rule.includes.join(", ")
            )));
        }
        rule.compile("group")
            .map_err(|e| ConfigError::ValidationFailed(format!("Invalid rule scope: {}", e)))?;

        for limit in &rule.limits {
            let bounds: Vec<f64> = limit.minimum.into_iter().chain(limit.maximum).collect();
            if bounds.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Limit on {} needs a minimum or maximum",
                    limit.value.describe(limit.counter)
                )));
            }
            if bounds.iter().any(|b| !b.is_finite() || *b < 0.0) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Limit on {} must be a non-negative number",
                    limit.value.describe(limit.counter)
                )));
            }
            if limit.value.is_ratio() && bounds.iter().any(|b| *b > 1.0) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Ratio limit on {} must be between 0 and 1",
                    limit.counter
                )));
            }
            if let (Some(min), Some(max)) = (limit.minimum, limit.maximum) {
                if min > max {
                    return Err(ConfigError::ValidationFailed(format!(
                        "Limit on {} has minimum {} above maximum {}",
                        limit.value.describe(limit.counter),
                        min,
                        max
                    )));
                }
            }
        }
    }
    Ok(())
}
