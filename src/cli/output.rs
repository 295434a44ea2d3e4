//! Output formatting for multiple formats
//!
//! JSON and YAML serialize the same structures; the human format is meant
//! for terminals and CI logs.

use anyhow::{Context, Result};
use std::fmt::Write as _;

use crate::config::CovgateConfig;
use crate::pipeline::{ModuleOutcome, RunSummary};
use crate::workspace::Workspace;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(summary).context("Failed to serialize run summary to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(summary).context("Failed to serialize run summary to YAML")
            }
            OutputFormat::Human => Ok(self.format_summary_human(summary)),
        }
    }

    pub fn format_modules(&self, workspace: &Workspace) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(workspace)
                .context("Failed to serialize workspace to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(workspace).context("Failed to serialize workspace to YAML")
            }
            OutputFormat::Human => Ok(self.format_modules_human(workspace)),
        }
    }

    pub fn format_config(&self, config: &CovgateConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(config).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_summary_human(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        if summary.is_success() {
            output.push_str("\u{2713} Coverage Gate Passed\n");
        } else {
            output.push_str("\u{2717} Coverage Gate Failed\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        for outcome in &summary.modules {
            format_module_human(&mut output, outcome);
        }

        let _ = writeln!(
            output,
            "\n{} passed, {} failed in {:.1}s",
            summary.passed(),
            summary.failed(),
            summary.duration.as_secs_f64()
        );
        output
    }

    fn format_modules_human(&self, workspace: &Workspace) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Modules in {}", workspace.root.display());
        output.push_str(RULE);
        output.push_str("\n\n");

        for module in &workspace.modules {
            let _ = writeln!(output, "{}", module.name);
            let _ = writeln!(output, "\u{251C}\u{2500} Dir:     {}", module.dir.display());
            let _ = writeln!(output, "\u{251C}\u{2500} Group:   {}", module.group);
            let deps = if module.dependencies.is_empty() {
                "(none)".to_string()
            } else {
                module.dependencies.join(", ")
            };
            let _ = writeln!(output, "\u{251C}\u{2500} Depends: {}", deps);
            let _ = writeln!(output, "\u{2514}\u{2500} Trace:   {}\n", module.trace_path.display());
        }
        output
    }
}

fn format_module_human(output: &mut String, outcome: &ModuleOutcome) {
    let symbol = if outcome.passed() { "\u{2713}" } else { "\u{2717}" };
    let tests = outcome
        .tests
        .map(|t| {
            format!(
                "{} passed, {} failed, {} skipped",
                t.passed,
                t.failed + t.errored,
                t.skipped
            )
        })
        .unwrap_or_else(|| "no test results".to_string());

    let _ = writeln!(
        output,
        "{} {} [{}] ({}, {}ms)",
        symbol,
        outcome.module,
        outcome.state,
        tests,
        outcome.duration.as_millis()
    );

    if let Some(error) = &outcome.error {
        for line in error.details() {
            let _ = writeln!(output, "    - {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pipeline::{ModuleState, TestCounts};
    use std::time::Duration;

    fn summary() -> RunSummary {
        RunSummary {
            started_at: chrono::Utc::now(),
            modules: vec![
                ModuleOutcome {
                    module: "libs".to_string(),
                    state: ModuleState::Passed,
                    history: vec![
                        ModuleState::Pending,
                        ModuleState::Testing,
                        ModuleState::Collecting,
                        ModuleState::Gating,
                        ModuleState::Passed,
                    ],
                    error: None,
                    tests: Some(TestCounts {
                        passed: 12,
                        ..Default::default()
                    }),
                    gate: None,
                    report_files: vec![],
                    duration: Duration::from_millis(1200),
                },
                ModuleOutcome {
                    module: "services:catalog-service".to_string(),
                    state: ModuleState::Failed,
                    history: vec![ModuleState::Pending, ModuleState::Testing, ModuleState::Failed],
                    error: Some(PipelineError::CoverageComputation {
                        module: "services:catalog-service".to_string(),
                        message: "Execution trace not found".to_string(),
                    }),
                    tests: None,
                    gate: None,
                    report_files: vec![],
                    duration: Duration::from_millis(300),
                },
            ],
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_human_summary() {
        let out = OutputFormatter::new(OutputFormat::Human)
            .format_summary(&summary())
            .unwrap();
        assert!(out.contains("Coverage Gate Failed"));
        assert!(out.contains("\u{2713} libs [PASSED] (12 passed, 0 failed, 0 skipped"));
        assert!(out.contains("\u{2717} services:catalog-service [FAILED]"));
        assert!(out.contains("Execution trace not found"));
        assert!(out.contains("1 passed, 1 failed"));
    }

    #[test]
    fn test_json_summary() {
        let out = OutputFormatter::new(OutputFormat::Json)
            .format_summary(&summary())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["modules"][0]["state"], "PASSED");
        assert_eq!(value["modules"][1]["error"]["kind"], "coverage_computation");
    }

    #[test]
    fn test_yaml_config() {
        let out = OutputFormatter::new(OutputFormat::Yaml)
            .format_config(&CovgateConfig::default())
            .unwrap();
        assert!(out.contains("exclusions:"));
        assert!(out.contains("**/config/**"));
    }
}
