//! JUnit XML test results
//!
//! Gradle, Maven Surefire and most JVM harnesses write one
//! `TEST-<class>.xml` per suite; `<testsuites>` wrappers are handled too.

use super::{TestCaseResult, TestStatus};
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use roxmltree::{Document, Node};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub fn parse(content: &str) -> Result<Vec<TestCaseResult>> {
    let doc = Document::parse(content).context("Invalid JUnit XML")?;

    let root = doc.root_element();
    if !root.has_tag_name("testsuite") && !root.has_tag_name("testsuites") {
        anyhow::bail!(
            "Expected <testsuite> or <testsuites>, found <{}>",
            root.tag_name().name()
        );
    }

    Ok(root
        .descendants()
        .filter(|n| n.has_tag_name("testcase"))
        .map(parse_case)
        .collect())
}

fn parse_case(node: Node) -> TestCaseResult {
    let suite = node
        .attribute("classname")
        .or_else(|| {
            node.ancestors()
                .find(|a| a.has_tag_name("testsuite"))
                .and_then(|s| s.attribute("name"))
        })
        .unwrap_or("")
        .to_string();
    let name = node.attribute("name").unwrap_or("").to_string();
    let duration = node
        .attribute("time")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    let mut status = TestStatus::Passed;
    let mut message = None;
    for child in node.children().filter(|c| c.is_element()) {
        let found = match child.tag_name().name() {
            "failure" => TestStatus::Failed,
            "error" => TestStatus::Errored,
            "skipped" => TestStatus::Skipped,
            _ => continue,
        };
        status = found;
        message = child
            .attribute("message")
            .map(str::to_string)
            .or_else(|| child.text().map(|t| first_line(t).to_string()));
        if found != TestStatus::Skipped {
            break;
        }
    }

    TestCaseResult {
        suite,
        name,
        status,
        message,
        duration,
    }
}

fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or("").trim()
}

/// Reads every `*.xml` result file below `dir`. A missing directory yields no results.
pub fn collect_results(dir: &Path) -> Result<Vec<TestCaseResult>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "No test results directory");
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("xml"))
        .collect();
    files.sort();

    let mut cases = Vec::new();
    for file in files {
        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read test results {}", file.display()))?;
        match parse(&content) {
            Ok(mut parsed) => cases.append(&mut parsed),
            Err(e) => warn!(file = %file.display(), error = %e, "Skipping unreadable test result file"),
        }
    }

    Ok(cases)
}
