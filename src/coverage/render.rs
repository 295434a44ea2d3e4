//! Report files written for each module
//!
//! `coverage.json` and `index.html` are always produced. `coverage.csv` is
//! off unless enabled in `[reports]`.

use super::model::{ClassCoverage, Counter, CoverageReport, CounterKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const JSON_REPORT: &str = "coverage.json";
pub const HTML_REPORT: &str = "index.html";
pub const CSV_REPORT: &str = "coverage.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFormats {
    pub json: bool,
    pub html: bool,
    pub csv: bool,
}

impl Default for ReportFormats {
    fn default() -> Self {
        Self {
            json: true,
            html: true,
            csv: false,
        }
    }
}

pub fn write_reports(
    report: &CoverageReport,
    dir: &Path,
    formats: ReportFormats,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

    let mut written = Vec::new();

    if formats.json {
        let path = dir.join(JSON_REPORT);
        let json = serde_json::to_string_pretty(report)
            .context("Failed to serialize coverage report to JSON")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if formats.html {
        let path = dir.join(HTML_REPORT);
        fs::write(&path, render_html(report))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if formats.csv {
        let path = dir.join(CSV_REPORT);
        fs::write(&path, render_csv(report))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

pub fn render_csv(report: &CoverageReport) -> String {
    let mut out = String::from("GROUP,PACKAGE,CLASS");
    for kind in CounterKind::ALL {
        let _ = write!(out, ",{kind}_MISSED,{kind}_COVERED");
    }
    out.push('\n');

    for class in &report.classes {
        let simple = class.name.rsplit('/').next().unwrap_or(&class.name);
        let _ = write!(
            out,
            "{},{},{}",
            csv_field(&report.module),
            csv_field(&class.package().replace('/', ".")),
            csv_field(simple)
        );
        for kind in CounterKind::ALL {
            let c = class.counter(kind);
            let _ = write!(out, ",{},{}", c.missed, c.covered);
        }
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_html(report: &CoverageReport) -> String {
    let mut out = String::new();
    let title = format!("Coverage: {}", report.module);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(&title));
    out.push_str(
        "<style>\n\
         body{font-family:sans-serif;margin:2em}\n\
         table{border-collapse:collapse;margin-bottom:2em}\n\
         th,td{border:1px solid #ccc;padding:4px 8px;text-align:right}\n\
         th:first-child,td:first-child{text-align:left}\n\
         tr.pkg td{background:#eef;font-weight:bold}\n\
         .low{color:#b00}\n\
         </style>\n</head>\n<body>\n",
    );
    let _ = writeln!(out, "<h1>{}</h1>", escape(&title));

    out.push_str("<table>\n<tr><th>Element</th><th>Lines</th><th>Line %</th><th>Branches</th><th>Branch %</th><th>Methods</th></tr>\n");
    write_row(&mut out, "Total", "pkg", &totals_row(report));
    for package in report.packages() {
        let name = if package.name.is_empty() {
            "(default package)".to_string()
        } else {
            package.qualified_name()
        };
        let mut summary = ClassCoverage::new(name.clone());
        summary.counters = package.counters.clone();
        write_row(&mut out, &name, "pkg", &summary);
        for class in &package.classes {
            let simple = class.name.rsplit('/').next().unwrap_or(&class.name);
            write_row(&mut out, simple, "class", class);
        }
    }
    out.push_str("</table>\n");

    if !report.excluded.is_empty() {
        let _ = writeln!(
            out,
            "<h2>Excluded classes ({})</h2>\n<ul>",
            report.excluded.len()
        );
        for name in &report.excluded {
            let _ = writeln!(out, "<li>{}</li>", escape(&name.replace('/', ".")));
        }
        out.push_str("</ul>\n");
    }

    let _ = writeln!(out, "<p><small>digest {}</small></p>", escape(&report.digest));
    out.push_str("</body>\n</html>\n");
    out
}

fn write_row(out: &mut String, label: &str, class_attr: &str, class: &ClassCoverage) {
    let lines = class.counter(CounterKind::Line);
    let branches = class.counter(CounterKind::Branch);
    let methods = class.counter(CounterKind::Method);
    let _ = writeln!(
        out,
        "<tr class=\"{}\"><td>{}</td><td>{}</td>{}<td>{}</td>{}<td>{}</td></tr>",
        class_attr,
        escape(label),
        fraction(lines),
        percent_cell(lines),
        fraction(branches),
        percent_cell(branches),
        fraction(methods),
    );
}

fn fraction(c: Counter) -> String {
    format!("{} / {}", c.covered, c.total())
}

fn percent_cell(c: Counter) -> String {
    match c.covered_ratio() {
        Some(ratio) if ratio < 0.5 => format!("<td class=\"low\">{:.1}%</td>", ratio * 100.0),
        Some(ratio) => format!("<td>{:.1}%</td>", ratio * 100.0),
        None => "<td>n/a</td>".to_string(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn totals_row(report: &CoverageReport) -> ClassCoverage {
    let mut total = ClassCoverage::new(report.module.clone());
    total.counters = report.totals.clone();
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::model::Counters;
    use tempfile::TempDir;

    fn report() -> CoverageReport {
        let class = ClassCoverage::new("com/acme/orders/application/service/CartService")
            .with_counter(CounterKind::Line, Counter::new(2, 8))
            .with_counter(CounterKind::Branch, Counter::new(3, 1));
        let mut totals = Counters::new();
        totals.insert(CounterKind::Line, Counter::new(2, 8));
        CoverageReport {
            module: "services:orders-service".to_string(),
            classes: vec![class],
            excluded: vec!["com/acme/orders/config/DataInitializer".to_string()],
            totals,
            digest: "abc".to_string(),
        }
    }

    #[test]
    fn test_default_formats_skip_csv() {
        let dir = TempDir::new().unwrap();
        let written = write_reports(&report(), dir.path(), ReportFormats::default()).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join(JSON_REPORT).exists());
        assert!(dir.path().join(HTML_REPORT).exists());
        assert!(!dir.path().join(CSV_REPORT).exists());
    }

    #[test]
    fn test_json_report_round_trips() {
        let dir = TempDir::new().unwrap();
        write_reports(&report(), dir.path(), ReportFormats::default()).unwrap();

        let content = fs::read_to_string(dir.path().join(JSON_REPORT)).unwrap();
        let parsed: CoverageReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_html_lists_classes_and_exclusions() {
        let html = render_html(&report());
        assert!(html.contains("CartService"));
        assert!(html.contains("80.0%"));
        assert!(html.contains("class=\"low\">25.0%"));
        assert!(html.contains("com.acme.orders.config.DataInitializer"));
    }

    #[test]
    fn test_csv_layout() {
        let csv = render_csv(&report());
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("GROUP,PACKAGE,CLASS,INSTRUCTION_MISSED"));
        assert_eq!(
            lines.next().unwrap(),
            "services:orders-service,com.acme.orders.application.service,CartService,0,0,3,1,2,8,0,0,0,0"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
    }
}
