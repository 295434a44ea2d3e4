//! LCOV tracefiles
//!
//! LCOV is keyed by source file. Each `SF:` record becomes one class whose
//! name is the source path with the source root and extension stripped, so
//! `services/orders/src/main/java/com/acme/Cart.java` becomes `com/acme/Cart`.

use super::model::{ClassCoverage, Counter, CounterKind, ExecutionTrace};
use super::trace::TraceError;
use std::collections::BTreeMap;

pub const DEFAULT_SOURCE_ROOTS: &[&str] = &[
    "src/main/java/",
    "src/main/kotlin/",
    "src/main/scala/",
    "src/",
];

#[derive(Default)]
struct Record {
    source: String,
    lines: BTreeMap<u64, u64>,
    branches: Counter,
    functions: BTreeMap<String, u64>,
}

pub fn parse(content: &str, source_roots: &[String]) -> Result<ExecutionTrace, TraceError> {
    let mut classes = Vec::new();
    let mut current: Option<Record> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lineno = idx + 1;

        if let Some(path) = line.strip_prefix("SF:") {
            if current.is_some() {
                return Err(malformed(lineno, "SF without end_of_record"));
            }
            current = Some(Record {
                source: path.trim().to_string(),
                ..Record::default()
            });
            continue;
        }

        if line == "end_of_record" {
            let record = current
                .take()
                .ok_or_else(|| malformed(lineno, "end_of_record without SF"))?;
            classes.push(into_class(record, source_roots));
            continue;
        }

        let Some(record) = current.as_mut() else {
            // TN: and other header records may precede SF
            continue;
        };

        if let Some(rest) = line.strip_prefix("DA:") {
            let mut parts = rest.split(',');
            let number = parse_u64(parts.next(), lineno)?;
            let hits = parse_u64(parts.next(), lineno)?;
            accumulate(record.lines.entry(number).or_insert(0), hits, lineno)?;
        } else if let Some(rest) = line.strip_prefix("BRDA:") {
            let taken = rest.rsplit(',').next().unwrap_or("-");
            if taken == "-" || taken == "0" {
                record.branches.missed += 1;
            } else {
                record.branches.covered += 1;
            }
        } else if let Some(rest) = line.strip_prefix("FN:") {
            if let Some((_, name)) = rest.split_once(',') {
                record.functions.entry(name.to_string()).or_insert(0);
            }
        } else if let Some(rest) = line.strip_prefix("FNDA:") {
            if let Some((hits, name)) = rest.split_once(',') {
                let hits = parse_u64(Some(hits), lineno)?;
                accumulate(record.functions.entry(name.to_string()).or_insert(0), hits, lineno)?;
            }
        }
    }

    if current.is_some() {
        return Err(TraceError::Malformed(
            "LCOV tracefile ended inside a record".to_string(),
        ));
    }

    Ok(ExecutionTrace { classes })
}

fn into_class(record: Record, source_roots: &[String]) -> ClassCoverage {
    let name = class_name(&record.source, source_roots);
    let file_name = record
        .source
        .rsplit('/')
        .next()
        .map(str::to_string);

    let covered_lines = record.lines.values().filter(|hits| **hits > 0).count() as u64;
    let lines = Counter::new(record.lines.len() as u64 - covered_lines, covered_lines);

    let covered_fns = record.functions.values().filter(|hits| **hits > 0).count() as u64;
    let methods = Counter::new(record.functions.len() as u64 - covered_fns, covered_fns);

    let mut class = ClassCoverage::new(name)
        .with_counter(CounterKind::Line, lines)
        .with_counter(CounterKind::Method, methods);
    if record.branches.total() > 0 {
        class.counters.insert(CounterKind::Branch, record.branches);
    }
    class.source_file = file_name;
    class
}

/// Strips the first matching source root and the file extension.
pub fn class_name(source: &str, source_roots: &[String]) -> String {
    let normalized = source.replace('\\', "/");
    let mut relative = normalized.as_str();

    for root in source_roots {
        if let Some(pos) = find_root(relative, root) {
            relative = &relative[pos + root.len()..];
            break;
        }
    }

    let relative = relative.trim_start_matches('/');
    match relative.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem.to_string(),
        _ => relative.to_string(),
    }
}

fn find_root(path: &str, root: &str) -> Option<usize> {
    if path.starts_with(root) {
        return Some(0);
    }
    let needle = format!("/{}", root);
    path.rfind(&needle).map(|pos| pos + 1)
}

fn parse_u64(field: Option<&str>, lineno: usize) -> Result<u64, TraceError> {
    let raw = field.ok_or_else(|| malformed(lineno, "missing field"))?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| malformed(lineno, &format!("not a number: {}", raw)))
}

fn accumulate(total: &mut u64, hits: u64, lineno: usize) -> Result<(), TraceError> {
    *total = total
        .checked_add(hits)
        .ok_or_else(|| malformed(lineno, "hit count overflows"))?;
    Ok(())
}

fn malformed(lineno: usize, message: &str) -> TraceError {
    TraceError::Malformed(format!("LCOV line {}: {}", lineno, message))
}
