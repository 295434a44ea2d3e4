use super::model::{sum_counters, ClassCoverage, CounterOverflow, CoverageReport, ExecutionTrace};
use super::pattern::{compile_all, matches_any, ClassPattern, PatternError, Separator};
use super::trace::TraceError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Turns an execution trace into a filtered, deterministic coverage report.
#[derive(Debug, Clone)]
pub struct CoverageCollector {
    exclusions: Vec<ClassPattern>,
}

impl CoverageCollector {
    pub fn new(exclusions: &[String]) -> Result<Self, PatternError> {
        Ok(Self {
            exclusions: compile_all(exclusions, Separator::Slash)?,
        })
    }

    /// Whether a compiled-class path is removed from coverage accounting.
    pub fn is_excluded(&self, class_path: &str) -> bool {
        matches_any(&self.exclusions, class_path)
            || matches_any(&self.exclusions, &format!("{}.class", class_path))
    }

    /// Fails with `TraceError::Malformed` when merged or summed counters overflow.
    pub fn collect(
        &self,
        module: &str,
        trace: ExecutionTrace,
    ) -> Result<CoverageReport, TraceError> {
        let overflow = |e: CounterOverflow| TraceError::Malformed(e.to_string());

        let mut included: BTreeMap<String, ClassCoverage> = BTreeMap::new();
        let mut excluded: Vec<String> = Vec::new();

        for class in trace.classes {
            if self.is_excluded(&class.name) {
                trace!(class = %class.name, "Excluded from coverage");
                excluded.push(class.name);
                continue;
            }
            match included.get_mut(&class.name) {
                Some(existing) => existing.merge(&class).map_err(overflow)?,
                None => {
                    included.insert(class.name.clone(), class);
                }
            }
        }

        excluded.sort();
        excluded.dedup();

        let classes: Vec<ClassCoverage> = included.into_values().collect();
        let totals = sum_counters(module, &classes).map_err(overflow)?;
        let digest = digest(&classes, &excluded);

        debug!(
            module,
            classes = classes.len(),
            excluded = excluded.len(),
            "Coverage collected"
        );

        Ok(CoverageReport {
            module: module.to_string(),
            classes,
            excluded,
            totals,
            digest,
        })
    }
}

fn digest(classes: &[ClassCoverage], excluded: &[String]) -> String {
    let mut hasher = Sha256::new();
    for class in classes {
        hasher.update(b"+");
        hasher.update(class.name.as_bytes());
        for (kind, counter) in &class.counters {
            hasher.update(format!(";{}={}/{}", kind, counter.missed, counter.covered).as_bytes());
        }
        hasher.update(b"\n");
    }
    for name in excluded {
        hasher.update(b"-");
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
