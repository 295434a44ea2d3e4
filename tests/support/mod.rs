//! Shared fixtures for the integration tests
//!
//! `FakeExecutor` stands in for Gradle: for each module it writes the JUnit
//! XML and JaCoCo report a real `test` + `jacocoTestReport` run would leave
//! behind, then reports the outcome the way `ProcessTestExecutor` does.

#![allow(dead_code)]

use async_trait::async_trait;
use covgate::config::CovgateConfig;
use covgate::runner::{junit, RunnerError, TestExecutor, TestInvocation, TestOutcome};
use covgate::{Module, ModuleSettings};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const GROUP: &str = "com.acme";

pub fn covgate_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("covgate")
}

/// Line counters of one class, `name` in JVM form (`com/acme/Foo`)
#[derive(Debug, Clone)]
pub struct ClassLines {
    pub name: String,
    pub missed: u64,
    pub covered: u64,
}

pub fn class(name: &str, missed: u64, covered: u64) -> ClassLines {
    ClassLines {
        name: name.to_string(),
        missed,
        covered,
    }
}

pub fn jacoco_report(module: &str, classes: &[ClassLines]) -> String {
    let mut packages: BTreeMap<&str, Vec<&ClassLines>> = BTreeMap::new();
    for class in classes {
        let package = class.name.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
        packages.entry(package).or_default().push(class);
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <!DOCTYPE report PUBLIC \"-//JACOCO//DTD Report 1.1//EN\" \"report.dtd\">\n",
    );
    xml.push_str(&format!("<report name=\"{}\">\n", module));
    xml.push_str("  <sessioninfo id=\"ci-1\" start=\"1700000000000\" dump=\"1700000005000\"/>\n");
    for (package, classes) in packages {
        xml.push_str(&format!("  <package name=\"{}\">\n", package));
        for class in classes {
            let simple = class.name.rsplit('/').next().unwrap_or(&class.name);
            xml.push_str(&format!(
                "    <class name=\"{}\" sourcefilename=\"{}.java\">\n",
                class.name, simple
            ));
            xml.push_str(&format!(
                "      <counter type=\"INSTRUCTION\" missed=\"{}\" covered=\"{}\"/>\n",
                class.missed.saturating_mul(4),
                class.covered.saturating_mul(4)
            ));
            xml.push_str(&format!(
                "      <counter type=\"LINE\" missed=\"{}\" covered=\"{}\"/>\n",
                class.missed, class.covered
            ));
            xml.push_str("    </class>\n");
        }
        xml.push_str("  </package>\n");
    }
    xml.push_str("</report>\n");
    xml
}

pub fn junit_report(suite: &str, passing: &[String], failing: &[String]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\">\n",
        suite,
        passing.len() + failing.len(),
        failing.len()
    );
    for name in passing {
        xml.push_str(&format!(
            "  <testcase name=\"{}\" classname=\"{}\" time=\"0.012\"/>\n",
            name, suite
        ));
    }
    for name in failing {
        xml.push_str(&format!(
            "  <testcase name=\"{}\" classname=\"{}\" time=\"0.020\">\n    <failure message=\"expected: &lt;200&gt; but was: &lt;500&gt;\" type=\"org.opentest4j.AssertionFailedError\">org.opentest4j.AssertionFailedError</failure>\n  </testcase>\n",
            name, suite
        ));
    }
    xml.push_str("</testsuite>\n");
    xml
}

/// What the fake harness produces for one module
#[derive(Debug, Clone)]
pub struct ModulePlan {
    pub classes: Vec<ClassLines>,
    pub passing: Vec<String>,
    pub failing: Vec<String>,
    pub write_trace: bool,
}

impl Default for ModulePlan {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            passing: vec!["contextLoads".to_string()],
            failing: Vec::new(),
            write_trace: true,
        }
    }
}

impl ModulePlan {
    pub fn covering(classes: Vec<ClassLines>) -> Self {
        Self {
            classes,
            ..Default::default()
        }
    }

    pub fn with_failure(mut self, test: &str) -> Self {
        self.failing.push(test.to_string());
        self
    }

    pub fn without_trace(mut self) -> Self {
        self.write_trace = false;
        self
    }
}

#[derive(Default)]
pub struct FakeExecutor {
    plans: HashMap<String, ModulePlan>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    invoked: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, module: &str, plan: ModulePlan) -> Self {
        self.plans.insert(module.to_string(), plan);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of modules that were testing at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }

    fn write_outputs(&self, invocation: &TestInvocation) -> Result<TestOutcome, RunnerError> {
        let plan = self
            .plans
            .get(&invocation.module)
            .cloned()
            .unwrap_or_default();
        let io = |e: std::io::Error| RunnerError::Results(e.to_string());

        let suite = format!(
            "{}.{}Test",
            GROUP,
            invocation.module.replace([':', '-'], "_")
        );
        fs::create_dir_all(&invocation.results_dir).map_err(io)?;
        fs::write(
            invocation.results_dir.join(format!("TEST-{}.xml", suite)),
            junit_report(&suite, &plan.passing, &plan.failing),
        )
        .map_err(io)?;

        if plan.write_trace {
            if let Some(parent) = invocation.trace_path.parent() {
                fs::create_dir_all(parent).map_err(io)?;
            }
            fs::write(
                &invocation.trace_path,
                jacoco_report(&invocation.module, &plan.classes),
            )
            .map_err(io)?;
        }

        let cases = junit::collect_results(&invocation.results_dir)
            .map_err(|e| RunnerError::Results(format!("{:#}", e)))?;

        Ok(TestOutcome {
            exit_code: Some(if plan.failing.is_empty() { 0 } else { 1 }),
            cases,
            duration: self.delay,
            trace_path: invocation.trace_path.clone(),
            output_tail: String::new(),
        })
    }
}

#[async_trait]
impl TestExecutor for FakeExecutor {
    async fn execute(&self, invocation: &TestInvocation) -> Result<TestOutcome, RunnerError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        self.invoked.lock().unwrap().push(invocation.module.clone());

        tokio::time::sleep(self.delay).await;
        let outcome = self.write_outputs(invocation);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Module directory under `root` with default Gradle output locations
pub fn module(root: &Path, name: &str) -> Module {
    let dir = root.join(name.replace(':', "/"));
    fs::create_dir_all(&dir).unwrap();
    Module::new(name, dir, GROUP)
}

pub fn default_settings(root: &Path, module: &Module) -> ModuleSettings {
    CovgateConfig::default().settings_for(module, root)
}

/// Multi-module Gradle project with the usual ecommerce layout
pub fn gradle_workspace(root: &Path) {
    fs::write(
        root.join("settings.gradle.kts"),
        r#"rootProject.name = "ecommerce"

include("libs")
include(
    ":services:catalog-service",
    ":services:order-service",
)
"#,
    )
    .unwrap();
    fs::write(
        root.join("build.gradle.kts"),
        "group = \"com.acme\"\nversion = \"1.0.0\"\n",
    )
    .unwrap();
    for dir in ["libs", "services/catalog-service", "services/order-service"] {
        fs::create_dir_all(root.join(dir).join("src/main/java")).unwrap();
        fs::write(root.join(dir).join("build.gradle.kts"), "plugins { java }\n").unwrap();
    }
    fs::write(
        root.join("services/order-service/build.gradle.kts"),
        "plugins { java }\n\ndependencies {\n    implementation(project(\":libs\"))\n}\n",
    )
    .unwrap();
}
