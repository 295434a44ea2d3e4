//! CLI integration tests
//!
//! Exercise the `covgate` binary against throwaway Gradle layouts whose test
//! command is a shell script that drops prepared JUnit and JaCoCo files
//! where Gradle would.

mod support;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use support::{class, covgate_binary, gradle_workspace, jacoco_report, junit_report, ClassLines};
use tempfile::TempDir;

const COPY_OUTPUTS: &str = "cd '{dir}' && mkdir -p build/test-results/test build/reports/jacoco/test \
    && cp fixture-junit.xml build/test-results/test/TEST-fixture.xml \
    && cp fixture-jacoco.xml build/reports/jacoco/test/jacocoTestReport.xml";

fn covgate(args: &[&str]) -> Output {
    Command::new(covgate_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("COVGATE_JOBS")
        .env_remove("COVGATE_MIN_RATIO")
        .env_remove("COVGATE_TEST_TIMEOUT")
        .output()
        .expect("Failed to execute covgate")
}

fn prepare_module(root: &Path, dir: &str, classes: &[ClassLines], failing: &[&str]) {
    let module_dir = root.join(dir);
    let failing: Vec<String> = failing.iter().map(|s| s.to_string()).collect();
    fs::write(
        module_dir.join("fixture-junit.xml"),
        junit_report("com.acme.FixtureTest", &["contextLoads".to_string()], &failing),
    )
    .unwrap();
    fs::write(module_dir.join("fixture-jacoco.xml"), jacoco_report(dir, classes)).unwrap();
}

/// ecommerce workspace whose modules all pass unless a test overrides them
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    gradle_workspace(root);
    fs::write(
        root.join("covgate.toml"),
        format!("jobs = 2\n\n[test]\ncommand = \"{}\"\n", COPY_OUTPUTS),
    )
    .unwrap();

    let healthy = [class(
        "com/acme/catalog/application/service/ProductService",
        2,
        98,
    )];
    for module in ["libs", "services/catalog-service", "services/order-service"] {
        prepare_module(root, module, &healthy, &[]);
    }
    dir
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help() {
    let output = covgate(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("run"));
    assert!(text.contains("modules"));
    assert!(text.contains("config"));
}

#[test]
fn test_cli_version() {
    let output = covgate(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_shows_default_exclusions() {
    let dir = TempDir::new().unwrap();
    let output = covgate(&["config", dir.path().to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("Covgate Configuration:"));
    assert!(text.contains("**/infrastructure/**"));
    assert!(text.contains("**/DataInitializer*"));
}

#[test]
fn test_config_json() {
    let dir = workspace();
    let output = covgate(&["config", dir.path().to_str().unwrap(), "--format", "json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["jobs"], 2);
    assert_eq!(value["coverage"]["exclusions"].as_array().unwrap().len(), 4);
}

#[test]
fn test_invalid_config_is_usage_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("covgate.toml"), "jobs = \"many\"\n").unwrap();
    let output = covgate(&["config", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_modules_lists_gradle_projects() {
    let dir = workspace();
    let output = covgate(&["modules", dir.path().to_str().unwrap(), "-f", "json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["group"], "com.acme");
    let names: Vec<&str> = value["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["libs", "services:catalog-service", "services:order-service"]
    );
    assert_eq!(value["modules"][2]["dependencies"][0], "libs");
}

#[test]
fn test_run_passes() {
    let dir = workspace();
    let output = covgate(&["run", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));

    let text = stdout(&output);
    assert!(text.contains("Coverage Gate Passed"));
    assert!(text.contains("3 passed, 0 failed"));
    assert!(dir
        .path()
        .join("libs/build/reports/covgate/coverage.json")
        .is_file());
}

#[test]
fn test_run_fails_on_low_coverage() {
    let dir = workspace();
    prepare_module(
        dir.path(),
        "services/catalog-service",
        &[class(
            "com/acme/catalog/application/service/ProductService",
            21,
            79,
        )],
        &[],
    );

    let output = covgate(&["run", dir.path().to_str().unwrap(), "--format", "json"]);
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let catalog = &value["modules"][1];
    assert_eq!(catalog["module"], "services:catalog-service");
    assert_eq!(catalog["state"], "FAILED");
    assert_eq!(catalog["error"]["kind"], "coverage_violation");
    assert_eq!(value["modules"][0]["state"], "PASSED");
    assert_eq!(value["modules"][2]["state"], "PASSED");
}

#[test]
fn test_run_fails_on_test_failure() {
    let dir = workspace();
    prepare_module(dir.path(), "libs", &[], &["parsesMoney"]);

    let output = covgate(&["run", dir.path().to_str().unwrap(), "-m", "libs"]);
    assert_eq!(output.status.code(), Some(1));

    let text = stdout(&output);
    assert!(text.contains("libs [FAILED]"));
    assert!(text.contains("parsesMoney"));
    assert!(!dir.path().join("libs/build/reports/covgate").exists());
}

#[test]
fn test_min_ratio_override() {
    let dir = workspace();
    let output = covgate(&[
        "run",
        dir.path().to_str().unwrap(),
        "-m",
        "services:catalog-service",
        "--min-ratio",
        "0.99",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("expected minimum is 0.99"));
}

#[test]
fn test_unknown_module_is_usage_error() {
    let dir = workspace();
    let output = covgate(&["run", dir.path().to_str().unwrap(), "-m", "billing"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_zero_jobs_is_usage_error() {
    let dir = workspace();
    let output = covgate(&["run", dir.path().to_str().unwrap(), "--jobs", "0"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_output_file() {
    let dir = workspace();
    let out = dir.path().join("summary.yaml");
    let output = covgate(&[
        "run",
        dir.path().to_str().unwrap(),
        "-f",
        "yaml",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("state: PASSED"));
}
