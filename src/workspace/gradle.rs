//! Gradle build files (Groovy and Kotlin DSL)

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const SETTINGS_FILES: [&str; 2] = ["settings.gradle.kts", "settings.gradle"];
pub const BUILD_FILES: [&str; 2] = ["build.gradle.kts", "build.gradle"];

fn find_first(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|n| dir.join(n)).find(|p| p.is_file())
}

pub fn settings_file(root: &Path) -> Option<PathBuf> {
    find_first(root, &SETTINGS_FILES)
}

pub fn build_file(dir: &Path) -> Option<PathBuf> {
    find_first(dir, &BUILD_FILES)
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn quoted(text: &str) -> Vec<String> {
    static QUOTED: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = QUOTED.get_or_init(|| Regex::new(r#"["']([^"']+)["']"#).ok()) else {
        return Vec::new();
    };
    re.captures_iter(text).map(|c| c[1].to_string()).collect()
}

/// Project paths from `include(...)` / `include '...'` lines, without the leading colon.
pub fn parse_includes(settings: &str) -> Vec<String> {
    let mut projects: Vec<String> = Vec::new();
    let mut open_paren = false;

    for line in settings.lines() {
        let trimmed = strip_line_comment(line).trim();

        let args = if open_paren {
            trimmed
        } else if let Some(rest) = trimmed.strip_prefix("include") {
            // includeBuild and friends are not project includes
            if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
                continue;
            }
            let rest = rest.trim_start();
            if let Some(inner) = rest.strip_prefix('(') {
                open_paren = true;
                inner
            } else {
                rest
            }
        } else {
            continue;
        };

        let args = match args.find(')') {
            Some(idx) if open_paren => {
                open_paren = false;
                &args[..idx]
            }
            _ => args,
        };

        for project in quoted(args) {
            let project = project.trim().trim_start_matches(':').to_string();
            if !project.is_empty() && !projects.contains(&project) {
                projects.push(project);
            }
        }
    }

    projects
}

/// `group = "..."` or `version = '...'`, wherever it is assigned.
pub fn parse_property(build: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"^\s*(?:project\.)?{}\s*=\s*["']([^"']+)["']"#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    build
        .lines()
        .map(strip_line_comment)
        .find_map(|line| re.captures(line).map(|c| c[1].to_string()))
}

/// Projects referenced with `project(":...")`, without the leading colon.
pub fn parse_project_dependencies(build: &str) -> Vec<String> {
    static PROJECT: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = PROJECT.get_or_init(|| {
        Regex::new(r#"project\s*\(\s*(?:path\s*[:=]\s*)?["'](:[^"']*)["']"#).ok()
    }) else {
        return Vec::new();
    };

    let mut deps: Vec<String> = Vec::new();
    for line in build.lines().map(strip_line_comment) {
        for cap in re.captures_iter(line) {
            let dep = cap[1].trim_start_matches(':').to_string();
            if !dep.is_empty() && !deps.contains(&dep) {
                deps.push(dep);
            }
        }
    }
    deps
}

/// `services:catalog-service` lives in `services/catalog-service`.
pub fn project_dir(project: &str) -> PathBuf {
    project
        .trim_start_matches(':')
        .split(':')
        .filter(|s| !s.is_empty())
        .collect()
}
