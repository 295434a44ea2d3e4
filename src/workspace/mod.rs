//! Module discovery
//!
//! Modules are taken from `[[modules]]` in the configuration when present,
//! otherwise from the Gradle settings file. A project without includes is
//! treated as a single module rooted at the workspace.

pub mod gradle;

use crate::config::CovgateConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Workspace root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("No modules found in {0}: configure [[modules]] or add a Gradle settings file")]
    NoModules(PathBuf),

    #[error("No group configured for module {0}: set `group` in covgate.toml or the root build file")]
    MissingGroup(String),

    #[error("Module directory {path} for {module} does not exist")]
    MissingModuleDir { module: String, path: PathBuf },

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One module of the workspace, fixed for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// `services:catalog-service`
    pub name: String,
    /// `:services:catalog-service`, empty for the root project
    pub gradle_path: String,
    pub dir: PathBuf,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub trace_path: PathBuf,
    pub test_results_dir: PathBuf,
    pub report_dir: PathBuf,
}

impl Module {
    /// Module with the default Gradle + JaCoCo locations under `dir`.
    pub fn new(name: impl Into<String>, dir: PathBuf, group: impl Into<String>) -> Self {
        let name = name.into();
        let defaults = CovgateConfig::default();
        Self {
            gradle_path: gradle_path(&name),
            group: group.into(),
            version: None,
            dependencies: Vec::new(),
            trace_path: dir.join(&defaults.coverage.trace),
            test_results_dir: dir.join(&defaults.test.results_dir),
            report_dir: dir.join(&defaults.coverage.report_dir),
            dir,
            name,
        }
    }

    /// Matches the module name with or without the Gradle leading colon.
    pub fn matches(&self, selector: &str) -> bool {
        self.name == selector.trim_start_matches(':')
    }
}

fn gradle_path(name: &str) -> String {
    if name.is_empty() || name == "." {
        String::new()
    } else {
        format!(":{}", name.trim_start_matches(':'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub modules: Vec<Module>,
}

impl Workspace {
    pub fn discover(root: &Path, config: &CovgateConfig) -> Result<Self, WorkspaceError> {
        if !root.is_dir() {
            return Err(WorkspaceError::RootNotFound(root.to_path_buf()));
        }

        let root_build = match gradle::build_file(root) {
            Some(path) => Some(read(&path)?),
            None => None,
        };
        let group = config.group.clone().or_else(|| {
            root_build
                .as_deref()
                .and_then(|b| gradle::parse_property(b, "group"))
        });
        let version = config.version.clone().or_else(|| {
            root_build
                .as_deref()
                .and_then(|b| gradle::parse_property(b, "version"))
        });

        let declared: Vec<(String, Option<PathBuf>)> = if !config.modules.is_empty() {
            config
                .modules
                .iter()
                .map(|m| (m.name.trim_start_matches(':').to_string(), m.path.clone()))
                .collect()
        } else if let Some(settings) = gradle::settings_file(root) {
            let includes = gradle::parse_includes(&read(&settings)?);
            debug!(settings = %settings.display(), includes = includes.len(), "Read Gradle settings");
            if includes.is_empty() && root_build.is_some() {
                vec![(String::new(), Some(PathBuf::from(".")))]
            } else {
                includes.into_iter().map(|name| (name, None)).collect()
            }
        } else if root_build.is_some() {
            vec![(String::new(), Some(PathBuf::from(".")))]
        } else {
            Vec::new()
        };

        if declared.is_empty() {
            return Err(WorkspaceError::NoModules(root.to_path_buf()));
        }

        let mut modules = Vec::with_capacity(declared.len());
        for (name, path) in declared {
            modules.push(build_module(root, config, name, path, &group, &version)?);
        }

        info!(
            root = %root.display(),
            modules = modules.len(),
            group = group.as_deref().unwrap_or("-"),
            "Workspace discovered"
        );

        Ok(Self {
            root: root.to_path_buf(),
            group,
            version,
            modules,
        })
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.matches(name))
    }

    /// Modules named by `selectors`, in workspace order. Empty selects all.
    pub fn select(&self, selectors: &[String]) -> Result<Vec<Module>, WorkspaceError> {
        if selectors.is_empty() {
            return Ok(self.modules.clone());
        }
        if let Some(unknown) = selectors.iter().find(|s| self.module(s).is_none()) {
            return Err(WorkspaceError::UnknownModule(unknown.clone()));
        }
        Ok(self
            .modules
            .iter()
            .filter(|m| selectors.iter().any(|s| m.matches(s)))
            .cloned()
            .collect())
    }
}

fn build_module(
    root: &Path,
    config: &CovgateConfig,
    name: String,
    path: Option<PathBuf>,
    group: &Option<String>,
    version: &Option<String>,
) -> Result<Module, WorkspaceError> {
    let overrides = config.module_config(&name);
    let relative = path.unwrap_or_else(|| gradle::project_dir(&name));
    let dir = if relative == Path::new(".") {
        root.to_path_buf()
    } else {
        root.join(&relative)
    };

    let display_name = if name.is_empty() {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string())
    } else {
        name.clone()
    };

    if !dir.is_dir() {
        return Err(WorkspaceError::MissingModuleDir {
            module: display_name,
            path: dir,
        });
    }

    let group = overrides
        .and_then(|m| m.group.clone())
        .or_else(|| group.clone())
        .ok_or_else(|| WorkspaceError::MissingGroup(display_name.clone()))?;

    let mut dependencies = overrides.map(|m| m.depends_on.clone()).unwrap_or_default();
    if let Some(build) = gradle::build_file(&dir) {
        for dep in gradle::parse_project_dependencies(&read(&build)?) {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }
    } else if !name.is_empty() {
        warn!(module = %display_name, "Module has no Gradle build file");
    }

    let trace = overrides
        .and_then(|m| m.trace.clone())
        .unwrap_or_else(|| config.coverage.trace.clone());

    Ok(Module {
        gradle_path: gradle_path(&name),
        name: display_name,
        group,
        version: version.clone(),
        dependencies,
        trace_path: dir.join(trace),
        test_results_dir: dir.join(&config.test.results_dir),
        report_dir: dir.join(&config.coverage.report_dir),
        dir,
    })
}

fn read(path: &Path) -> Result<String, WorkspaceError> {
    fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use tempfile::TempDir;

    fn ecommerce() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(
            root.join("settings.gradle.kts"),
            "rootProject.name = \"ecommerce\"\ninclude(\"libs\")\ninclude(\":services:catalog-service\")\n",
        )
        .unwrap();
        fs::write(
            root.join("build.gradle.kts"),
            "allprojects {\n    group = \"com.tuempresa.ecommerce\"\n    version = \"0.1.0-SNAPSHOT\"\n}\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("libs")).unwrap();
        fs::write(root.join("libs/build.gradle.kts"), "plugins { java }\n").unwrap();
        fs::create_dir_all(root.join("services/catalog-service")).unwrap();
        fs::write(
            root.join("services/catalog-service/build.gradle.kts"),
            "dependencies {\n    implementation(project(\":libs\"))\n}\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_discover_from_settings() {
        let dir = ecommerce();
        let ws = Workspace::discover(dir.path(), &CovgateConfig::default()).unwrap();

        assert_eq!(ws.group.as_deref(), Some("com.tuempresa.ecommerce"));
        assert_eq!(ws.version.as_deref(), Some("0.1.0-SNAPSHOT"));
        let names: Vec<&str> = ws.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["libs", "services:catalog-service"]);

        let catalog = ws.module(":services:catalog-service").unwrap();
        assert_eq!(catalog.gradle_path, ":services:catalog-service");
        assert_eq!(catalog.dir, dir.path().join("services/catalog-service"));
        assert_eq!(catalog.dependencies, vec!["libs".to_string()]);
        assert_eq!(
            catalog.trace_path,
            dir.path()
                .join("services/catalog-service/build/reports/jacoco/test/jacocoTestReport.xml")
        );
        assert_eq!(catalog.group, "com.tuempresa.ecommerce");
    }

    #[test]
    fn test_configured_modules_take_precedence() {
        let dir = ecommerce();
        let mut config = CovgateConfig::default();
        config.group = Some("com.acme".to_string());
        config.modules = vec![ModuleConfig {
            name: "libs".to_string(),
            group: Some("com.acme.libs".to_string()),
            trace: Some(PathBuf::from("coverage/lcov.info")),
            ..Default::default()
        }];

        let ws = Workspace::discover(dir.path(), &config).unwrap();
        assert_eq!(ws.modules.len(), 1);
        assert_eq!(ws.modules[0].group, "com.acme.libs");
        assert_eq!(ws.modules[0].trace_path, dir.path().join("libs/coverage/lcov.info"));
    }

    #[test]
    fn test_select() {
        let dir = ecommerce();
        let ws = Workspace::discover(dir.path(), &CovgateConfig::default()).unwrap();

        let selected = ws.select(&["services:catalog-service".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(ws.select(&[]).unwrap().len(), 2);
        assert!(matches!(
            ws.select(&["nope".to_string()]),
            Err(WorkspaceError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_single_project() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("build.gradle"), "group = 'org.example'\n").unwrap();

        let ws = Workspace::discover(dir.path(), &CovgateConfig::default()).unwrap();
        assert_eq!(ws.modules.len(), 1);
        assert_eq!(ws.modules[0].gradle_path, "");
        assert_eq!(ws.modules[0].dir, dir.path());
    }

    #[test]
    fn test_missing_group() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("settings.gradle"), "include 'app'\n").unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();

        let err = Workspace::discover(dir.path(), &CovgateConfig::default()).unwrap_err();
        assert!(matches!(err, WorkspaceError::MissingGroup(ref m) if m == "app"));
    }

    #[test]
    fn test_missing_module_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("settings.gradle"), "include 'ghost'\n").unwrap();
        let err = Workspace::discover(dir.path(), &CovgateConfig::default()).unwrap_err();
        assert!(matches!(err, WorkspaceError::MissingModuleDir { .. }));
    }

    #[test]
    fn test_no_modules() {
        let dir = TempDir::new().unwrap();
        let err = Workspace::discover(dir.path(), &CovgateConfig::default()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NoModules(_)));
    }
}
