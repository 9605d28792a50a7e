//! Project detector: identify language, framework, and package manager
//! from file presence and shallow content probes.
//!
//! One module per language family. Detection never reads above
//! `project_dir` — each detector only opens files it is handed.

pub mod docker;
pub mod dotnet;
pub mod go;
pub mod java;
pub mod node;
pub mod php;
pub mod python;
pub mod rust_lang;

use std::path::Path;

use crate::error::{PolyrunError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    DotNet,
    Java,
    Go,
    Rust,
    Php,
    Docker,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::DotNet => "dotnet",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Php => "php",
            Language::Docker => "docker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub language: Language,
    pub framework: String,
    pub package_manager: Option<String>,
}

/// Runs the full ordered rule list against `project_dir`.
///
/// Language order: TypeScript > JavaScript > Python > .NET >
/// Java > Go > Rust > PHP > Docker. `host_hint` carries the manifest's
/// `host` tag (`containerapp|aks`), used only as the Docker fallback when
/// nothing else matches.
pub fn detect(project_dir: &Path, host_hint: Option<&str>) -> Result<Detection> {
    if node::has_typescript(project_dir) {
        let (framework, package_manager) = node::detect(project_dir, true);
        return Ok(Detection {
            language: Language::TypeScript,
            framework,
            package_manager,
        });
    }
    if node::has_package_json(project_dir) {
        let (framework, package_manager) = node::detect(project_dir, false);
        return Ok(Detection {
            language: Language::JavaScript,
            framework,
            package_manager,
        });
    }
    if python::matches(project_dir) {
        let (framework, package_manager) = python::detect(project_dir);
        return Ok(Detection {
            language: Language::Python,
            framework,
            package_manager,
        });
    }
    if dotnet::matches(project_dir) {
        let framework = dotnet::detect(project_dir);
        return Ok(Detection {
            language: Language::DotNet,
            framework,
            package_manager: None,
        });
    }
    if java::matches(project_dir) {
        let (framework, package_manager) = java::detect(project_dir);
        return Ok(Detection {
            language: Language::Java,
            framework,
            package_manager,
        });
    }
    if go::matches(project_dir) {
        return Ok(Detection {
            language: Language::Go,
            framework: "Go".to_string(),
            package_manager: None,
        });
    }
    if rust_lang::matches(project_dir) {
        return Ok(Detection {
            language: Language::Rust,
            framework: "Rust".to_string(),
            package_manager: None,
        });
    }
    if php::matches(project_dir) {
        let framework = php::detect(project_dir);
        return Ok(Detection {
            language: Language::Php,
            framework,
            package_manager: Some("composer".to_string()),
        });
    }
    if docker::matches(project_dir) {
        return Ok(Detection {
            language: Language::Docker,
            framework: "Docker".to_string(),
            package_manager: None,
        });
    }
    if matches!(host_hint, Some("containerapp") | Some("aks")) {
        return Ok(Detection {
            language: Language::Docker,
            framework: "Docker".to_string(),
            package_manager: None,
        });
    }
    Err(PolyrunError::LanguageUndetected(project_dir.to_path_buf()))
}

/// Reads a small file fully for a shallow text scan; returns `None` if it
/// does not exist or isn't valid UTF-8. Detectors use this instead of
/// streaming since manifests/config files here are always small.
pub(crate) fn read_to_string_lossy(path: &Path) -> Option<String> {
    std::fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_rust_over_nothing_else() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"\n").unwrap();
        let d = detect(dir.path(), None).unwrap();
        assert_eq!(d.language, Language::Rust);
    }

    #[test]
    fn undetected_without_host_hint() {
        let dir = tempfile::tempdir().unwrap();
        let err = detect(dir.path(), None);
        assert!(err.is_err());
    }

    #[test]
    fn falls_back_to_docker_with_host_hint() {
        let dir = tempfile::tempdir().unwrap();
        let d = detect(dir.path(), Some("containerapp")).unwrap();
        assert_eq!(d.language, Language::Docker);
    }

    #[test]
    fn typescript_outranks_javascript() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        let d = detect(dir.path(), None).unwrap();
        assert_eq!(d.language, Language::TypeScript);
    }
}
