//! Python detection: framework order Django > FastAPI > Flask > Streamlit
//! > Gradio > generic, package manager uv > poetry > pyproject table >
//! Pipfile > pip default.

use std::path::Path;

use super::read_to_string_lossy;

pub fn matches(project_dir: &Path) -> bool {
    project_dir.join("requirements.txt").is_file()
        || project_dir.join("pyproject.toml").is_file()
        || project_dir.join("poetry.lock").is_file()
        || project_dir.join("uv.lock").is_file()
}

pub fn detect(project_dir: &Path) -> (String, Option<String>) {
    (detect_framework(project_dir), Some(detect_package_manager(project_dir)))
}

fn detect_framework(project_dir: &Path) -> String {
    if project_dir.join("manage.py").is_file() {
        return "Django".to_string();
    }
    if scan_imports(project_dir, "fastapi") {
        return "FastAPI".to_string();
    }
    if scan_imports(project_dir, "flask") {
        return "Flask".to_string();
    }
    if scan_imports(project_dir, "streamlit") {
        return "Streamlit".to_string();
    }
    if scan_imports(project_dir, "gradio") {
        return "Gradio".to_string();
    }
    "Python".to_string()
}

fn detect_package_manager(project_dir: &Path) -> String {
    if project_dir.join("uv.lock").is_file() {
        return "uv".to_string();
    }
    if project_dir.join("poetry.lock").is_file() {
        return "poetry".to_string();
    }
    let pyproject = read_to_string_lossy(&project_dir.join("pyproject.toml")).unwrap_or_default();
    if pyproject.contains("[tool.uv]") {
        return "uv".to_string();
    }
    if pyproject.contains("[tool.poetry]") {
        return "poetry".to_string();
    }
    if project_dir.join("Pipfile.lock").is_file() || project_dir.join("Pipfile").is_file() {
        return "pipenv".to_string();
    }
    "pip".to_string()
}

/// Shallow import scan over every top-level `.py` file plus `requirements.txt`,
/// since entry modules are not known at detection time.
fn scan_imports(project_dir: &Path, package: &str) -> bool {
    if let Some(reqs) = read_to_string_lossy(&project_dir.join("requirements.txt")) {
        if reqs
            .lines()
            .any(|line| line.trim().to_lowercase().starts_with(package))
        {
            return true;
        }
    }

    let Ok(entries) = std::fs::read_dir(project_dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }
        if let Some(contents) = read_to_string_lossy(&path) {
            let import_line = format!("import {}", package);
            let from_line = format!("from {}", package);
            if contents
                .lines()
                .any(|l| l.trim_start().starts_with(&import_line) || l.trim_start().starts_with(&from_line))
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn django_outranks_fastapi() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manage.py"), "").unwrap();
        fs::write(dir.path().join("main.py"), "from fastapi import FastAPI\n").unwrap();
        assert_eq!(detect_framework(dir.path()), "Django");
    }

    #[test]
    fn fastapi_from_requirements() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "fastapi==0.100.0\nuvicorn\n").unwrap();
        assert_eq!(detect_framework(dir.path()), "FastAPI");
    }

    #[test]
    fn uv_lock_outranks_poetry_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("uv.lock"), "").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[tool.poetry]\n").unwrap();
        assert_eq!(detect_package_manager(dir.path()), "uv");
    }
}
