//! Python interpreter resolution: prefers a project-local virtualenv over
//! the system interpreter.

use std::path::{Path, PathBuf};

/// Resolves to `<project>/.venv/<bin>/<python>` or `<project>/venv/<bin>/<python>`
/// if either exists, else the system `python` (or `python3` on Unix, where
/// `python` alone is frequently Python 2 or absent).
pub fn resolve(project_dir: &Path) -> String {
    for venv_name in [".venv", "venv"] {
        let candidate = venv_python_path(project_dir, venv_name);
        if candidate.is_file() {
            return candidate.to_string_lossy().into_owned();
        }
    }
    system_python()
}

#[cfg(unix)]
fn venv_python_path(project_dir: &Path, venv_name: &str) -> PathBuf {
    project_dir.join(venv_name).join("bin").join("python")
}

#[cfg(windows)]
fn venv_python_path(project_dir: &Path, venv_name: &str) -> PathBuf {
    project_dir.join(venv_name).join("Scripts").join("python.exe")
}

#[cfg(unix)]
fn system_python() -> String {
    "python3".to_string()
}

#[cfg(windows)]
fn system_python() -> String {
    "python".to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn prefers_dot_venv_over_system() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".venv/bin")).unwrap();
        fs::write(dir.path().join(".venv/bin/python"), "").unwrap();
        assert_eq!(
            resolve(dir.path()),
            dir.path().join(".venv/bin/python").to_string_lossy()
        );
    }

    #[test]
    fn falls_back_to_venv_dir_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("venv/bin")).unwrap();
        fs::write(dir.path().join("venv/bin/python"), "").unwrap();
        assert_eq!(
            resolve(dir.path()),
            dir.path().join("venv/bin/python").to_string_lossy()
        );
    }

    #[test]
    fn falls_back_to_system_python_without_venv() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(dir.path()), "python3");
    }
}
