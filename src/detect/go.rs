//! Go detection: `go.mod` presence.

use std::path::Path;

pub fn matches(project_dir: &Path) -> bool {
    project_dir.join("go.mod").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_go_mod() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module demo\n").unwrap();
        assert!(matches(dir.path()));
    }
}
