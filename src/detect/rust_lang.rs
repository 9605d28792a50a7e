//! Rust detection: `Cargo.toml` presence.
//!
//! Named `rust_lang` rather than `rust` to avoid shadowing the `rust`
//! keyword-adjacent crate name `polyrun` would otherwise collide with in
//! `use` paths under `crate::detect::rust`.

use std::path::Path;

pub fn matches(project_dir: &Path) -> bool {
    project_dir.join("Cargo.toml").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_cargo_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        assert!(matches(dir.path()));
    }
}
