//! PHP detection: `composer.json` presence, Laravel vs. generic.

use std::path::Path;

pub fn matches(project_dir: &Path) -> bool {
    project_dir.join("composer.json").is_file()
}

pub fn detect(project_dir: &Path) -> String {
    if project_dir.join("artisan").is_file() {
        "Laravel".to_string()
    } else {
        "PHP".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn laravel_from_artisan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        fs::write(dir.path().join("artisan"), "").unwrap();
        assert_eq!(detect(dir.path()), "Laravel");
    }

    #[test]
    fn generic_php_without_artisan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        assert_eq!(detect(dir.path()), "PHP");
    }
}
