//! Node/TypeScript detection: framework order and package manager
//! derivation.
//!
//! Critical invariant: detection must not climb above `project_dir` —
//! a nested project's package manager is never influenced by a parent
//! workspace's lock files.

use std::path::Path;

use super::read_to_string_lossy;

pub fn has_package_json(project_dir: &Path) -> bool {
    project_dir.join("package.json").is_file()
}

pub fn has_typescript(project_dir: &Path) -> bool {
    has_package_json(project_dir) && project_dir.join("tsconfig.json").is_file()
}

/// Returns `(framework, package_manager)`. `typescript` only changes which
/// language this was dispatched under; the framework order is identical
/// for TS and JS projects.
pub fn detect(project_dir: &Path, _typescript: bool) -> (String, Option<String>) {
    let framework = detect_framework(project_dir);
    let package_manager = detect_package_manager(project_dir);
    (framework, package_manager)
}

/// Framework order: Next.js > Angular > Nuxt > Vite-React >
/// SvelteKit > Remix > Astro > NestJS > package.json hint > generic.
fn detect_framework(project_dir: &Path) -> String {
    let pkg = read_to_string_lossy(&project_dir.join("package.json")).unwrap_or_default();

    if has_dependency(&pkg, "next") {
        return "Next.js".to_string();
    }
    if project_dir.join("angular.json").is_file() {
        return "Angular".to_string();
    }
    if has_dependency(&pkg, "nuxt") {
        return "Nuxt".to_string();
    }
    if project_dir.join("vite.config.ts").is_file() || project_dir.join("vite.config.js").is_file()
    {
        if has_dependency(&pkg, "react") {
            return "Vite-React".to_string();
        }
    }
    if has_dependency(&pkg, "@sveltejs/kit") {
        return "SvelteKit".to_string();
    }
    if has_dependency(&pkg, "@remix-run/dev") || has_dependency(&pkg, "@remix-run/node") {
        return "Remix".to_string();
    }
    if has_dependency(&pkg, "astro") {
        return "Astro".to_string();
    }
    if has_dependency(&pkg, "@nestjs/core") {
        return "NestJS".to_string();
    }
    if has_dependency(&pkg, "react") {
        return "react".to_string();
    }
    if has_dependency(&pkg, "vue") {
        return "vue".to_string();
    }
    if has_dependency(&pkg, "express") {
        return "express".to_string();
    }
    "Node.js".to_string()
}

/// Reads `packageManager` (`name@version`, npm|yarn|pnpm only) first, then
/// falls back to lock-file presence in priority order.
fn detect_package_manager(project_dir: &Path) -> Option<String> {
    let pkg = read_to_string_lossy(&project_dir.join("package.json")).unwrap_or_default();
    if let Some(value) = json_string_field(&pkg, "packageManager") {
        if let Some((name, _version)) = value.split_once('@') {
            if matches!(name, "npm" | "yarn" | "pnpm") {
                return Some(name.to_string());
            }
        }
    }

    if project_dir.join("pnpm-lock.yaml").is_file() {
        return Some("pnpm".to_string());
    }
    if project_dir.join("pnpm-workspace.yaml").is_file() {
        return Some("pnpm".to_string());
    }
    if project_dir.join("yarn.lock").is_file() {
        return Some("yarn".to_string());
    }
    if project_dir.join("package-lock.json").is_file() {
        return Some("npm".to_string());
    }
    Some("npm".to_string())
}

/// Cheap substring probe over `"dependencies"`/`"devDependencies"` blocks
/// without pulling in a JSON parser for detection — package.json is
/// already parsed properly downstream (port resolver, runtime builder)
/// where the exact script strings matter.
fn has_dependency(package_json: &str, name: &str) -> bool {
    let needle = format!("\"{}\"", name);
    package_json.contains(&needle)
}

fn json_string_field(json: &str, field: &str) -> Option<String> {
    let needle = format!("\"{}\"", field);
    let idx = json.find(&needle)?;
    let rest = &json[idx + needle.len()..];
    let colon = rest.find(':')?;
    let rest = rest[colon + 1..].trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn next_outranks_react() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"next":"14.0.0","react":"18.0.0"}}"#,
        )
        .unwrap();
        assert_eq!(detect_framework(dir.path()), "Next.js");
    }

    #[test]
    fn pnpm_lock_outranks_npm_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()), Some("pnpm".to_string()));
    }

    #[test]
    fn package_manager_field_wins_over_lockfiles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"packageManager":"yarn@4.1.0"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("package-lock.json"), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()), Some("yarn".to_string()));
    }

    #[test]
    fn nested_project_ignores_parent_lockfile() {
        let parent = tempfile::tempdir().unwrap();
        fs::write(parent.path().join("yarn.lock"), "").unwrap();
        let nested = parent.path().join("apps/web");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("package.json"), "{}").unwrap();
        fs::write(nested.join("package-lock.json"), "").unwrap();

        assert_eq!(detect_package_manager(&nested), Some("npm".to_string()));
    }
}
