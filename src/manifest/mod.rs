//! Manifest loader: locate `polyrun.yaml` by walking upward from the
//! current directory, stopping at the first match or at a repository-root
//! marker (`.git`), then parse it into the typed model in [`model`].

pub mod model;

pub use model::{Manifest, Requirement, Resource, Service};

use std::path::{Path, PathBuf};

use crate::error::{PolyrunError, Result};

pub const MANIFEST_FILENAMES: [&str; 2] = ["polyrun.yaml", "polyrun.yml"];

/// Walks upward from `start` looking for a manifest file, stopping once a
/// `.git` directory is seen (repository-root marker).
pub fn locate(start: &Path) -> Result<PathBuf> {
    let mut dir = start
        .canonicalize()
        .map_err(|_| PolyrunError::ManifestMissing(start.to_path_buf()))?;

    loop {
        for name in MANIFEST_FILENAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        if dir.join(".git").exists() {
            return Err(PolyrunError::ManifestMissing(start.to_path_buf()));
        }

        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return Err(PolyrunError::ManifestMissing(start.to_path_buf())),
        }
    }
}

/// Loads and parses the manifest found from `start`, or from an explicit
/// `override_path` when the operator passed `--manifest`.
pub async fn load(start: &Path, override_path: Option<&Path>) -> Result<(PathBuf, Manifest)> {
    let manifest_path = match override_path {
        Some(p) => p.to_path_buf(),
        None => locate(start)?,
    };

    let contents = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|_| PolyrunError::ManifestMissing(manifest_path.clone()))?;

    let manifest: Manifest =
        serde_yaml::from_str(&contents).map_err(|source| PolyrunError::ManifestMalformed {
            path: manifest_path.clone(),
            source,
        })?;

    validate_structure(&manifest)?;

    Ok((manifest_path, manifest))
}

/// Structural-only validation: the core does not interpret `reqs` beyond
/// parsing it; service/resource name overlap is checked here because the
/// dependency graph in `graph.rs` assumes names are unique across both maps.
fn validate_structure(manifest: &Manifest) -> Result<()> {
    for name in manifest.services.keys() {
        if manifest.resources.contains_key(name) {
            return Err(PolyrunError::DuplicateName(name.clone()));
        }
    }
    Ok(())
}

/// The manifest's directory, used as the repository root for path-escape
/// checks and as the key for `.polyrun/` state directories.
pub fn root_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
