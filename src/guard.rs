//! Path & input guard.
//!
//! Every path derived from the manifest or CLI is normalized to an
//! absolute, symlink-resolved form and verified to lie under a root
//! directory before it is opened. Commands are always built with
//! `Command::new(program).args(args)` (argv form) elsewhere in this crate
//! so shell metacharacters are never interpreted — this module only
//! guards *paths*.

use std::path::{Path, PathBuf};

use crate::error::{PolyrunError, Result};

/// Canonicalizes `candidate` (joined to `root` if relative) and verifies
/// the result lies within `root`. Rejects `..` escapes; non-ASCII bytes
/// are permitted.
pub fn ensure_within(root: &Path, candidate: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .map_err(|_| PolyrunError::PathEscape(root.to_path_buf()))?;

    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let resolved = canonicalize_lenient(&joined)?;

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(PolyrunError::PathEscape(candidate.to_path_buf()))
    }
}

/// Like `Path::canonicalize`, but tolerates a path whose final component
/// does not exist yet (e.g. a log file about to be created) by
/// canonicalizing the parent and re-joining the file name.
fn canonicalize_lenient(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) => {
            let parent = path.parent().ok_or_else(|| {
                PolyrunError::PathEscape(path.to_path_buf())
            })?;
            let file_name = path.file_name().ok_or_else(|| {
                PolyrunError::PathEscape(path.to_path_buf())
            })?;
            let parent = parent
                .canonicalize()
                .map_err(|_| PolyrunError::PathEscape(path.to_path_buf()))?;
            Ok(parent.join(file_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn allows_path_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("service")).unwrap();
        let result = ensure_within(dir.path(), Path::new("service"));
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_traversal_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("inner")).unwrap();
        let result = ensure_within(&dir.path().join("inner"), Path::new("../../etc"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link = dir.path().join("escape");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let result = ensure_within(dir.path(), Path::new("escape"));
        assert!(result.is_err());
    }
}
