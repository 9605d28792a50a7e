//! `ExecutionContext`: explicit dependency injection. One
//! `ExecutionContext` is constructed per invocation and passed explicitly
//! into every command function in `commands/`, rather than relying on a
//! process-wide mutable singleton built once at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::logs::LogManager;
use crate::manifest::{self, Manifest};
use crate::ports::manager::PortManager;
use crate::registry::ServiceRegistry;

/// Holds the manifest, the repository root, and every shared, on-disk
/// backed service the commands need: the port manager, the service
/// registry, and the per-project `LogManager` singleton. Concurrent
/// first-callers converge to the same instance because construction
/// happens once, in `load`, before any command body runs.
pub struct ExecutionContext {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub repo_root: PathBuf,
    pub state_dir: PathBuf,
    pub port_manager: PortManager,
    pub registry: ServiceRegistry,
    pub log_manager: Arc<LogManager>,
}

impl ExecutionContext {
    /// Locates and loads the manifest starting from `cwd` (or an explicit
    /// `--manifest` override), then loads the `.polyrun/` state directory
    /// beside it. `mirror_logs` enables the JSONL disk mirror.
    pub async fn load(cwd: &Path, manifest_override: Option<&Path>, mirror_logs: bool) -> Result<Self> {
        let (manifest_path, manifest) = manifest::load(cwd, manifest_override).await?;
        let repo_root = manifest::root_dir(&manifest_path);
        let state_dir = repo_root.join(".polyrun");

        let port_manager = PortManager::load(&state_dir).await?;
        let registry = ServiceRegistry::load(&state_dir).await?;
        let log_manager = Arc::new(LogManager::new(
            mirror_logs.then(|| state_dir.join("logs")),
        ));

        Ok(Self {
            manifest_path,
            manifest,
            repo_root,
            state_dir,
            port_manager,
            registry,
            log_manager,
        })
    }
}
