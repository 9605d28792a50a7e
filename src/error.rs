//! Error taxonomy for the orchestration core.
//!
//! Library code returns [`PolyrunError`] so callers can match on `.kind()`-shaped
//! variants; the CLI boundary in `main.rs` wraps everything in `anyhow::Result`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolyrunError {
    #[error("no manifest found above {0}")]
    ManifestMissing(PathBuf),

    #[error("manifest at {path} is malformed: {source}")]
    ManifestMalformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not detect a language for project at {0}")]
    LanguageUndetected(PathBuf),

    #[error("framework '{0}' has no supported launch recipe")]
    FrameworkUnsupported(String),

    #[error("no entrypoint found for service '{0}' (tried manifest entrypoint and defaults)")]
    EntrypointMissing(String),

    #[error("requested port {0} is outside the valid range 3000..65535")]
    PortOutOfRange(u16),

    #[error("explicit port {port} for service '{service}' is held by another process")]
    PortConflictExplicit { service: String, port: u16 },

    #[error("lost the race for port {port} assigned to service '{service}'")]
    PortRaceLost { service: String, port: u16 },

    #[error("service '{0}' did not become healthy within its configured timeout")]
    HealthTimeout(String),

    #[error("failed to spawn service '{service}': {message}")]
    ChildSpawnFailed { service: String, message: String },

    #[error("shutdown did not complete within the bounded context")]
    ShutdownTimeout,

    #[error("registry I/O failed: {0}")]
    RegistryIoError(String),

    #[error("log I/O failed: {0}")]
    LogIoError(String),

    #[error("service '{from}' depends on unknown node '{to}'")]
    UnknownDependency { from: String, to: String },

    #[error("dependency cycle detected, involving: {0:?}")]
    DependencyCycle(Vec<String>),

    #[error("path escapes the repository root: {0}")]
    PathEscape(PathBuf),

    #[error("'{0}' is declared as both a service and a resource")]
    DuplicateName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PolyrunError>;
