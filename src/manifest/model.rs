//! Typed manifest model.
//!
//! Deserialized straight off `serde_yaml`, with fields left public: unlike
//! `RuntimeDescriptor` (built incrementally by `runtime::builder` and worth
//! guarding against an inconsistent half-built state), a `Manifest` is
//! always either the direct result of a single `serde_yaml::from_str` call
//! or not constructed at all, so there is no partially-built state to
//! protect against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level manifest, deserialized from `polyrun.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
    #[serde(default)]
    pub resources: BTreeMap<String, Resource>,
    #[serde(default)]
    pub reqs: Vec<Requirement>,

    /// Any keys the core does not interpret, preserved verbatim so a
    /// sibling manifest-generation subsystem can round-trip them.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Project path, relative to the manifest's directory.
    pub project: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub uses: Vec<String>,
}

impl Service {
    /// True when `host` names a containerized target (`containerapp|aks`).
    pub fn is_containerized(&self) -> bool {
        matches!(self.host.as_deref(), Some("containerapp") | Some("aks"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub uses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(default, rename = "minVersion")]
    pub min_version: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, rename = "versionPrefix")]
    pub version_prefix: Option<String>,
    #[serde(default, rename = "versionField")]
    pub version_field: Option<String>,
    #[serde(default, rename = "checkRunning")]
    pub check_running: Option<bool>,
    #[serde(default, rename = "runningCheckCommand")]
    pub running_check_command: Option<String>,
    #[serde(default, rename = "runningCheckArgs")]
    pub running_check_args: Vec<String>,
    #[serde(default, rename = "runningCheckExpected")]
    pub running_check_expected: Option<String>,
    #[serde(default, rename = "runningCheckExitCode")]
    pub running_check_exit_code: Option<i32>,
}
