//! `RuntimeDescriptor` and `HealthCheckPolicy`, with private fields and
//! accessors so a `RuntimeDescriptor` can't be hand-assembled into an
//! inconsistent state from outside `runtime::builder`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::detect::Language;
use crate::ports::spec::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckKind {
    Http,
    Port,
    Process,
}

#[derive(Debug, Clone)]
pub struct HealthCheckPolicy {
    kind: HealthCheckKind,
    path: Option<String>,
    initial_interval: Duration,
    max_interval: Duration,
    total_timeout: Duration,
    log_match: Option<String>,
}

impl HealthCheckPolicy {
    pub fn new(kind: HealthCheckKind, path: Option<String>) -> Self {
        let max_interval = match kind {
            HealthCheckKind::Port => Duration::from_secs(2),
            _ => Duration::from_secs(5),
        };
        Self {
            kind,
            path,
            initial_interval: Duration::from_millis(500),
            max_interval,
            total_timeout: Duration::from_secs(60),
            log_match: None,
        }
    }

    pub fn http(path: impl Into<String>) -> Self {
        Self::new(HealthCheckKind::Http, Some(path.into()))
    }

    pub fn port() -> Self {
        Self::new(HealthCheckKind::Port, None)
    }

    pub fn process() -> Self {
        Self::new(HealthCheckKind::Process, None)
    }

    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    pub fn with_log_match(mut self, needle: impl Into<String>) -> Self {
        self.log_match = Some(needle.into());
        self
    }

    pub fn kind(&self) -> HealthCheckKind {
        self.kind
    }
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }
    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }
    pub fn log_match(&self) -> Option<&str> {
        self.log_match.as_deref()
    }
}

/// The launch plan for one service. Invariant: `command` and
/// `working_dir` are non-empty and were already checked by
/// [`crate::guard::ensure_within`] before this descriptor was built.
#[derive(Debug, Clone)]
pub struct RuntimeDescriptor {
    name: String,
    working_dir: PathBuf,
    command: String,
    argv: Vec<String>,
    env_overlay: HashMap<String, String>,
    language: Language,
    framework: String,
    package_manager: Option<String>,
    port: u16,
    protocol: Protocol,
    health_check: HealthCheckPolicy,
}

impl RuntimeDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        working_dir: PathBuf,
        command: String,
        argv: Vec<String>,
        env_overlay: HashMap<String, String>,
        language: Language,
        framework: String,
        package_manager: Option<String>,
        port: u16,
        protocol: Protocol,
        health_check: HealthCheckPolicy,
    ) -> Self {
        Self {
            name,
            working_dir,
            command,
            argv,
            env_overlay,
            language,
            framework,
            package_manager,
            port,
            protocol,
            health_check,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn working_dir(&self) -> &PathBuf {
        &self.working_dir
    }
    pub fn command(&self) -> &str {
        &self.command
    }
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
    pub fn env_overlay(&self) -> &HashMap<String, String> {
        &self.env_overlay
    }
    pub fn language(&self) -> Language {
        self.language
    }
    pub fn framework(&self) -> &str {
        &self.framework
    }
    pub fn package_manager(&self) -> Option<&str> {
        self.package_manager.as_deref()
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
    pub fn health_check(&self) -> &HealthCheckPolicy {
        &self.health_check
    }
}
