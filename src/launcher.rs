//! Launcher: starts every service concurrently, attaches stdout/stderr
//! readers, records PIDs, and registers each service in the registry.
//!
//! Spawns run through a concurrent `join_all` over per-service futures so
//! one slow spawn never delays the others.

use std::collections::HashMap;
use std::net::TcpListener;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{PolyrunError, Result};
use crate::logs::{LogEntry, LogManager};
use crate::ports::manager::PortManager;
use crate::registry::{RegistryEntry, ServiceRegistry};
use crate::runtime::RuntimeDescriptor;

/// A launched service. Owns the `Child` handle behind an async mutex so
/// the shutdown coordinator can take it without a second mutable borrow
/// of the launcher's state.
pub struct ServiceProcess {
    name: String,
    descriptor: RuntimeDescriptor,
    pid: u32,
    child: AsyncMutex<Option<Child>>,
    ready: AtomicBool,
    exit_observed: AtomicBool,
}

impl ServiceProcess {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &RuntimeDescriptor {
        &self.descriptor
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.descriptor.port()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn exit_observed(&self) -> bool {
        self.exit_observed.load(Ordering::SeqCst)
    }

    pub(crate) async fn take_child(&self) -> Option<Child> {
        self.child.lock().await.take()
    }

    pub(crate) fn mark_exit_observed(&self) {
        self.exit_observed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl ServiceProcess {
    /// Test-only constructor so `shutdown`'s tests can exercise a real
    /// `Child` without going through a full `launch_one` spawn.
    pub(crate) fn from_parts(descriptor: RuntimeDescriptor, pid: u32, child: Child) -> Self {
        Self {
            name: descriptor.name().to_string(),
            descriptor,
            pid,
            child: AsyncMutex::new(Some(child)),
            ready: AtomicBool::new(false),
            exit_observed: AtomicBool::new(false),
        }
    }
}

/// Per-service outcome recorded while launching, plus the aggregate
/// result callers use to decide whether to roll back what already
/// started: errors are aggregated into a map keyed by service name
/// rather than aborting the whole batch on the first failure.
pub struct LaunchReport {
    pub started: Vec<Arc<ServiceProcess>>,
    pub errors: HashMap<String, PolyrunError>,
}

/// Starts every `(name, descriptor)` pair concurrently. Each service:
/// re-checks port availability (a race may have claimed it since
/// assignment), registers a `starting` entry, spawns, attaches log
/// readers, and records its PID. Failures are collected rather than
/// aborting the whole batch.
pub async fn launch_all(
    descriptors: Vec<RuntimeDescriptor>,
    registry: &ServiceRegistry,
    port_manager: &PortManager,
    log_manager: &Arc<LogManager>,
    project_dir_labels: &HashMap<String, String>,
) -> LaunchReport {
    let futures = descriptors.into_iter().map(|descriptor| {
        let log_manager = log_manager.clone();
        let project_dir = project_dir_labels
            .get(descriptor.name())
            .cloned()
            .unwrap_or_else(|| descriptor.working_dir().to_string_lossy().into_owned());
        async move {
            let outcome = launch_one(descriptor.clone(), registry, port_manager, log_manager, project_dir).await;
            (descriptor.name().to_string(), outcome)
        }
    });

    let results = futures::future::join_all(futures).await;

    let mut started = Vec::new();
    let mut errors = HashMap::new();
    for (name, outcome) in results {
        match outcome {
            Ok(process) => started.push(process),
            Err(e) => {
                errors.insert(name, e);
            }
        }
    }

    LaunchReport { started, errors }
}

async fn launch_one(
    descriptor: RuntimeDescriptor,
    registry: &ServiceRegistry,
    port_manager: &PortManager,
    log_manager: Arc<LogManager>,
    project_dir: String,
) -> Result<Arc<ServiceProcess>> {
    let name = descriptor.name().to_string();
    let port = descriptor.port();

    if TcpListener::bind(("127.0.0.1", port)).is_err() {
        return Err(PolyrunError::PortRaceLost {
            service: name.clone(),
            port,
        });
    }

    let entry = RegistryEntry::starting(
        &name,
        &project_dir,
        port,
        descriptor.language().as_str(),
        descriptor.framework(),
    );
    let _ = registry.register(entry).await;

    let mut command = Command::new(descriptor.command());
    command
        .args(descriptor.argv())
        .current_dir(descriptor.working_dir())
        .envs(descriptor.env_overlay())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| PolyrunError::ChildSpawnFailed {
        service: name.clone(),
        message: e.to_string(),
    })?;

    let pid = child.id().ok_or_else(|| PolyrunError::ChildSpawnFailed {
        service: name.clone(),
        message: "process exited before its PID could be read".to_string(),
    })?;

    let _ = port_manager.record_pid(&name, pid).await;
    registry
        .update(&name, |e| {
            e.pid = Some(pid);
        })
        .await
        .ok();

    if let Some(stdout) = child.stdout.take() {
        spawn_log_reader(name.clone(), stdout, false, log_manager.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_log_reader(name.clone(), stderr, true, log_manager.clone());
    }

    tracing::info!(service = %name, url = %format!("http://localhost:{port}"), pid, "service started");

    Ok(Arc::new(ServiceProcess {
        name,
        descriptor,
        pid,
        child: AsyncMutex::new(Some(child)),
        ready: AtomicBool::new(false),
        exit_observed: AtomicBool::new(false),
    }))
}

/// Tokenizes a pipe by line and appends each as a `LogEntry`. One task
/// per pipe: each running service gets its own stdout reader and stderr
/// reader.
fn spawn_log_reader<R>(service: String, pipe: R, from_stderr: bool, log_manager: Arc<LogManager>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    log_manager
                        .append(LogEntry::new(service.clone(), line, from_stderr))
                        .await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(service = %service, error = %e, "log pipe read failed");
                    break;
                }
            }
        }
    });
}
