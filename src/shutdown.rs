//! Shutdown coordinator: signal-driven graceful termination with a
//! per-service timeout and forced-kill fallback.
//!
//! Windows has no POSIX-signal delivery path for arbitrary child
//! processes, so it force-kills directly instead of attempting a graceful
//! signal first.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{PolyrunError, Result};
use crate::launcher::ServiceProcess;
use crate::ports::manager::PortManager;
use crate::registry::{RegistryEntry, ServiceRegistry, ServiceStatus};

pub const DEFAULT_PER_SERVICE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ShutdownCoordinator {
    per_service_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(per_service_timeout: Duration) -> Self {
        Self { per_service_timeout }
    }

    /// Stops every process concurrently, bounded by `total_timeout`. Each
    /// service's registry entry moves to `stopping` before the signal and
    /// is unregistered after reap. Exceeding `total_timeout` is surfaced
    /// as `ShutdownTimeout` but the final unregister pass still runs for
    /// whatever did complete.
    pub async fn shutdown_all(
        &self,
        processes: Vec<Arc<ServiceProcess>>,
        registry: &ServiceRegistry,
        port_manager: &PortManager,
        total_timeout: Duration,
    ) -> Result<()> {
        let per_service_timeout = self.per_service_timeout;
        let futures = processes.into_iter().map(|process| {
            async move { stop_one(process, registry, port_manager, per_service_timeout).await }
        });

        match tokio::time::timeout(total_timeout, futures::future::join_all(futures)).await {
            Ok(_) => Ok(()),
            Err(_) => Err(PolyrunError::ShutdownTimeout),
        }
    }
}

async fn stop_one(
    process: Arc<ServiceProcess>,
    registry: &ServiceRegistry,
    port_manager: &PortManager,
    per_service_timeout: Duration,
) {
    let name = process.name().to_string();

    registry
        .update(&name, |e| e.status = ServiceStatus::Stopping)
        .await
        .ok();

    let Some(mut child) = process.take_child().await else {
        let _ = registry.unregister(&name).await;
        let _ = port_manager.release(&name).await;
        return;
    };

    signal_and_wait(&mut child, process.pid(), per_service_timeout).await;
    process.mark_exit_observed();

    let _ = registry.unregister(&name).await;
    let _ = port_manager.release(&name).await;
}

#[cfg(unix)]
async fn signal_and_wait(child: &mut tokio::process::Child, pid: u32, timeout: Duration) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);

    if tokio::time::timeout(timeout, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(windows)]
async fn signal_and_wait(child: &mut tokio::process::Child, _pid: u32, _timeout: Duration) {
    // Windows has no useful POSIX-signal delivery path for arbitrary
    // child processes — force-kill directly.
    let _ = child.start_kill();
    let _ = child.wait().await;
}

/// Waits for an interrupt or terminate signal — either one initiates
/// shutdown. On Unix this races SIGINT against SIGTERM; elsewhere only
/// Ctrl-C is deliverable.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint =
            signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// One-shot force-kill of everything still registered, used by the
/// standalone `stop` command when no live `ServiceProcess` set exists
/// (the registering `run` invocation already exited).
pub async fn force_stop_registered(registry: &ServiceRegistry, port_manager: &PortManager) {
    let entries: Vec<RegistryEntry> = registry.list().await;
    for entry in entries {
        registry
            .update(&entry.name, |e| e.status = ServiceStatus::Stopping)
            .await
            .ok();
        if let Some(pid) = entry.pid {
            kill_pid_forcefully(pid);
        }
        let _ = registry.unregister(&entry.name).await;
        let _ = port_manager.release(&entry.name).await;
    }
}

#[cfg(unix)]
fn kill_pid_forcefully(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

#[cfg(windows)]
fn kill_pid_forcefully(_pid: u32) {
    // Resolved via `ports::holder`'s taskkill path when a port is known;
    // the registry-only fallback here has no port to key off of.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{HealthCheckPolicy, RuntimeDescriptor};
    use crate::detect::Language;
    use crate::ports::spec::Protocol;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn descriptor(name: &str, command: &str) -> RuntimeDescriptor {
        RuntimeDescriptor::new(
            name.to_string(),
            PathBuf::from("."),
            command.to_string(),
            vec![],
            HashMap::new(),
            Language::Go,
            "Go".to_string(),
            None,
            9999,
            Protocol::Tcp,
            HealthCheckPolicy::port(),
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_all_unregisters_and_releases_ports() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServiceRegistry::load(dir.path()).await.unwrap();
        let port_manager = PortManager::load(dir.path()).await.unwrap();

        registry
            .register(RegistryEntry::starting("sleeper", "./s", 9999, "go", "Go"))
            .await
            .unwrap();
        port_manager
            .assign_port("sleeper", 9999, true, &Default::default())
            .await
            .unwrap();

        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        port_manager.record_pid("sleeper", pid).await.unwrap();
        registry
            .update("sleeper", |e| e.pid = Some(pid))
            .await
            .unwrap();

        let process = Arc::new(ServiceProcess::from_parts(descriptor("sleeper", "sleep"), pid, child));

        let coordinator = ShutdownCoordinator::new(Duration::from_millis(200));
        coordinator
            .shutdown_all(vec![process], &registry, &port_manager, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(registry.get("sleeper").await.is_none());
    }
}
