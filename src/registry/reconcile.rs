//! Registry reconciliation: removes entries whose port is not listening
//! and whose PID is not alive. Port liveness is the preferred signal
//! since PIDs are reusable by the OS.

use crate::registry::disk::ServiceRegistry;

pub async fn reconcile(registry: &ServiceRegistry) {
    let entries = registry.list().await;
    for entry in entries {
        let port_listening = is_port_listening(entry.port).await;
        let pid_alive = entry.pid.map(pid_alive).unwrap_or(false);
        if !port_listening && !pid_alive {
            let _ = registry.unregister(&entry.name).await;
        }
    }
}

async fn is_port_listening(port: u16) -> bool {
    tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .is_ok()
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::RegistryEntry;

    #[tokio::test]
    async fn removes_entries_with_dead_pid_and_closed_port() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServiceRegistry::load(dir.path()).await.unwrap();
        let mut entry = RegistryEntry::starting("dead", "./d", 3999, "js", "Next.js");
        entry.pid = Some(999_999);
        registry.register(entry).await.unwrap();

        reconcile(&registry).await;

        assert!(registry.get("dead").await.is_none());
    }

    #[tokio::test]
    async fn keeps_entries_with_live_listening_port() {
        let dir = tempfile::tempdir().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept connections in the background so the connect probe succeeds.
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                if stream.is_err() {
                    break;
                }
            }
        });

        let registry = ServiceRegistry::load(dir.path()).await.unwrap();
        let entry = RegistryEntry::starting("alive", "./a", port, "js", "Next.js");
        registry.register(entry).await.unwrap();

        reconcile(&registry).await;

        assert!(registry.get("alive").await.is_some());
    }
}
