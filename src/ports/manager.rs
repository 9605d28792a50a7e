//! Port manager: persists `portAssignments.json`, validates explicit
//! ports, and resolves conflicts either by prompting the operator to kill
//! the holder or by silently advancing to the next free port for
//! flexible assignments.

use std::collections::{BTreeMap, HashSet};
use std::io::IsTerminal;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{PolyrunError, Result};
use crate::ports::holder;

pub const MIN_PORT: u16 = 3000;
pub const MAX_PORT: u16 = 65535;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortAssignmentRecord {
    pub host_port: u16,
    pub explicit: bool,
    pub pid: Option<u32>,
    pub last_assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PortAssignments {
    #[serde(flatten)]
    entries: BTreeMap<String, PortAssignmentRecord>,
}

/// Operator's choice when an explicit port is held by another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    KillHolder,
    AutoAssign,
    Cancel,
}

pub struct PortManager {
    path: PathBuf,
    state: Mutex<PortAssignments>,
}

/// Outcome of `assign_port`: the port actually assigned, and whether the
/// operator approved writing a flexible reassignment back to the
/// manifest. The manifest is never mutated automatically.
pub struct AssignOutcome {
    pub port: u16,
    pub requires_manifest_update: bool,
}

impl PortManager {
    /// Loads `portAssignments.json` from `state_dir`, purging assignments
    /// whose PID is no longer alive or whose port is no longer listening.
    pub async fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join("portAssignments.json");
        let mut assignments: PortAssignments = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?,
            Err(_) => PortAssignments::default(),
        };

        let mut stale = Vec::new();
        for (service, record) in assignments.entries.iter() {
            let alive = record.pid.map(pid_alive).unwrap_or(false);
            let listening = is_port_listening(record.host_port).await;
            if !alive && !listening {
                stale.push(service.clone());
            }
        }
        for service in stale {
            assignments.entries.remove(&service);
        }

        Ok(Self {
            path,
            state: Mutex::new(assignments),
        })
    }

    /// Assigns a port to `service`. Explicit
    /// requests out of `3000..65535` fail with `PortOutOfRange`
    /// immediately. When the requested port is already held:
    /// - explicit: interactive prompt (kill holder / auto-assign /
    ///   cancel); non-interactive contexts abort with
    ///   `PortConflictExplicit`.
    /// - flexible: silently advances to the next free port, bounded at
    ///   100 attempts.
    pub async fn assign_port(
        &self,
        service: &str,
        requested_port: u16,
        is_explicit: bool,
        ports_in_use: &HashSet<u16>,
    ) -> Result<AssignOutcome> {
        if is_explicit && !(MIN_PORT..=MAX_PORT).contains(&requested_port) {
            return Err(PolyrunError::PortOutOfRange(requested_port));
        }

        let mut port = requested_port;
        let mut requires_manifest_update = false;

        if is_port_held(port, ports_in_use).await {
            if is_explicit {
                match self.prompt_conflict(service, port).await {
                    ConflictChoice::KillHolder => {
                        holder::kill_holders(port).await;
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        if is_port_held(port, ports_in_use).await {
                            return Err(PolyrunError::PortConflictExplicit {
                                service: service.to_string(),
                                port,
                            });
                        }
                    }
                    ConflictChoice::AutoAssign => {
                        port = self.next_free_port(port, ports_in_use)?;
                        requires_manifest_update = true;
                    }
                    ConflictChoice::Cancel => {
                        return Err(PolyrunError::PortConflictExplicit {
                            service: service.to_string(),
                            port,
                        });
                    }
                }
            } else {
                port = self.next_free_port(port, ports_in_use)?;
            }
        }

        let mut state = self.state.lock().await;
        state.entries.insert(
            service.to_string(),
            PortAssignmentRecord {
                host_port: port,
                explicit: is_explicit && !requires_manifest_update,
                pid: None,
                last_assigned_at: Utc::now(),
            },
        );
        self.write_through(&state).await?;

        Ok(AssignOutcome {
            port,
            requires_manifest_update,
        })
    }

    /// Records the PID once the service has actually spawned.
    pub async fn record_pid(&self, service: &str, pid: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.entries.get_mut(service) {
            record.pid = Some(pid);
        }
        self.write_through(&state).await
    }

    pub async fn release(&self, service: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.entries.remove(service);
        self.write_through(&state).await
    }

    async fn prompt_conflict(&self, service: &str, port: u16) -> ConflictChoice {
        if !std::io::stdin().is_terminal() {
            return ConflictChoice::Cancel;
        }

        let options = ["Kill the process holding the port", "Auto-assign a different port", "Cancel"];
        let prompt = format!(
            "Port {port} for service '{service}' is already in use. What would you like to do?"
        );
        let selection = tokio::task::spawn_blocking(move || {
            dialoguer::Select::new()
                .with_prompt(prompt)
                .items(&options)
                .default(1)
                .interact_opt()
        })
        .await
        .ok()
        .flatten()
        .flatten();

        match selection {
            Some(0) => ConflictChoice::KillHolder,
            Some(1) => ConflictChoice::AutoAssign,
            _ => ConflictChoice::Cancel,
        }
    }

    /// Bounded-at-100-attempts scan for the next free port at or above
    /// `from`, skipping the caller's known in-use set.
    fn next_free_port(&self, from: u16, ports_in_use: &HashSet<u16>) -> Result<u16> {
        let mut candidate = from;
        for _ in 0..100 {
            candidate = candidate.saturating_add(1).min(MAX_PORT - 1);
            if ports_in_use.contains(&candidate) {
                continue;
            }
            if TcpListener::bind(("127.0.0.1", candidate)).is_ok() {
                return Ok(candidate);
            }
        }
        Err(PolyrunError::PortOutOfRange(from))
    }

    async fn write_through(&self, state: &PortAssignments) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        }
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        Ok(())
    }
}

async fn is_port_held(port: u16, ports_in_use: &HashSet<u16>) -> bool {
    ports_in_use.contains(&port) || is_port_listening(port).await
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

    #[tokio::test]
    async fn rejects_out_of_range_explicit_port() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PortManager::load(dir.path()).await.unwrap();
        let result = manager
            .assign_port("web", 2000, true, &HashSet::new())
            .await;
        assert!(matches!(result, Err(PolyrunError::PortOutOfRange(2000))));
    }

    #[tokio::test]
    async fn assigns_free_explicit_port_without_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PortManager::load(dir.path()).await.unwrap();
        let outcome = manager
            .assign_port("web", 34567, true, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(outcome.port, 34567);
        assert!(!outcome.requires_manifest_update);
    }

    #[tokio::test]
    async fn flexible_conflict_advances_silently() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PortManager::load(dir.path()).await.unwrap();
        let mut in_use = HashSet::new();
        in_use.insert(40000u16);
        let outcome = manager
            .assign_port("web", 40000, false, &in_use)
            .await
            .unwrap();
        assert_ne!(outcome.port, 40000);
    }

    #[tokio::test]
    async fn persists_and_reloads_assignments() {
        let dir = tempfile::tempdir().unwrap();
        {
            let manager = PortManager::load(dir.path()).await.unwrap();
            manager
                .assign_port("web", 45000, true, &HashSet::new())
                .await
                .unwrap();
        }
        let contents = tokio::fs::read_to_string(dir.path().join("portAssignments.json"))
            .await
            .unwrap();
        assert!(contents.contains("45000"));
    }
}
