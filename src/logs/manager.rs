//! Per-project `LogManager` singleton: a per-service `mpsc` fan-out where
//! a registry entry's logs are addressed by service name, not broadcast
//! system-wide.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};

use crate::logs::buffer::{LogBuffer, DEFAULT_CAPACITY};
use crate::logs::mirror::LogMirror;
use crate::logs::model::{LogEntry, LogLevel};

/// Owns every service's [`LogBuffer`] for one project root. Constructed
/// once in `ExecutionContext` so concurrent first-callers converge to the
/// same instance structurally rather than by race.
pub struct LogManager {
    buffers: Mutex<HashMap<String, Arc<LogBuffer>>>,
    mirror: Option<LogMirror>,
}

impl LogManager {
    pub fn new(mirror_to_disk: Option<std::path::PathBuf>) -> Self {
        Self {
            buffers: Mutex::new(HashMap::new()),
            mirror: mirror_to_disk.map(LogMirror::new),
        }
    }

    async fn buffer_for(&self, service: &str) -> Arc<LogBuffer> {
        let mut buffers = self.buffers.lock().await;
        buffers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(LogBuffer::new(DEFAULT_CAPACITY)))
            .clone()
    }

    /// Appends `entry`, mirroring to disk when enabled. Mirror I/O
    /// failures are swallowed here; the disk mirror is best-effort.
    pub async fn append(&self, entry: LogEntry) {
        let buffer = self.buffer_for(&entry.service).await;
        if let Some(mirror) = &self.mirror {
            let _ = mirror.append(&entry).await;
        }
        buffer.append(entry);
    }

    pub async fn tail(&self, service: &str, n: usize) -> Vec<LogEntry> {
        self.buffer_for(service).await.tail(n)
    }

    pub async fn since(
        &self,
        service: &str,
        since: DateTime<Utc>,
        levels: Option<&[LogLevel]>,
    ) -> Vec<LogEntry> {
        self.buffer_for(service).await.since(since, levels)
    }

    /// Returns a merged channel receiving future entries across every
    /// requested service; the caller drops the receiver (or the returned
    /// guard) to cancel.
    pub async fn subscribe(&self, services: &[String]) -> mpsc::Receiver<LogEntry> {
        let (merged_tx, merged_rx) = mpsc::channel(256);

        for service in services {
            let buffer = self.buffer_for(service).await;
            let (_id, mut rx) = buffer.subscribe();
            let merged_tx = merged_tx.clone();
            tokio::spawn(async move {
                while let Some(entry) = rx.recv().await {
                    if merged_tx.send(entry).await.is_err() {
                        break;
                    }
                }
            });
        }

        merged_rx
    }

    pub async fn remove(&self, service: &str) {
        self.buffers.lock().await.remove(service);
        if let Some(mirror) = &self.mirror {
            mirror.close(service).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tail_reflects_appended_entries() {
        let manager = LogManager::new(None);
        manager.append(LogEntry::new("web", "one", false)).await;
        manager.append(LogEntry::new("web", "two", false)).await;
        let tail = manager.tail("web", 10).await;
        assert_eq!(tail.len(), 2);
    }

    #[tokio::test]
    async fn subscribe_merges_multiple_services() {
        let manager = LogManager::new(None);
        let mut rx = manager
            .subscribe(&["web".to_string(), "api".to_string()])
            .await;

        manager.append(LogEntry::new("web", "from web", false)).await;
        manager.append(LogEntry::new("api", "from api", false)).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let services: Vec<_> = [first.service, second.service].into_iter().collect();
        assert!(services.contains(&"web".to_string()));
        assert!(services.contains(&"api".to_string()));
    }
}
