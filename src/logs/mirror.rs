//! JSONL disk mirror: writes every appended [`LogEntry`] as one JSON line
//! per service under `.polyrun/logs/`, opening each file handle lazily on
//! first write.

use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{PolyrunError, Result};
use crate::logs::model::LogEntry;

pub struct LogMirror {
    logs_dir: PathBuf,
    handles: Mutex<std::collections::HashMap<String, tokio::fs::File>>,
}

impl LogMirror {
    pub fn new(logs_dir: PathBuf) -> Self {
        Self {
            logs_dir,
            handles: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Appends one JSON line for `entry` to `<service>.jsonl`, opening the
    /// file handle lazily on first write. I/O errors here are logged by
    /// the caller and never abort the run — `LogIoError` is best-effort
    /// observability, not a fatal condition.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        tokio::fs::create_dir_all(&self.logs_dir)
            .await
            .map_err(|e| PolyrunError::LogIoError(e.to_string()))?;

        let mut handles = self.handles.lock().await;
        if !handles.contains_key(&entry.service) {
            let path = self.logs_dir.join(format!("{}.jsonl", entry.service));
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| PolyrunError::LogIoError(e.to_string()))?;
            handles.insert(entry.service.clone(), file);
        }

        let file = handles.get_mut(&entry.service).unwrap();
        let line = serde_json::to_string(entry).map_err(|e| PolyrunError::LogIoError(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PolyrunError::LogIoError(e.to_string()))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| PolyrunError::LogIoError(e.to_string()))?;
        Ok(())
    }

    /// Closes and drops the handle for `service`, called when the owning
    /// manager removes its buffer.
    pub async fn close(&self, service: &str) {
        self.handles.lock().await.remove(service);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_jsonl_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = LogMirror::new(dir.path().join("logs"));
        mirror
            .append(&LogEntry::new("web", "hello", false))
            .await
            .unwrap();
        mirror
            .append(&LogEntry::new("web", "world", false))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(dir.path().join("logs/web.jsonl"))
            .await
            .unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"hello\""));
    }
}
