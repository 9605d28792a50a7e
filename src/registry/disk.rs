//! On-disk service registry: `services.json` keyed by service name,
//! write-rename for atomicity, per-project mutex. Records the services
//! this process itself launched, rather than discovering them from
//! built artifacts on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{PolyrunError, Result};
use crate::registry::model::RegistryEntry;

pub struct ServiceRegistry {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, RegistryEntry>>,
}

impl ServiceRegistry {
    pub async fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join("registry").join("services.json");
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?,
            Err(_) => BTreeMap::new(),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub async fn register(&self, entry: RegistryEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(entry.name.clone(), entry);
        self.write_through(&entries).await
    }

    pub async fn update<F>(&self, name: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut RegistryEntry),
    {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(name) {
            mutate(entry);
        }
        self.write_through(&entries).await
    }

    pub async fn unregister(&self, name: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(name);
        self.write_through(&entries).await
    }

    pub async fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.lock().await.get(name).cloned()
    }

    pub async fn list(&self) -> Vec<RegistryEntry> {
        self.entries.lock().await.values().cloned().collect()
    }

    async fn write_through(&self, entries: &BTreeMap<String, RegistryEntry>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| PolyrunError::RegistryIoError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::RegistryEntry;

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServiceRegistry::load(dir.path()).await.unwrap();
        let entry = RegistryEntry::starting("web", "./w", 3000, "javascript", "Next.js");
        registry.register(entry).await.unwrap();

        let fetched = registry.get("web").await.unwrap();
        assert_eq!(fetched.port, 3000);
    }

    #[tokio::test]
    async fn writes_are_atomic_via_rename() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServiceRegistry::load(dir.path()).await.unwrap();
        registry
            .register(RegistryEntry::starting("web", "./w", 3000, "js", "Next.js"))
            .await
            .unwrap();

        let path = dir.path().join("registry/services.json");
        assert!(path.is_file());
        assert!(!dir.path().join("registry/services.json.tmp").exists());
    }

    #[tokio::test]
    async fn reloads_persisted_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = ServiceRegistry::load(dir.path()).await.unwrap();
            registry
                .register(RegistryEntry::starting("web", "./w", 3000, "js", "Next.js"))
                .await
                .unwrap();
        }
        let reloaded = ServiceRegistry::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.list().await.len(), 1);
    }
}
