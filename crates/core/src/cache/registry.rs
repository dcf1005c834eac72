//! Partition registry: versioned names and partition handles.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::storage::{CacheStorage, RequestKey, ResponseSnapshot};
use crate::Error;

/// The two partition names derived from one version token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionNames {
    /// First-party shell assets.
    pub shell: String,
    /// Third-party cacheable resources.
    pub external: String,
}

impl PartitionNames {
    pub fn derive(prefix: &str, version: &str) -> Self {
        Self { shell: format!("{prefix}-app-{version}"), external: format!("{prefix}-ext-{version}") }
    }

    /// Whether a partition name belongs to this version.
    pub fn contains(&self, name: &str) -> bool {
        name == self.shell || name == self.external
    }
}

/// Partition listing entry for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    pub current: bool,
}

/// Registry of named partitions over a storage backend.
#[derive(Clone)]
pub struct PartitionRegistry {
    storage: Arc<dyn CacheStorage>,
    names: PartitionNames,
}

impl PartitionRegistry {
    pub fn new(storage: Arc<dyn CacheStorage>, names: PartitionNames) -> Self {
        Self { storage, names }
    }

    /// Names derived from the current version token.
    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    /// Open a partition, creating it if needed.
    pub async fn open_or_create(&self, name: &str) -> Result<Partition, Error> {
        self.storage.open(name).await?;
        Ok(self.handle(name))
    }

    /// Handle to a partition without creating it; writes create it lazily.
    pub fn handle(&self, name: &str) -> Partition {
        Partition { storage: Arc::clone(&self.storage), name: name.to_string() }
    }

    /// Handle to the current shell partition.
    pub fn shell(&self) -> Partition {
        self.handle(&self.names.shell)
    }

    /// Handle to the current external partition.
    pub fn external(&self) -> Partition {
        self.handle(&self.names.external)
    }

    pub async fn list_all(&self) -> Result<Vec<String>, Error> {
        self.storage.keys().await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.storage.delete(name).await
    }

    /// Look up a request in every partition.
    pub async fn lookup(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.storage.lookup_any(key).await
    }

    /// Every existing partition with its entry count.
    pub async fn summaries(&self) -> Result<Vec<PartitionSummary>, Error> {
        let mut summaries = Vec::new();
        for name in self.storage.keys().await? {
            let entries = self.storage.entry_count(&name).await?;
            let current = self.names.contains(&name);
            summaries.push(PartitionSummary { name, entries, current });
        }
        Ok(summaries)
    }
}

/// Handle to one named partition.
#[derive(Clone)]
pub struct Partition {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn lookup(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.storage.lookup(&self.name, key).await
    }

    pub async fn put(&self, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        self.storage.put(&self.name, key, response).await
    }

    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.storage.entry_count(&self.name).await
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;

    async fn registry(version: &str) -> (CacheDb, PartitionRegistry) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let registry = PartitionRegistry::new(Arc::new(db.clone()), PartitionNames::derive("aquanev", version));
        (db, registry)
    }

    #[test]
    fn test_derive_names() {
        let names = PartitionNames::derive("aquanev", "v1");
        assert_eq!(names.shell, "aquanev-app-v1");
        assert_eq!(names.external, "aquanev-ext-v1");
        assert!(names.contains("aquanev-ext-v1"));
        assert!(!names.contains("aquanev-ext-v2"));
    }

    #[tokio::test]
    async fn test_open_or_create_lists_partition() {
        let (_db, registry) = registry("v1").await;
        let shell = registry.open_or_create(&registry.names().shell).await.unwrap();
        assert_eq!(shell.name(), "aquanev-app-v1");
        assert_eq!(registry.list_all().await.unwrap(), vec!["aquanev-app-v1"]);
    }

    #[tokio::test]
    async fn test_handle_is_lazy() {
        let (_db, registry) = registry("v1").await;
        let external = registry.external();
        assert!(registry.list_all().await.unwrap().is_empty());

        let key = RequestKey::get("https://cdnjs.cloudflare.com/lib.js");
        let snapshot = ResponseSnapshot {
            url: key.url.clone(),
            status: 200,
            status_text: "OK".into(),
            headers: Vec::new(),
            body: b"lib".to_vec(),
        };
        external.put(&key, &snapshot).await.unwrap();
        assert_eq!(registry.list_all().await.unwrap(), vec!["aquanev-ext-v1"]);
        assert_eq!(external.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_summaries_flag_current() {
        let (db, registry) = registry("v2").await;
        db.open("aquanev-app-v1").await.unwrap();
        registry.open_or_create("aquanev-app-v2").await.unwrap();

        let summaries = registry.summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(!summaries[0].current);
        assert!(summaries[1].current);
    }
}
