//! In-memory storage backend

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{children_of, Storage, StorageEntry};
use crate::error::Result;

/// Ordered in-memory map. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>> {
        Ok(self
            .entries
            .read()
            .get(key)
            .map(|value| StorageEntry::new(key, value.clone())))
    }

    async fn put(&self, entry: StorageEntry) -> Result<()> {
        self.entries.write().insert(entry.key, entry.value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read();
        Ok(children_of(
            prefix,
            entries
                .range(prefix.to_string()..)
                .map(|(k, _)| k.as_str())
                .take_while(|k| k.starts_with(prefix)),
        ))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = MemoryStorage::new();
        assert!(storage.get("role/a").await.unwrap().is_none());

        storage.put(StorageEntry::new("role/a", b"one".to_vec())).await.unwrap();
        storage.put(StorageEntry::new("role/a", b"two".to_vec())).await.unwrap();
        assert_eq!(storage.get("role/a").await.unwrap().unwrap().value, b"two");
        assert_eq!(storage.len(), 1);

        storage.delete("role/a").await.unwrap();
        storage.delete("role/a").await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_list_only_returns_prefix() {
        let storage = MemoryStorage::new();
        for key in ["config/app", "role/b", "role/a", "roles-other"] {
            storage.put(StorageEntry::new(key, Vec::new())).await.unwrap();
        }

        let mut names = storage.list("role/").await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
