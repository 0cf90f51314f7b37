//! Role Store
//!
//! Maps roles onto a [`Storage`] backend under the `role/` namespace.

use std::sync::Arc;

use crate::entity::{Role, RoleEntry, RoleName};
use crate::error::Result;
use crate::storage::{Storage, StorageEntry};

/// Key prefix shared by every role entry
pub const ROLE_PREFIX: &str = "role/";

pub fn role_key(name: &RoleName) -> String {
    format!("{}{}", ROLE_PREFIX, name)
}

#[derive(Clone)]
pub struct RoleStore {
    storage: Arc<dyn Storage>,
}

impl RoleStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn get(&self, name: &RoleName) -> Result<Option<Role>> {
        let Some(entry) = self.storage.get(&role_key(name)).await? else {
            return Ok(None);
        };
        let record: RoleEntry = entry.decode_json()?;
        Ok(Some(Role {
            name: name.clone(),
            entry: record,
        }))
    }

    pub async fn put(&self, role: &Role) -> Result<()> {
        let entry = StorageEntry::json(role_key(&role.name), &role.entry)?;
        self.storage.put(entry).await
    }

    pub async fn delete(&self, name: &RoleName) -> Result<()> {
        self.storage.delete(&role_key(name)).await
    }

    /// Role names in backend order
    pub async fn list(&self) -> Result<Vec<String>> {
        self.storage.list(ROLE_PREFIX).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn name(s: &str) -> RoleName {
        RoleName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_persisted_shape() {
        let storage = Arc::new(MemoryStorage::new());
        let store = RoleStore::new(storage.clone());

        store.put(&Role::new(name("readonly"), "SELECT 1;", "app")).await.unwrap();

        let raw = storage.get("role/readonly").await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw.value).unwrap();
        assert_eq!(json, serde_json::json!({ "sql": "SELECT 1;", "db_name": "app" }));
    }

    #[tokio::test]
    async fn test_get_put_list_delete() {
        let store = RoleStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.get(&name("a")).await.unwrap().is_none());

        let role = Role::new(name("a"), "SELECT 1", "app");
        store.put(&role).await.unwrap();
        assert_eq!(store.get(&name("a")).await.unwrap(), Some(role));
        assert_eq!(store.list().await.unwrap(), vec!["a"]);

        store.delete(&name("a")).await.unwrap();
        assert!(store.get(&name("a")).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_storage_fault() {
        let storage = Arc::new(MemoryStorage::new());
        storage.put(StorageEntry::new("role/bad", b"not json".to_vec())).await.unwrap();

        let err = RoleStore::new(storage).get(&name("bad")).await.unwrap_err();
        assert!(!err.is_user_facing());
    }
}
