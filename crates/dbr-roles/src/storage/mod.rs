//! Key/Value Storage Backends
//!
//! Roles are stored as opaque JSON payloads keyed by string. Any backend
//! implementing [`Storage`] can hold them; two are bundled:
//!
//! - [`MemoryStorage`] for tests and dev mode
//! - [`SqliteStorage`] backed by a single sqlx table

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Encode `value` as JSON under `key`
    pub fn json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(key, serde_json::to_vec(value)?))
    }

    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

/// Durable key/value backend.
///
/// Every method fails only on backend I/O problems. A missing key is
/// `Ok(None)` from `get` and a no-op for `delete`.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>>;

    /// Insert or overwrite in a single write
    async fn put(&self, entry: StorageEntry) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Immediate children of `prefix`, with the prefix stripped.
    ///
    /// A deeper key such as `prefix/a/b` is reported once as `a/`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Reduce full keys to the immediate children of `prefix`, preserving the
/// order in which they were first seen.
pub(crate) fn children_of<'a, I>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    let mut children = Vec::new();

    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let child = match rest.find('/') {
            Some(i) => &rest[..=i],
            None => rest,
        };
        if seen.insert(child.to_string()) {
            children.push(child.to_string());
        }
    }

    children
}
