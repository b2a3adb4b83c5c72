//! In-memory storage

use crate::{child_names, Storage};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokenlease_core::Result;

/// Storage held in a process-local ordered map
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read();
        Ok(child_names(prefix, entries.keys().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = MemoryStorage::new();
        assert!(storage.get("config/token").await.unwrap().is_none());

        storage.put("config/token", b"one").await.unwrap();
        storage.put("config/token", b"two").await.unwrap();
        assert_eq!(storage.get("config/token").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(storage.len(), 1);

        storage.delete("config/token").await.unwrap();
        storage.delete("config/token").await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_relative() {
        let storage = MemoryStorage::new();
        for key in ["role/zeta", "role/alpha", "config/lease"] {
            storage.put(key, b"{}").await.unwrap();
        }
        assert_eq!(storage.list("role/").await.unwrap(), vec!["alpha", "zeta"]);
        assert!(storage.list("missing/").await.unwrap().is_empty());
    }
}
