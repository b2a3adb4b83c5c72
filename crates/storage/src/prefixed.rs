//! Mount-scoped view over a shared storage

use crate::Storage;
use async_trait::async_trait;
use std::sync::Arc;
use tokenlease_core::Result;

/// Storage view that namespaces every key under a fixed prefix
#[derive(Clone)]
pub struct PrefixedStorage {
    inner: Arc<dyn Storage>,
    prefix: String,
}

impl PrefixedStorage {
    /// Wrap `inner`; a trailing `/` is added to `prefix` when missing
    #[must_use]
    pub fn new(inner: Arc<dyn Storage>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { inner, prefix }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl Storage for PrefixedStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(&self.full_key(key)).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.put(&self.full_key(key), value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(&self.full_key(key)).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(&self.full_key(prefix)).await
    }
}
