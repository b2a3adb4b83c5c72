//! Lease policy store

use std::sync::Arc;
use tokenlease_core::{LeasePolicy, Result, CONFIG_LEASE_KEY};
use tokenlease_storage::{Storage, StorageExt};
use tracing::info;

/// Reads and writes the mount's `config/lease` entry
#[derive(Clone)]
pub struct LeasePolicyStore {
    storage: Arc<dyn Storage>,
}

impl LeasePolicyStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn read(&self) -> Result<Option<LeasePolicy>> {
        self.storage.get_json(CONFIG_LEASE_KEY).await
    }

    /// The stored policy, or the zero policy that defers to host defaults
    pub async fn effective(&self) -> Result<LeasePolicy> {
        Ok(self.read().await?.unwrap_or_default())
    }

    pub async fn write(&self, policy: LeasePolicy) -> Result<()> {
        self.storage.put_json(CONFIG_LEASE_KEY, &policy).await?;
        info!(
            ttl_secs = policy.ttl.as_secs(),
            max_ttl_secs = policy.max_ttl.as_secs(),
            "Lease policy configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokenlease_storage::MemoryStorage;

    #[tokio::test]
    async fn test_absent_policy_is_zero() {
        let store = LeasePolicyStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.read().await.unwrap().is_none());
        assert_eq!(store.effective().await.unwrap(), LeasePolicy::default());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = LeasePolicyStore::new(Arc::new(MemoryStorage::new()));
        let policy = LeasePolicy::new(Duration::from_secs(3600), Duration::from_secs(7200)).unwrap();
        store.write(policy).await.unwrap();
        assert_eq!(store.read().await.unwrap(), Some(policy));
    }
}
