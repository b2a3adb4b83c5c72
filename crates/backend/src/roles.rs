//! Role store

use dashmap::DashMap;
use std::sync::Arc;
use tokenlease_core::{PolicyDocument, Result, Role, RoleEntry, RoleName, ROLE_PREFIX};
use tokenlease_storage::{Storage, StorageExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Fields of a role write; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    pub policy_document: Option<String>,
}

/// Named policy documents under `role/<name>`.
///
/// Nothing is cached: every call reads storage, so an issuance always sees
/// the latest write. Writes are read-modify-write and are serialised per
/// role name.
pub struct RoleStore {
    storage: Arc<dyn Storage>,
    locks: DashMap<RoleName, Arc<Mutex<()>>>,
}

impl RoleStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
        }
    }

    /// Names of all configured roles, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        self.storage.list(ROLE_PREFIX).await
    }

    pub async fn read(&self, name: &RoleName) -> Result<Option<Role>> {
        let entry: Option<RoleEntry> = self.storage.get_json(&name.storage_key()).await?;
        debug!(role = %name, found = entry.is_some(), "Read role");
        Ok(entry.map(|entry| Role::from_entry(name.clone(), entry)))
    }

    /// Create or partially update a role
    pub async fn write(&self, name: &RoleName, update: RoleUpdate) -> Result<Role> {
        // Validate before taking the lock or touching storage
        let document = update
            .policy_document
            .as_deref()
            .map(PolicyDocument::parse)
            .transpose()?;

        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let mut role = self
            .read(name)
            .await?
            .unwrap_or_else(|| Role::from_entry(name.clone(), RoleEntry::default()));
        if let Some(document) = document {
            role.policy_document = document;
        }

        self.storage
            .put_json(&name.storage_key(), &role.to_entry())
            .await?;
        info!(role = %name, "Role written");
        Ok(role)
    }

    /// Remove a role; credentials already issued under it are unaffected
    pub async fn delete(&self, name: &RoleName) -> Result<()> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;
        self.storage.delete(&name.storage_key()).await?;
        info!(role = %name, "Role deleted");
        Ok(())
    }

    fn lock_for(&self, name: &RoleName) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenlease_core::Error;
    use tokenlease_storage::MemoryStorage;

    fn name(s: &str) -> RoleName {
        RoleName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_write_compacts_document() {
        let store = RoleStore::new(Arc::new(MemoryStorage::new()));
        let role = store
            .write(
                &name("deploy"),
                RoleUpdate {
                    policy_document: Some("[ { \"effect\" : \"allow\" } ]".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(role.policy_document.as_str(), r#"[{"effect":"allow"}]"#);

        let read = store.read(&name("deploy")).await.unwrap().unwrap();
        assert_eq!(read, role);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_document() {
        let store = RoleStore::new(Arc::new(MemoryStorage::new()));
        store
            .write(
                &name("deploy"),
                RoleUpdate {
                    policy_document: Some("[]".to_string()),
                },
            )
            .await
            .unwrap();

        let role = store
            .write(&name("deploy"), RoleUpdate::default())
            .await
            .unwrap();
        assert_eq!(role.policy_document.as_str(), "[]");
    }

    #[tokio::test]
    async fn test_invalid_document_is_not_stored() {
        let store = RoleStore::new(Arc::new(MemoryStorage::new()));
        let err = store
            .write(
                &name("deploy"),
                RoleUpdate {
                    policy_document: Some("[{".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy { .. }));
        assert!(store.read(&name("deploy")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = RoleStore::new(Arc::new(MemoryStorage::new()));
        for role in ["zeta", "alpha", "mid"] {
            store.write(&name(role), RoleUpdate::default()).await.unwrap();
        }
        assert_eq!(store.list().await.unwrap(), vec!["alpha", "mid", "zeta"]);

        store.delete(&name("mid")).await.unwrap();
        store.delete(&name("mid")).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["alpha", "zeta"]);
    }
}
