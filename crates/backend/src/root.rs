//! Root credential store

use crate::remote_failure;
use std::sync::Arc;
use tokenlease_core::{
    Error, RequestContext, Result, RootCredential, SecretString, CONFIG_TOKEN_KEY,
};
use tokenlease_remote::{ClientFactory, TokenApi};
use tokenlease_storage::{Storage, StorageExt};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

/// Holds the single root token of a mount.
///
/// Every access goes through one `RwLock`: issuance, renewal and revocation
/// hold it shared for the whole request, while write, delete and rotation
/// hold it exclusively. A request therefore never builds a client from a
/// credential that is being replaced underneath it.
pub struct RootCredentialStore {
    storage: Arc<dyn Storage>,
    clients: Arc<dyn ClientFactory>,
    lock: RwLock<()>,
}

/// A remote client built from the current root credential.
///
/// Holds the shared lock until dropped, so no rotation can complete while
/// the client is in use.
pub struct RootSession<'a> {
    _guard: RwLockReadGuard<'a, ()>,
    client: Box<dyn TokenApi>,
}

impl RootSession<'_> {
    #[must_use]
    pub fn client(&self) -> &dyn TokenApi {
        self.client.as_ref()
    }
}

impl RootCredentialStore {
    pub fn new(storage: Arc<dyn Storage>, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            storage,
            clients,
            lock: RwLock::new(()),
        }
    }

    /// Read the stored credential, `None` if never configured
    pub async fn read(&self) -> Result<Option<RootCredential>> {
        let _guard = self.lock.read().await;
        self.load().await
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.read().await?.is_some())
    }

    /// Verify `token` against the remote service and store it.
    ///
    /// The token is only stored when the service reports it active; a
    /// rejected token leaves any previous credential in place.
    pub async fn write(&self, ctx: &RequestContext, token: SecretString) -> Result<RootCredential> {
        if token.is_blank() {
            return Err(Error::EmptyCredential);
        }

        let _guard = self.lock.write().await;
        let client = self.client_for(&token)?;
        let verification = ctx
            .bound("verify-token", client.verify_token())
            .await?
            .map_err(|e| {
                remote_failure("verify-token", e, |message| Error::Verification { message })
            })?;

        if !verification.is_active() {
            return Err(Error::InvalidCredential {
                token_id: verification.id,
                status: verification.status,
            });
        }

        let credential = RootCredential::new(token, verification.id);
        self.storage
            .put_json(CONFIG_TOKEN_KEY, &credential)
            .await?;

        info!(token_id = %credential.token_id, "Root credential configured");
        Ok(credential)
    }

    /// Remove the stored credential; removing a missing one is not an error
    pub async fn delete(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        self.storage.delete(CONFIG_TOKEN_KEY).await?;
        info!("Root credential deleted");
        Ok(())
    }

    /// Regenerate the root token's value in place, returning its identifier.
    ///
    /// The client is built from the stored credential before the remote call
    /// and the new value is stored only once the service has returned it.
    /// Nothing is called remotely when the mount is not configured.
    pub async fn rotate(&self, ctx: &RequestContext) -> Result<String> {
        let _guard = self.lock.write().await;
        let credential = self.require().await?;
        if credential.token_id.is_empty() {
            return Err(Error::configuration(format!(
                "root credential has no identifier, write '{CONFIG_TOKEN_KEY}' again"
            )));
        }

        let client = self.client_for(&credential.token)?;
        let token_id = credential.token_id.clone();
        let value = ctx
            .bound("regenerate-token", client.regenerate_token(&token_id))
            .await?
            .map_err(|e| {
                remote_failure("regenerate-token", e, |message| Error::Rotation {
                    token_id: token_id.clone(),
                    message,
                })
            })?;

        if value.is_blank() {
            return Err(Error::Rotation {
                token_id,
                message: "service returned an empty token value".to_string(),
            });
        }

        self.storage
            .put_json(CONFIG_TOKEN_KEY, &credential.rotated(value))
            .await?;

        info!(token_id = %token_id, "Root credential rotated");
        Ok(token_id)
    }

    /// Build a client from the current credential, holding the shared lock
    pub async fn session(&self) -> Result<RootSession<'_>> {
        let guard = self.lock.read().await;
        let credential = self.require().await?;
        let client = self.client_for(&credential.token)?;
        debug!(token_id = %credential.token_id, "Built client from root credential");

        Ok(RootSession {
            _guard: guard,
            client,
        })
    }

    async fn load(&self) -> Result<Option<RootCredential>> {
        self.storage.get_json(CONFIG_TOKEN_KEY).await
    }

    async fn require(&self) -> Result<RootCredential> {
        let credential = self.load().await?.ok_or(Error::NotConfigured {
            path: CONFIG_TOKEN_KEY,
        })?;
        if credential.token.is_blank() {
            return Err(Error::EmptyCredential);
        }
        Ok(credential)
    }

    fn client_for(&self, token: &SecretString) -> Result<Box<dyn TokenApi>> {
        self.clients
            .client(token)
            .map_err(|e| Error::remote_with_source("build-client", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenlease_remote::memory::{Failure, FakeTokenService, Operation};
    use tokenlease_storage::MemoryStorage;

    fn store(service: &Arc<FakeTokenService>) -> (Arc<MemoryStorage>, RootCredentialStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = RootCredentialStore::new(storage.clone(), Arc::new(service.factory()));
        (storage, store)
    }

    #[tokio::test]
    async fn test_write_stores_verified_identifier() {
        let service = FakeTokenService::new();
        service.add_token("tok-A", "id-1", "active");
        let (_, store) = store(&service);

        let ctx = RequestContext::new();
        let credential = store.write(&ctx, "tok-A".into()).await.unwrap();
        assert_eq!(credential.token_id, "id-1");
        assert_eq!(store.read().await.unwrap(), Some(credential));
        assert!(store.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_token_is_rejected_without_remote_call() {
        let service = FakeTokenService::new();
        let (_, store) = store(&service);

        let err = store
            .write(&RequestContext::new(), "  ".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyCredential));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_a_fault() {
        let service = FakeTokenService::new();
        service.add_token("tok-A", "id-1", "active");
        service.fail_next(Operation::Verify, Failure::Transport("reset".to_string()));
        let (_, store) = store(&service);

        let err = store
            .write(&RequestContext::new(), "tok-A".into())
            .await
            .unwrap_err();
        assert!(!err.is_user_facing());
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotation_keeps_identifier() {
        let service = FakeTokenService::new();
        service.add_token("tok-A", "id-1", "active");
        let (_, store) = store(&service);
        let ctx = RequestContext::new();
        store.write(&ctx, "tok-A".into()).await.unwrap();

        let token_id = store.rotate(&ctx).await.unwrap();
        assert_eq!(token_id, "id-1");

        let stored = store.read().await.unwrap().unwrap();
        assert_eq!(stored.token_id, "id-1");
        assert_ne!(stored.token.expose(), "tok-A");
        assert_eq!(
            service.token("id-1").unwrap().value.expose(),
            stored.token.expose()
        );
    }

    #[tokio::test]
    async fn test_failed_rotation_keeps_old_value() {
        let service = FakeTokenService::new();
        service.add_token("tok-A", "id-1", "active");
        let (_, store) = store(&service);
        let ctx = RequestContext::new();
        store.write(&ctx, "tok-A".into()).await.unwrap();

        service.fail_next(
            Operation::Regenerate,
            Failure::Api {
                status: 403,
                message: "forbidden".to_string(),
            },
        );
        let err = store.rotate(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Rotation { .. }));
        assert_eq!(store.read().await.unwrap().unwrap().token.expose(), "tok-A");
    }

    #[tokio::test]
    async fn test_empty_stored_token_fails_session() {
        let service = FakeTokenService::new();
        let (storage, store) = store(&service);
        storage
            .put_json(CONFIG_TOKEN_KEY, &RootCredential::new("", "id-1"))
            .await
            .unwrap();

        assert!(matches!(store.session().await, Err(Error::EmptyCredential)));
        assert!(matches!(
            store.rotate(&RequestContext::new()).await,
            Err(Error::EmptyCredential)
        ));
        assert!(service.calls().is_empty());
    }
}
