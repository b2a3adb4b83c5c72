//! Lease registration, renewal and revocation through the CLI host

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokenlease::{Host, LeaseBook};
use tokenlease_backend::{Operation, Request, StaticSystemView};
use tokenlease_core::{Error, LeaseState, Result};
use tokenlease_remote::memory::{FakeTokenService, Operation as Remote};
use tokenlease_storage::{MemoryStorage, PrefixedStorage, Storage};

struct Fixture {
    host: Host,
    service: Arc<FakeTokenService>,
    book: LeaseBook,
}

/// Memory storage whose lease book writes fail
struct LeaseBookDown(MemoryStorage);

#[async_trait]
impl Storage for LeaseBookDown {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.0.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        if key.starts_with("leases/") {
            let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            return Err(Error::storage("put", key, io));
        }
        self.0.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.0.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.0.list(prefix).await
    }
}

async fn configured_host() -> Fixture {
    configured_host_over(Arc::new(MemoryStorage::new())).await
}

async fn configured_host_over(storage: Arc<dyn Storage>) -> Fixture {
    let service = FakeTokenService::new();
    service.add_token("tok-A", "id-1", "active");
    let host = Host::with_parts(
        Arc::clone(&storage),
        Arc::new(service.factory()),
        StaticSystemView::default(),
        "cloudflare",
        Duration::from_secs(5),
    );

    let response = host
        .request(
            Request::new(Operation::Update, "config/token").with_data(json!({"token": "tok-A"})),
        )
        .await
        .unwrap();
    assert!(!response.is_error());
    let response = host
        .request(
            Request::new(Operation::Update, "roles/deploy")
                .with_data(json!({"policy_document": r#"[{"effect":"allow"}]"#})),
        )
        .await
        .unwrap();
    assert!(!response.is_error());

    let book = LeaseBook::new(Arc::new(PrefixedStorage::new(storage, "leases")));
    Fixture {
        host,
        service,
        book,
    }
}

async fn issue(fixture: &Fixture) -> String {
    let response = fixture.host.issue("deploy", None).await.unwrap();
    assert!(!response.is_error(), "{:?}", response.error_message());
    response.data["lease_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_issue_registers_lease() {
    let fixture = configured_host().await;
    let lease_id = issue(&fixture).await;

    let leases = fixture.host.leases().await.unwrap();
    assert_eq!(leases.len(), 1);
    let lease = &leases[0];
    assert_eq!(lease.lease_id, lease_id);
    assert_eq!(lease.role, "deploy");
    assert_eq!(lease.state, LeaseState::Active);
    assert!(lease.expire_time > Utc::now());

    let token_id = lease.secret.internal_id().unwrap();
    assert!(fixture.service.token(token_id).is_some());
}

#[tokio::test]
async fn test_issue_for_missing_role_registers_nothing() {
    let fixture = configured_host().await;
    let response = fixture.host.issue("missing", None).await.unwrap();

    assert!(response.is_error());
    assert!(fixture.host.leases().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_token_revoked_when_lease_cannot_be_recorded() {
    let fixture = configured_host_over(Arc::new(LeaseBookDown(MemoryStorage::new()))).await;

    let err = fixture.host.issue("deploy", None).await.unwrap_err();
    assert!(matches!(err, Error::Storage { operation: "put", .. }));
    assert_eq!(fixture.service.count(Remote::Create), 1);
    assert_eq!(fixture.service.count(Remote::Delete), 1);
}

#[tokio::test]
async fn test_renew_updates_record() {
    let fixture = configured_host().await;
    let lease_id = issue(&fixture).await;
    let before = fixture.book.get(&lease_id).await.unwrap().unwrap();

    let response = fixture
        .host
        .renew(&lease_id, Duration::from_secs(3600))
        .await
        .unwrap();
    assert!(!response.is_error(), "{:?}", response.error_message());
    assert_eq!(response.data["lease_duration"], json!(3600));

    let after = fixture.book.get(&lease_id).await.unwrap().unwrap();
    assert_eq!(after.state, LeaseState::Renewed);
    assert!(after.last_renewal.is_some());
    assert!(after.expire_time < before.expire_time);
    assert_eq!(fixture.service.count(Remote::UpdateExpiry), 1);
}

#[tokio::test]
async fn test_revoke_then_renew_is_refused() {
    let fixture = configured_host().await;
    let lease_id = issue(&fixture).await;
    let token_id = fixture
        .book
        .get(&lease_id)
        .await
        .unwrap()
        .unwrap()
        .secret
        .internal_id()
        .unwrap()
        .to_string();

    let response = fixture.host.revoke(&lease_id).await.unwrap();
    assert_eq!(response.data["state"], json!("revoked"));
    assert!(fixture.service.token(&token_id).is_none());

    let response = fixture
        .host
        .renew(&lease_id, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(
        response.error_message(),
        Some("cannot renew a lease in state 'revoked'")
    );
    assert_eq!(fixture.service.count(Remote::UpdateExpiry), 0);

    // Revoking twice is allowed
    let response = fixture.host.revoke(&lease_id).await.unwrap();
    assert!(!response.is_error());
}

#[tokio::test]
async fn test_lapsed_lease_is_expired() {
    let fixture = configured_host().await;
    let lease_id = issue(&fixture).await;

    let mut record = fixture.book.get(&lease_id).await.unwrap().unwrap();
    record.expire_time = Utc::now() - TimeDelta::seconds(1);
    fixture.book.put(&record).await.unwrap();

    let response = fixture
        .host
        .renew(&lease_id, Duration::ZERO)
        .await
        .unwrap();
    assert!(response.is_error());
    let record = fixture.book.get(&lease_id).await.unwrap().unwrap();
    assert_eq!(record.state, LeaseState::Expired);

    let response = fixture.host.revoke(&lease_id).await.unwrap();
    assert_eq!(
        response.error_message(),
        Some("cannot revoke a lease in state 'expired'")
    );
}

#[tokio::test]
async fn test_unknown_lease() {
    let fixture = configured_host().await;
    let response = fixture.host.revoke("nope").await.unwrap();
    assert_eq!(response.error_message(), Some("lease 'nope' not found"));
}

#[tokio::test]
async fn test_lease_from_other_mount_is_refused() {
    let fixture = configured_host().await;
    let lease_id = issue(&fixture).await;

    let mut record = fixture.book.get(&lease_id).await.unwrap().unwrap();
    record.mount = "other".to_string();
    fixture.book.put(&record).await.unwrap();

    let response = fixture.host.revoke(&lease_id).await.unwrap();
    assert!(response.is_error());
    assert!(fixture.host.leases().await.unwrap().is_empty());
}
