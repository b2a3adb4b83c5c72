//! Minimal host for one mount
//!
//! Plays the parts of the platform the backend expects around it: namespaced
//! storage, per-request deadlines and the lease subsystem that records issued
//! secrets and later renews or revokes them.

use crate::lease_book::{LeaseBook, LeaseRecord};
use crate::settings::BrokerSettings;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokenlease_backend::{
    calculate_ttl, Backend, Operation, Request, Response, StaticSystemView, SystemView, TtlRequest,
};
use tokenlease_core::{Error, LeaseState, LeasedSecret, RequestContext, Result};
use tokenlease_remote::{ClientFactory, HttpClientFactory};
use tokenlease_storage::{FileStorage, PrefixedStorage, Storage};
use tracing::{info, warn};

pub struct Host {
    backend: Backend,
    book: LeaseBook,
    system: StaticSystemView,
    mount: String,
    timeout: Duration,
}

impl Host {
    /// Open the host over the data directory named by `settings`
    pub fn open(settings: &BrokerSettings) -> Result<Self> {
        settings.validate()?;
        let storage = FileStorage::open(settings.data_dir())?;
        let clients = HttpClientFactory::new(settings.client_config()?)
            .map_err(|e| Error::configuration(e.to_string()))?;

        Ok(Self::with_parts(
            Arc::new(storage),
            Arc::new(clients),
            settings.system_view(),
            &settings.mount,
            settings.timeout,
        ))
    }

    /// Assemble a host from its collaborators
    pub fn with_parts(
        storage: Arc<dyn Storage>,
        clients: Arc<dyn ClientFactory>,
        system: StaticSystemView,
        mount: &str,
        timeout: Duration,
    ) -> Self {
        let mount_storage = PrefixedStorage::new(Arc::clone(&storage), format!("mounts/{mount}"));
        let backend = Backend::new(Arc::new(mount_storage), clients, Arc::new(system));
        let book = LeaseBook::new(Arc::new(PrefixedStorage::new(storage, "leases")));

        Self {
            backend,
            book,
            system,
            mount: mount.to_string(),
            timeout,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.timeout)
    }

    /// Pass a request straight to the mount
    pub async fn request(&self, request: Request) -> Result<Response> {
        self.backend.handle(&self.context(), request).await
    }

    /// Issue credentials for `role` and register the lease
    pub async fn issue(&self, role: &str, condition: Option<&str>) -> Result<Response> {
        let mut data = json!({});
        if let Some(condition) = condition {
            data["condition"] = Value::String(condition.to_string());
        }
        let request = Request::new(Operation::Read, format!("creds/{role}")).with_data(data);
        let mut response = self.request(request).await?;
        if response.is_error() {
            return Ok(response);
        }
        let Some(mut secret) = response.secret.take() else {
            return Err(Error::Issuance {
                message: "mount returned no secret".to_string(),
            });
        };

        let now = self.system.now().trunc_subsecs(0);
        let bounded = match calculate_ttl(
            &self.system,
            TtlRequest {
                backend_ttl: secret.ttl,
                backend_max_ttl: secret.max_ttl,
                ..TtlRequest::default()
            },
        ) {
            Ok(bounded) => bounded,
            Err(e) => return self.abandon(secret, e).await,
        };
        secret.issue_time = Some(now);
        let expire_time = match lease_end(now, bounded.ttl) {
            Ok(expire_time) => expire_time,
            Err(e) => return self.abandon(secret, e).await,
        };

        let record = LeaseRecord {
            lease_id: LeaseBook::new_id(),
            mount: self.mount.clone(),
            role: role.to_string(),
            state: LeaseState::Active,
            secret,
            issue_time: now,
            expire_time,
            last_renewal: None,
        };
        if let Err(e) = self.book.put(&record).await {
            return self.abandon(record.secret, e).await;
        }
        info!(lease_id = %record.lease_id, role = %role, "Lease registered");

        response.data.insert("lease_id".to_string(), json!(record.lease_id));
        response
            .data
            .insert("lease_duration".to_string(), json!(bounded.ttl.as_secs()));
        response.warnings.extend(bounded.warnings);
        Ok(response)
    }

    /// All leases of this mount, with lapsed ones marked expired
    pub async fn leases(&self) -> Result<Vec<LeaseRecord>> {
        let now = self.system.now();
        let mut leases = Vec::new();
        for mut record in self.book.list().await? {
            if record.mount != self.mount {
                continue;
            }
            if record.refresh(now) {
                self.book.put(&record).await?;
            }
            leases.push(record);
        }
        Ok(leases)
    }

    /// Renew a lease by `increment` (zero for the mount's TTL)
    pub async fn renew(&self, lease_id: &str, increment: Duration) -> Result<Response> {
        let mut record = match self.lookup(lease_id).await? {
            Ok(record) => record,
            Err(response) => return Ok(response),
        };
        let next = match record.state.renew() {
            Ok(next) => next,
            Err(e) => return Ok(Response::error(e.to_string())),
        };

        let mut secret = record.secret.clone();
        secret.increment = increment;
        let request = Request::new(Operation::Renew, format!("creds/{}", record.role))
            .with_secret(secret);
        let mut response = self.request(request).await?;
        if response.is_error() {
            return Ok(response);
        }
        let mut renewed = response.secret.take().unwrap_or_else(|| record.secret.clone());

        // The host bounds the lease again; the backend already padded the
        // remote expiry for this
        let now = self.system.now().trunc_subsecs(0);
        let bounded = match calculate_ttl(
            &self.system,
            TtlRequest {
                increment,
                backend_ttl: renewed.ttl,
                backend_max_ttl: renewed.max_ttl,
                start_time: Some(record.issue_time),
            },
        ) {
            Ok(bounded) => bounded,
            Err(e) => return Ok(Response::error(e.to_string())),
        };

        renewed.increment = Duration::ZERO;
        record.secret = renewed;
        record.state = next;
        record.expire_time = lease_end(now, bounded.ttl)?;
        record.last_renewal = Some(now);
        self.book.put(&record).await?;
        info!(lease_id = %lease_id, ttl_secs = bounded.ttl.as_secs(), "Lease renewed");

        response.data.insert("lease_id".to_string(), json!(lease_id));
        response
            .data
            .insert("lease_duration".to_string(), json!(bounded.ttl.as_secs()));
        response.warnings.extend(bounded.warnings);
        Ok(response)
    }

    /// Revoke a lease; revoking a revoked lease again is allowed
    pub async fn revoke(&self, lease_id: &str) -> Result<Response> {
        let mut record = match self.lookup(lease_id).await? {
            Ok(record) => record,
            Err(response) => return Ok(response),
        };
        let next = match record.state.revoke() {
            Ok(next) => next,
            Err(e) => return Ok(Response::error(e.to_string())),
        };

        let request = Request::new(Operation::Revoke, format!("creds/{}", record.role))
            .with_secret(record.secret.clone());
        let response = self.request(request).await?;
        if response.is_error() {
            return Ok(response);
        }

        record.state = next;
        self.book.put(&record).await?;
        info!(lease_id = %lease_id, "Lease revoked");
        Ok(Response::from_data(json!({
            "lease_id": lease_id,
            "state": record.state,
        })))
    }

    // Outer error is a fault, inner error is an error response for the caller
    async fn lookup(&self, lease_id: &str) -> Result<std::result::Result<LeaseRecord, Response>> {
        let Some(mut record) = self.book.get(lease_id).await? else {
            return Ok(Err(Response::error(format!("lease '{lease_id}' not found"))));
        };
        if record.mount != self.mount {
            return Ok(Err(Response::error(format!(
                "lease '{lease_id}' belongs to mount '{}'",
                record.mount
            ))));
        }
        if record.refresh(self.system.now()) {
            self.book.put(&record).await?;
        }
        Ok(Ok(record))
    }

    // A token was minted but cannot be leased; delete it rather than leak it.
    // The original failure is what the caller sees.
    async fn abandon(&self, secret: LeasedSecret, cause: Error) -> Result<Response> {
        warn!(error = %cause, "Revoking token that could not be leased");
        let request = Request::new(Operation::Revoke, "").with_secret(secret);
        match self.request(request).await {
            Ok(revoked) => {
                if let Some(message) = revoked.error_message() {
                    warn!(error = %message, "Failed to revoke unleased token");
                }
            }
            Err(e) => warn!(error = %e, "Failed to revoke unleased token"),
        }
        if cause.is_user_facing() {
            Ok(Response::error(cause.to_string()))
        } else {
            Err(cause)
        }
    }
}

fn lease_end(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::ttl(format!("lease of {}s is out of range", ttl.as_secs())))
}
