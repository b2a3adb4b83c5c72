//! Renewal and revocation of issued tokens

use crate::lease_config::LeasePolicyStore;
use crate::remote_failure;
use crate::root::RootCredentialStore;
use crate::system::SystemView;
use crate::ttl::{calculate_ttl, delta, TtlRequest};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::sync::Arc;
use tokenlease_core::{
    Error, LeasedSecret, RequestContext, Result, RENEWAL_EXPIRY_MARGIN_SECS,
};
use tracing::{info, warn};

/// Outcome of a successful renewal
#[derive(Debug, Clone)]
pub struct RenewedLease {
    /// The secret with its TTLs reset to the lease policy
    pub secret: LeasedSecret,
    /// Expiry now set on the remote token
    pub expires_on: DateTime<Utc>,
    pub warnings: Vec<String>,
}

/// Callbacks the host lease subsystem invokes for `token` secrets
pub struct LeaseHandler {
    roots: Arc<RootCredentialStore>,
    leases: LeasePolicyStore,
    system: Arc<dyn SystemView>,
}

impl LeaseHandler {
    pub fn new(
        roots: Arc<RootCredentialStore>,
        leases: LeasePolicyStore,
        system: Arc<dyn SystemView>,
    ) -> Self {
        Self {
            roots,
            leases,
            system,
        }
    }

    /// Extend the remote token's expiry to cover the renewed lease.
    ///
    /// The remote expiry gets a one minute margin on top of the bounded TTL
    /// because the host bounds the lease again after this returns, and the
    /// token must not expire before the lease does.
    pub async fn renew(&self, ctx: &RequestContext, secret: &LeasedSecret) -> Result<RenewedLease> {
        let token_id = required_id(secret)?;
        let session = self.roots.session().await?;
        let lease = self.leases.effective().await?;

        let bounded = calculate_ttl(
            self.system.as_ref(),
            TtlRequest {
                increment: secret.increment,
                backend_ttl: lease.ttl,
                backend_max_ttl: lease.max_ttl,
                start_time: secret.issue_time,
            },
        )?;
        for warning in &bounded.warnings {
            warn!(token_id = %token_id, "{warning}");
        }

        let now = self.system.now().trunc_subsecs(0);
        let expires_on = if bounded.ttl.is_zero() {
            now
        } else {
            now + delta(bounded.ttl)? + TimeDelta::seconds(RENEWAL_EXPIRY_MARGIN_SECS)
        };

        ctx.bound(
            "update-token-expiry",
            session.client().update_token_expiry(token_id, expires_on),
        )
        .await?
        .map_err(|e| {
            remote_failure("update-token-expiry", e, |message| Error::Renewal {
                token_id: token_id.to_string(),
                message,
            })
        })?;

        info!(token_id = %token_id, expires_on = %expires_on, "Renewed token");
        Ok(RenewedLease {
            secret: secret.clone().with_ttls(lease.ttl, lease.max_ttl),
            expires_on,
            warnings: bounded.warnings,
        })
    }

    /// Delete the remote token; a token that is already gone counts as revoked
    pub async fn revoke(&self, ctx: &RequestContext, secret: &LeasedSecret) -> Result<()> {
        let token_id = required_id(secret)?;
        let session = self.roots.session().await?;

        match ctx
            .bound("delete-token", session.client().delete_token(token_id))
            .await?
        {
            Ok(()) => {
                info!(token_id = %token_id, "Revoked token");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(token_id = %token_id, "Token already deleted remotely, treating as revoked");
                Ok(())
            }
            Err(e) => Err(remote_failure("delete-token", e, |message| {
                Error::Revocation {
                    token_id: token_id.to_string(),
                    message,
                }
            })),
        }
    }
}

fn required_id(secret: &LeasedSecret) -> Result<&str> {
    secret
        .internal_id()
        .ok_or_else(|| Error::MissingIdentifier {
            secret_type: secret.secret_type.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenlease_core::{SecretString, SECRET_TOKEN_TYPE};
    use tokenlease_remote::memory::FakeTokenService;
    use tokenlease_storage::MemoryStorage;

    fn handler(service: &Arc<FakeTokenService>) -> LeaseHandler {
        let storage = Arc::new(MemoryStorage::new());
        let roots = Arc::new(RootCredentialStore::new(
            storage.clone(),
            Arc::new(service.factory()),
        ));
        LeaseHandler::new(
            roots,
            LeasePolicyStore::new(storage),
            Arc::new(crate::StaticSystemView::default()),
        )
    }

    #[tokio::test]
    async fn test_missing_identifier_is_checked_first() {
        let service = FakeTokenService::new();
        let handler = handler(&service);

        let mut secret = LeasedSecret::new(SECRET_TOKEN_TYPE, "abc", SecretString::new("v"));
        secret.internal.id = None;

        let ctx = RequestContext::new();
        assert!(matches!(
            handler.revoke(&ctx, &secret).await,
            Err(Error::MissingIdentifier { .. })
        ));
        assert!(matches!(
            handler.renew(&ctx, &secret).await,
            Err(Error::MissingIdentifier { .. })
        ));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_mount_cannot_revoke() {
        let service = FakeTokenService::new();
        let handler = handler(&service);
        let secret = LeasedSecret::new(SECRET_TOKEN_TYPE, "abc", SecretString::new("v"));

        let err = handler
            .revoke(&RequestContext::new(), &secret)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured { .. }));
    }
}
