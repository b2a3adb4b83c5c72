//! Credential issuance

use crate::lease_config::LeasePolicyStore;
use crate::remote_failure;
use crate::roles::RoleStore;
use crate::root::RootCredentialStore;
use crate::system::SystemView;
use crate::ttl::{calculate_ttl, delta, TtlRequest};
use chrono::SubsecRound;
use std::sync::Arc;
use tokenlease_core::{
    Error, LeasedSecret, RequestContext, Result, RoleName, MAX_TOKEN_NAME_LENGTH,
    SECRET_TOKEN_TYPE, TOKEN_NAME_PREFIX,
};
use tokenlease_remote::{NewToken, TokenCondition, TokenPolicy};
use tracing::{info, warn};

/// A freshly minted token bound to a lease
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub secret: LeasedSecret,
    /// Adjustments made while bounding the TTL
    pub warnings: Vec<String>,
}

/// Turns a request for credentials under a role into a new remote token
pub struct CredentialIssuer {
    roots: Arc<RootCredentialStore>,
    roles: Arc<RoleStore>,
    leases: LeasePolicyStore,
    system: Arc<dyn SystemView>,
}

impl CredentialIssuer {
    pub fn new(
        roots: Arc<RootCredentialStore>,
        roles: Arc<RoleStore>,
        leases: LeasePolicyStore,
        system: Arc<dyn SystemView>,
    ) -> Self {
        Self {
            roots,
            roles,
            leases,
            system,
        }
    }

    /// Issue a token for `role`, optionally restricted by a JSON `condition`.
    ///
    /// Request and role problems are detected before any remote call. The
    /// returned secret carries the lease policy's TTLs, not the bounded TTL
    /// used for the remote expiry, so the host bounds renewals itself.
    pub async fn issue(
        &self,
        ctx: &RequestContext,
        role: &str,
        condition: Option<&str>,
    ) -> Result<IssuedCredential> {
        let condition = parse_condition(condition)?;

        let lookup = |source: Error| Error::RoleLookup {
            role: role.to_string(),
            source: Box::new(source),
        };
        let name = RoleName::new(role).map_err(lookup)?;
        let entry = self
            .roles
            .read(&name)
            .await
            .map_err(lookup)?
            .ok_or_else(|| Error::RoleNotFound {
                role: role.to_string(),
            })?;

        let policies: Vec<TokenPolicy> = if entry.policy_document.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(entry.policy_document.as_str()).map_err(|e| {
                Error::PolicyDecode {
                    role: role.to_string(),
                    message: e.to_string(),
                }
            })?
        };

        let session = self.roots.session().await?;
        let lease = self.leases.effective().await?;

        let bounded = calculate_ttl(
            self.system.as_ref(),
            TtlRequest {
                backend_ttl: lease.ttl,
                backend_max_ttl: lease.max_ttl,
                ..TtlRequest::default()
            },
        )?;
        for warning in &bounded.warnings {
            warn!(role = %name, "{warning}");
        }

        let now = self.system.now();
        let expires_on = (now + delta(bounded.ttl)?).trunc_subsecs(0);
        let token = NewToken {
            name: token_name(role, now.timestamp_nanos_opt().unwrap_or_default()),
            policies,
            condition,
            expires_on,
        };

        let created = ctx
            .bound("create-token", session.client().create_token(&token))
            .await?
            .map_err(|e| remote_failure("create-token", e, |message| Error::Issuance { message }))?;

        info!(
            role = %name,
            token_id = %created.id,
            expires_on = %expires_on,
            "Issued token"
        );

        let secret = LeasedSecret::new(SECRET_TOKEN_TYPE, created.id, created.value)
            .with_ttls(lease.ttl, lease.max_ttl);
        Ok(IssuedCredential {
            secret,
            warnings: bounded.warnings,
        })
    }
}

fn parse_condition(raw: Option<&str>) -> Result<TokenCondition> {
    match raw {
        None | Some("") => Ok(TokenCondition::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| Error::InvalidCondition {
            message: e.to_string(),
        }),
    }
}

/// Remote token name for an issuance under `role` at `nanos` since the epoch.
///
/// Long role names push the timestamp past the length limit, where it is cut
/// off; such names are no longer unique per issuance.
#[must_use]
pub fn token_name(role: &str, nanos: i64) -> String {
    let mut name = format!("{TOKEN_NAME_PREFIX}-{}-{nanos}", role.to_lowercase());
    if let Some((end, _)) = name.char_indices().nth(MAX_TOKEN_NAME_LENGTH) {
        name.truncate(end);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_token_name_shape() {
        assert_eq!(token_name("Deploy", 42), "vault-deploy-42");
    }

    #[test]
    fn test_long_role_truncates_timestamp() {
        let role = "r".repeat(110);
        let name = token_name(&role, 1_700_000_000_000_000_000);
        assert_eq!(name.len(), MAX_TOKEN_NAME_LENGTH);
        assert!(name.ends_with("r-170"));
    }

    #[test]
    fn test_limit_counts_characters() {
        let role = "\u{e9}".repeat(130);
        let name = token_name(&role, 42);
        assert_eq!(name.chars().count(), MAX_TOKEN_NAME_LENGTH);
        assert!(name.len() > MAX_TOKEN_NAME_LENGTH);
        assert!(name.starts_with("vault-\u{e9}"));

        let role = "\u{e9}".repeat(100);
        assert!(token_name(&role, 42).ends_with("-42"));
    }

    #[test]
    fn test_condition_parsing() {
        assert!(parse_condition(None).unwrap().is_empty());
        assert!(parse_condition(Some("")).unwrap().is_empty());

        let condition = parse_condition(Some(r#"{"request.ip":{"in":["10.0.0.0/8"]}}"#)).unwrap();
        assert_eq!(condition.request_ip.unwrap().allow, vec!["10.0.0.0/8"]);

        assert!(matches!(
            parse_condition(Some("{not valid json")),
            Err(Error::InvalidCondition { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_token_name_is_bounded(role in "\\PC{0,200}", nanos in any::<i64>()) {
            let name = token_name(&role, nanos);
            prop_assert!(name.chars().count() <= MAX_TOKEN_NAME_LENGTH);
            prop_assert!(name.starts_with("vault-"));
        }

        #[test]
        fn prop_short_names_keep_timestamp(role in "[a-z0-9_-]{1,40}", nanos in 0i64..i64::MAX) {
            let name = token_name(&role, nanos);
            let suffix = format!("-{nanos}");
            prop_assert!(name.ends_with(&suffix));
        }
    }
}
