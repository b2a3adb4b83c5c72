//! Lease-bound dynamic token issuance
//!
//! A [`Backend`] serves one mount. The operator stores a root token under
//! `config/token`, optionally a lease policy under `config/lease`, and named
//! policy documents under `roles/<name>`. Consumers read `creds/<role>` to
//! get a freshly minted remote token whose expiry follows the lease; the host
//! lease subsystem later calls back to renew or revoke it.
//!
//! ## Key Components
//!
//! - [`RootCredentialStore`]: the root token, verified on write and rotated
//!   in place.
//! - [`LeasePolicyStore`] and [`RoleStore`]: mount configuration.
//! - [`CredentialIssuer`]: role + lease policy + TTL bounding → remote token.
//! - [`LeaseHandler`]: renew and revoke callbacks for issued tokens.
//! - [`paths`]: typed routing from host requests to the components above.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokenlease_backend::{Backend, Operation, Request, StaticSystemView};
//! use tokenlease_core::RequestContext;
//! use tokenlease_remote::{HttpClientConfig, HttpClientFactory};
//! use tokenlease_storage::MemoryStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clients = HttpClientFactory::new(HttpClientConfig::default())?;
//! let backend = Backend::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(clients),
//!     Arc::new(StaticSystemView::default()),
//! );
//!
//! let request = Request::new(Operation::Read, "creds/deploy");
//! let response = backend.handle(&RequestContext::new(), request).await?;
//! if let Some(message) = response.error_message() {
//!     eprintln!("{message}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod creds;
pub mod lease_config;
pub mod paths;
pub mod roles;
pub mod root;
pub mod secret_token;
pub mod system;
pub mod ttl;

pub use creds::{token_name, CredentialIssuer, IssuedCredential};
pub use lease_config::LeasePolicyStore;
pub use paths::{Operation, Request, Response};
pub use roles::{RoleStore, RoleUpdate};
pub use root::{RootCredentialStore, RootSession};
pub use secret_token::{LeaseHandler, RenewedLease};
pub use system::{StaticSystemView, SystemView};
pub use ttl::{calculate_ttl, BoundedTtl, TtlRequest};

use std::sync::Arc;
use tokenlease_core::Error;
use tokenlease_remote::{ClientFactory, RemoteError};
use tokenlease_storage::Storage;

/// One mount of the token issuance engine
pub struct Backend {
    roots: Arc<RootCredentialStore>,
    lease_policy: LeasePolicyStore,
    roles: Arc<RoleStore>,
    issuer: CredentialIssuer,
    leases: LeaseHandler,
}

impl Backend {
    /// Build a backend over mount-scoped storage
    pub fn new(
        storage: Arc<dyn Storage>,
        clients: Arc<dyn ClientFactory>,
        system: Arc<dyn SystemView>,
    ) -> Self {
        let roots = Arc::new(RootCredentialStore::new(Arc::clone(&storage), clients));
        let lease_policy = LeasePolicyStore::new(Arc::clone(&storage));
        let roles = Arc::new(RoleStore::new(storage));
        let issuer = CredentialIssuer::new(
            Arc::clone(&roots),
            Arc::clone(&roles),
            lease_policy.clone(),
            Arc::clone(&system),
        );
        let leases = LeaseHandler::new(Arc::clone(&roots), lease_policy.clone(), system);

        Self {
            roots,
            lease_policy,
            roles,
            issuer,
            leases,
        }
    }

    #[must_use]
    pub fn root_credentials(&self) -> &RootCredentialStore {
        &self.roots
    }

    #[must_use]
    pub fn lease_policy(&self) -> &LeasePolicyStore {
        &self.lease_policy
    }

    #[must_use]
    pub fn roles(&self) -> &RoleStore {
        &self.roles
    }

    #[must_use]
    pub fn issuer(&self) -> &CredentialIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn leases(&self) -> &LeaseHandler {
        &self.leases
    }
}

/// Map a remote failure onto the error taxonomy.
///
/// A service that never answered is a fault; a service that answered with a
/// refusal is reported to the caller through `reported`.
pub(crate) fn remote_failure(
    operation: &'static str,
    error: RemoteError,
    reported: impl FnOnce(String) -> Error,
) -> Error {
    if error.is_fault() {
        Error::remote_with_source(operation, error)
    } else {
        reported(error.to_string())
    }
}
