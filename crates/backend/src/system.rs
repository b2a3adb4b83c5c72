//! Host-wide settings the backend defers to

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokenlease_core::{DEFAULT_SYSTEM_LEASE_TTL_SECS, DEFAULT_SYSTEM_MAX_LEASE_TTL_SECS};

/// View of the host's lease defaults and clock
pub trait SystemView: Send + Sync {
    /// TTL applied when neither the request nor the backend sets one
    fn default_lease_ttl(&self) -> Duration;

    /// Upper bound no lease may exceed
    fn max_lease_ttl(&self) -> Duration;

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System view with fixed defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSystemView {
    pub default_lease_ttl: Duration,
    pub max_lease_ttl: Duration,
}

impl Default for StaticSystemView {
    fn default() -> Self {
        Self {
            default_lease_ttl: Duration::from_secs(DEFAULT_SYSTEM_LEASE_TTL_SECS),
            max_lease_ttl: Duration::from_secs(DEFAULT_SYSTEM_MAX_LEASE_TTL_SECS),
        }
    }
}

impl SystemView for StaticSystemView {
    fn default_lease_ttl(&self) -> Duration {
        self.default_lease_ttl
    }

    fn max_lease_ttl(&self) -> Duration {
        self.max_lease_ttl
    }
}
