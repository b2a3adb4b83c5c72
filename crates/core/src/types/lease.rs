//! Lease policy and lease lifecycle state

use super::duration::seconds;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// TTL bounds applied to issued credentials.
///
/// A missing policy behaves like the zero value: both bounds defer to the
/// host-wide defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeasePolicy {
    #[serde(with = "seconds", default)]
    pub ttl: Duration,
    #[serde(with = "seconds", default)]
    pub max_ttl: Duration,
}

impl LeasePolicy {
    /// Create a lease policy, rejecting a ttl above a non-zero max_ttl
    pub fn new(ttl: Duration, max_ttl: Duration) -> Result<Self> {
        if !max_ttl.is_zero() && ttl > max_ttl {
            return Err(Error::configuration(format!(
                "ttl ({}s) cannot be greater than max_ttl ({}s)",
                ttl.as_secs(),
                max_ttl.as_secs()
            )));
        }
        Ok(Self { ttl, max_ttl })
    }
}

/// State of an issued credential as seen by the lease subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseState {
    Active,
    Renewed,
    Revoked,
    Expired,
}

impl LeaseState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Revoked | Self::Expired)
    }

    /// Transition taken by a successful renewal
    pub fn renew(self) -> Result<Self> {
        if self.is_terminal() {
            return Err(Error::configuration(format!(
                "cannot renew a lease in state '{self}'"
            )));
        }
        Ok(Self::Renewed)
    }

    /// Transition taken by a successful revocation; revoking twice is allowed
    pub fn revoke(self) -> Result<Self> {
        match self {
            Self::Expired => Err(Error::configuration("cannot revoke a lease in state 'expired'")),
            _ => Ok(Self::Revoked),
        }
    }
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Renewed => "renewed",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}
