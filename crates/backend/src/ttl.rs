//! Lease TTL bounding

use crate::system::SystemView;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::time::Duration;
use tokenlease_core::{Error, Result};

/// Inputs to [`calculate_ttl`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TtlRequest {
    /// Requested increment; zero for a fresh issuance
    pub increment: Duration,
    /// Backend-configured TTL
    pub backend_ttl: Duration,
    /// Backend-configured max TTL
    pub backend_max_ttl: Duration,
    /// When the lease was issued; `None` means now
    pub start_time: Option<DateTime<Utc>>,
}

/// A TTL after bounding, with the adjustments that were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedTtl {
    pub ttl: Duration,
    pub warnings: Vec<String>,
}

/// Compute the effective TTL of a lease.
///
/// The max is the system max, lowered by a non-zero backend max. The TTL is
/// the increment if set, else the backend TTL if set, else the system
/// default. The lease may not outlive `start_time + max`, so the TTL is
/// capped to what is left of that window. All times are truncated to whole
/// seconds.
pub fn calculate_ttl(system: &dyn SystemView, request: TtlRequest) -> Result<BoundedTtl> {
    let now = system.now().trunc_subsecs(0);
    let start = request
        .start_time
        .map_or(now, |start| start.trunc_subsecs(0));

    let mut max_ttl = system.max_lease_ttl();
    if !request.backend_max_ttl.is_zero() && request.backend_max_ttl < max_ttl {
        max_ttl = request.backend_max_ttl;
    }
    if max_ttl.is_zero() {
        return Err(Error::ttl("max TTL must be greater than zero"));
    }

    let mut ttl = if !request.increment.is_zero() {
        request.increment
    } else if !request.backend_ttl.is_zero() {
        request.backend_ttl
    } else {
        system.default_lease_ttl()
    };

    let max_valid_time = start
        .checked_add_signed(delta(max_ttl)?)
        .ok_or_else(|| Error::ttl("max TTL overflows the lease window"))?;
    let remaining = max_valid_time - now;
    if remaining <= TimeDelta::zero() {
        return Err(Error::ttl("past the max TTL, cannot renew"));
    }
    // Positive by the check above
    let remaining = remaining.to_std().unwrap_or(Duration::ZERO);

    let mut warnings = Vec::new();
    if ttl > remaining {
        warnings.push(format!(
            "TTL of {}s exceeded the effective max_ttl of {}s; TTL value is capped accordingly",
            ttl.as_secs(),
            remaining.as_secs()
        ));
        ttl = remaining;
    }

    Ok(BoundedTtl { ttl, warnings })
}

/// Convert a std duration for date arithmetic
pub(crate) fn delta(duration: Duration) -> Result<TimeDelta> {
    TimeDelta::from_std(duration)
        .map_err(|_| Error::ttl(format!("duration of {}s is out of range", duration.as_secs())))
}
