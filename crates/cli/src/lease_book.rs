//! Host-side record of issued leases

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokenlease_core::{LeaseState, LeasedSecret, Result};
use tokenlease_storage::{Storage, StorageExt};

/// One issued credential as tracked by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub lease_id: String,
    pub mount: String,
    pub role: String,
    pub state: LeaseState,
    pub secret: LeasedSecret,
    pub issue_time: DateTime<Utc>,
    pub expire_time: DateTime<Utc>,
    #[serde(default)]
    pub last_renewal: Option<DateTime<Utc>>,
}

impl LeaseRecord {
    /// Mark the lease expired once its window has passed; returns whether it changed
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        if !self.state.is_terminal() && self.expire_time <= now {
            self.state = LeaseState::Expired;
            return true;
        }
        false
    }

    /// Time left before the lease expires
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expire_time - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Lease records keyed by lease id
pub struct LeaseBook {
    storage: Arc<dyn Storage>,
}

impl LeaseBook {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub async fn get(&self, lease_id: &str) -> Result<Option<LeaseRecord>> {
        self.storage.get_json(lease_id).await
    }

    pub async fn put(&self, record: &LeaseRecord) -> Result<()> {
        self.storage.put_json(&record.lease_id, record).await
    }

    /// All records, oldest first
    pub async fn list(&self) -> Result<Vec<LeaseRecord>> {
        let mut records = Vec::new();
        for key in self.storage.list("").await? {
            if key.ends_with('/') {
                continue;
            }
            if let Some(record) = self.get(&key).await? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.issue_time.cmp(&b.issue_time));
        Ok(records)
    }
}
