//! Role records

use super::newtypes::{PolicyDocument, RoleName};
use serde::{Deserialize, Serialize};

/// Stored form of a role, keyed by `role/<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    #[serde(default)]
    pub policy_document: PolicyDocument,
}

/// A named bundle of remote policies that issued tokens inherit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: RoleName,
    pub policy_document: PolicyDocument,
}

impl Role {
    #[must_use]
    pub fn from_entry(name: RoleName, entry: RoleEntry) -> Self {
        Self {
            name,
            policy_document: entry.policy_document,
        }
    }

    #[must_use]
    pub fn to_entry(&self) -> RoleEntry {
        RoleEntry {
            policy_document: self.policy_document.clone(),
        }
    }
}
