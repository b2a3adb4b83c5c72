//! Newtype wrappers validated once at the request boundary

use crate::errors::{Error, Result};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;

/// A validated role name.
///
/// Names start and end with a word character and may contain `-`, `.` and
/// `@` in between, matching what the mount routes under `roles/` and
/// `creds/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Create a new RoleName with validation
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::MissingName { what: "role" });
        }

        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let first = name.chars().next().is_some_and(is_word);
        let last = name.chars().next_back().is_some_and(is_word);
        if !first || !last {
            return Err(Error::InvalidName {
                name,
                message: "must start and end with a letter, digit or underscore".to_string(),
            });
        }
        if !name
            .chars()
            .all(|c| is_word(c) || c == '-' || c == '.' || c == '@')
        {
            return Err(Error::InvalidName {
                name,
                message: "may only contain letters, digits, '_', '-', '.' and '@'".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for this role
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}{}", crate::constants::ROLE_PREFIX, self.0)
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for RoleName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for RoleName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

/// A policy document that is syntactically valid JSON, stored compacted.
///
/// Only syntax is checked here. Whether the document describes valid remote
/// policies is only known when a token is issued from it. Compaction removes
/// insignificant whitespace and nothing else: numbers, escapes and duplicate
/// keys are kept exactly as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument(String);

impl PolicyDocument {
    /// Validate and compact a raw document; empty input yields an empty document
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str::<IgnoredAny>(raw).map_err(|e| Error::InvalidPolicy {
            message: format!("{raw:?}: {e}"),
        })?;
        Ok(Self(compact(raw)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Input must already be valid JSON
fn compact(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in raw.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            ' ' | '\t' | '\n' | '\r' => {}
            '"' => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

impl Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
