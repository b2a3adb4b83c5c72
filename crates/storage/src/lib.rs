//! Key/value storage for tokenlease
//!
//! The backend never owns a storage engine; it talks to whatever the host
//! hands it through the [`Storage`] trait. Two implementations ship here:
//! an in-memory map for tests and embedding, and a directory-backed store
//! whose writes are atomic renames so a crash never leaves a torn record.

mod file;
mod memory;
mod prefixed;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use prefixed::PrefixedStorage;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokenlease_core::{Error, Result};

/// Host-provided key/value storage
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the value stored at `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` at `key`, replacing any previous value in one step
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// List the direct children of `prefix`.
    ///
    /// Names are returned relative to `prefix`, sorted; nested "folders"
    /// appear once with a trailing `/`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// JSON helpers on top of raw storage
#[async_trait]
pub trait StorageExt: Storage {
    /// Read and decode a JSON value
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::json("decode", key, e)),
        }
    }

    /// Encode and write a JSON value
    async fn put_json<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::json("encode", key, e))?;
        self.put(key, &bytes).await
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Collapse full keys under `prefix` into direct child names
pub(crate) fn child_names<'a>(prefix: &str, keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = keys
        .filter_map(|key| key.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .map(|rest| match rest.find('/') {
            Some(idx) => rest[..=idx].to_string(),
            None => rest.to_string(),
        })
        .collect();
    names.sort();
    names.dedup();
    names
}
