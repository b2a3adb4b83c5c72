//! Directory-backed storage with atomic writes

use crate::Storage;
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokenlease_core::{Error, Result};
use uuid::Uuid;

/// Storage that maps each key to a file below a root directory.
///
/// `role/deploy` lives at `<root>/role/deploy`. Writes go to a temporary
/// file in the same directory and are renamed into place, so readers see
/// either the old or the new record.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| Error::storage("create root directory", root.display().to_string(), e))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.starts_with('.') {
                return Err(Error::storage(
                    "resolve",
                    key,
                    format!("invalid key segment '{segment}'"),
                ));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn dir_for(&self, prefix: &str) -> Result<PathBuf> {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(self.root.clone());
        }
        self.path_for(trimmed)
    }
}

/// Write data to a file atomically by writing to a temporary file and renaming
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent)?;

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));

    let written = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage("get", key, e)),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let content = value.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| Error::storage("put", key, e))?
            .map_err(|e| Error::storage("put", key, e))?;
        tracing::trace!(key = %key, "stored entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage("delete", key, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.dir_for(prefix)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage("list", prefix, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage("list", prefix, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::storage("list", prefix, e))?;
            if file_type.is_dir() {
                names.push(format!("{name}/"));
            } else {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.put("config/token", b"{\"id\":\"id-1\"}").await.unwrap();
        let content = fs::read(temp_dir.path().join("config").join("token")).unwrap();
        assert_eq!(content, b"{\"id\":\"id-1\"}");
        assert_eq!(
            storage.get("config/token").await.unwrap(),
            Some(b"{\"id\":\"id-1\"}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.put("role/deploy", b"old").await.unwrap();
        storage.put("role/deploy", b"new").await.unwrap();
        assert_eq!(storage.get("role/deploy").await.unwrap(), Some(b"new".to_vec()));

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path().join("role"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_keys_and_idempotent_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        assert!(storage.get("config/lease").await.unwrap().is_none());
        storage.delete("config/lease").await.unwrap();
        assert!(storage.list("role/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_children() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.put("role/b", b"{}").await.unwrap();
        storage.put("role/a", b"{}").await.unwrap();
        storage.put("role/team/c", b"{}").await.unwrap();
        assert_eq!(storage.list("role/").await.unwrap(), vec!["a", "b", "team/"]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        let err = storage.put("role/../../etc", b"x").await.unwrap_err();
        assert!(matches!(err, Error::Storage { operation: "resolve", .. }));
    }
}
