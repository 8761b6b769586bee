// Blockpump - Block Migration for Content-Addressed Stores
// Copyright (C) 2026 Blockpump Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Namespaced directory datastore
//!
//! Maps every key segment onto a directory level, so a whole node repository (blocks,
//! pins, indexes) fits in one tree:
//!
//! ```text
//! /blocks/CIQA                      -> root/blocks/CIQA.data
//! /pins/index/cidRindex/bafy.../x   -> root/pins/index/cidRindex/bafy.../x.data
//! ```
//!
//! The `.data` suffix keeps a key and its children apart: `/a/b` lives in `a/b.data`
//! while `/a/b/c` lives under the directory `a/b/`.

use crate::{normalize_key, StorageBackend, StorageError};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const DATA_SUFFIX: &str = ".data";

/// Directory-tree datastore supporting nested keys
#[derive(Clone)]
pub struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    /// Open (or create) a directory datastore at `root`
    pub async fn open<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            fs::create_dir_all(&root).await?;
            debug!(root = %root.display(), "Created directory datastore");
        } else if !root.is_dir() {
            return Err(StorageError::backend(format!(
                "path exists but is not a directory: {}",
                root.display()
            ))
            .into());
        }

        Ok(DirBackend { root })
    }

    /// Open a directory datastore that must already exist
    pub async fn open_existing<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();

        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => Ok(DirBackend { root }),
            Ok(_) => Err(StorageError::backend(format!(
                "path exists but is not a directory: {}",
                root.display()
            ))
            .into()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::backend(
                format!("datastore does not exist: {}", root.display()),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Root directory of the datastore
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let normalized = normalize_key(key);
        if normalized.is_empty() {
            return Err(StorageError::invalid_key("key cannot be empty").into());
        }

        let mut path = self.root.clone();
        let mut segments = normalized.split('/').filter(|s| !s.is_empty()).peekable();
        while let Some(segment) = segments.next() {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StorageError::invalid_key(format!(
                    "unsupported key segment '{}' in {}",
                    segment, normalized
                ))
                .into());
            }
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{}{}", segment, DATA_SUFFIX));
            }
        }
        Ok(path)
    }
}

impl fmt::Debug for DirBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirBackend").field("root", &self.root).finish()
    }
}

#[async_trait]
impl StorageBackend for DirBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(normalize_key(key)).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let prefix = normalize_key(prefix);
        let mut results = Vec::new();
        let mut stack = vec![(self.root.clone(), String::new())];

        while let Some((dir, namespace)) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push((entry.path(), format!("{}/{}", namespace, name)));
                } else if let Some(stem) = name.strip_suffix(DATA_SUFFIX) {
                    let key = format!("{}/{}", namespace, stem);
                    if key.starts_with(&prefix) {
                        results.push(key);
                    }
                }
            }
        }

        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::is_not_found;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_nested_keys_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = DirBackend::open(dir.path()).await.unwrap();

        backend.put("/blocks/CIQA", b"block").await.unwrap();
        backend.put("/blocks", b"parent").await.unwrap();

        assert_eq!(backend.get("/blocks/CIQA").await.unwrap(), b"block");
        assert_eq!(backend.get("/blocks").await.unwrap(), b"parent");
        assert!(dir.path().join("blocks").join("CIQA.data").is_file());
    }

    #[tokio::test]
    async fn test_open_existing_refuses_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");

        assert!(DirBackend::open_existing(&root).await.is_err());
        assert!(!root.exists());

        std::fs::create_dir(&root).unwrap();
        DirBackend::open_existing(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_key() {
        let dir = TempDir::new().unwrap();
        let backend = DirBackend::open(dir.path()).await.unwrap();

        let err = backend.get("/blocks/nope").await.unwrap_err();
        assert!(is_not_found(&err));
        assert!(!backend.exists("/blocks/nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = DirBackend::open(dir.path()).await.unwrap();

        assert!(backend.put("/../escape", b"x").await.is_err());
        assert!(backend.put("", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_namespace() {
        let dir = TempDir::new().unwrap();
        let backend = DirBackend::open(dir.path()).await.unwrap();

        backend.put("/blocks/B", b"").await.unwrap();
        backend.put("/blocks/A", b"").await.unwrap();
        backend
            .put("/pins/index/cidRindex/bafyfoo/1", b"")
            .await
            .unwrap();

        assert_eq!(
            backend.list_objects("/blocks").await.unwrap(),
            vec!["/blocks/A", "/blocks/B"]
        );
        assert_eq!(
            backend.list_objects("/pins/index/cidRindex").await.unwrap(),
            vec!["/pins/index/cidRindex/bafyfoo/1"]
        );
        assert_eq!(backend.list_objects("").await.unwrap().len(), 3);
    }
}
