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

//! Flat-file datastore
//!
//! Stores one file per key in a sharded directory tree, using the same layout as the
//! flat-file block stores found in content-addressed nodes:
//!
//! ```text
//! root/
//!   SHARDING                      # "/repo/flatfs/shard/v1/next-to-last/2"
//!   JQ/
//!     CIQHQSDUOQAXJQ.data
//! ```
//!
//! The shard directory is the two characters before the last character of the key name
//! (`next-to-last/2`). Only single-segment keys are accepted: a flat-file store has no
//! notion of namespaces, so `/blocks/CIQA` must be written as `/CIQA`.
//!
//! Writes go through a temporary file followed by an atomic rename, so readers never
//! observe a partially written block.

use crate::{normalize_key, ListPage, StorageBackend, StorageError};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const SHARDING_FILE: &str = "SHARDING";
const SHARDING_SPEC: &str = "/repo/flatfs/shard/v1/next-to-last/2";
const SHARD_SUFFIX_LEN: usize = 2;
const DATA_EXTENSION: &str = "data";

/// Flat-file datastore rooted at a directory
#[derive(Clone)]
pub struct FlatFsBackend {
    root: PathBuf,
    temp_counter: Arc<AtomicU64>,
}

impl FlatFsBackend {
    /// Open (or create) a flat-file datastore at `root`
    ///
    /// Creates the directory and its `SHARDING` marker when missing. Fails if `root` is a
    /// file or if an existing marker names a different sharding function.
    pub async fn open<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            fs::create_dir_all(&root).await?;
        }
        Self::open_root(root, true).await
    }

    /// Open a flat-file datastore that must already exist
    ///
    /// Unlike [`FlatFsBackend::open`], nothing is created: a missing directory or a
    /// missing `SHARDING` marker is an error.
    pub async fn open_existing<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(StorageError::backend(format!(
                "datastore does not exist: {}",
                root.display()
            ))
            .into());
        }
        Self::open_root(root, false).await
    }

    async fn open_root(root: PathBuf, create: bool) -> anyhow::Result<Self> {
        if !root.is_dir() {
            return Err(StorageError::backend(format!(
                "path exists but is not a directory: {}",
                root.display()
            ))
            .into());
        }

        let marker = root.join(SHARDING_FILE);
        match fs::read_to_string(&marker).await {
            Ok(existing) => {
                if existing.trim() != SHARDING_SPEC {
                    return Err(StorageError::backend(format!(
                        "unsupported sharding '{}' in {}",
                        existing.trim(),
                        marker.display()
                    ))
                    .into());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && create => {
                fs::write(&marker, format!("{}\n", SHARDING_SPEC)).await?;
                debug!(root = %root.display(), "Initialized flat-file datastore");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::backend(format!(
                    "not a flat-file datastore, {} is missing",
                    marker.display()
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        Ok(FlatFsBackend {
            root,
            temp_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Root directory of the datastore
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shard directory name for a key name
    fn shard(name: &str) -> String {
        let padded = format!("{}{}", "_".repeat(SHARD_SUFFIX_LEN + 1), name);
        let offset = padded.len() - SHARD_SUFFIX_LEN - 1;
        padded[offset..offset + SHARD_SUFFIX_LEN].to_string()
    }

    /// Validate a key and return its single segment
    fn key_name(key: &str) -> anyhow::Result<String> {
        let normalized = normalize_key(key);
        let name = normalized.trim_start_matches('/');
        if name.is_empty() {
            return Err(StorageError::invalid_key("key cannot be empty").into());
        }
        if name.contains('/') {
            return Err(StorageError::invalid_key(format!(
                "flat-file keys must have a single segment: {}",
                normalized
            ))
            .into());
        }
        if !name.is_ascii() || name.contains('.') {
            return Err(StorageError::invalid_key(format!("unsupported characters: {}", name)).into());
        }
        Ok(name.to_string())
    }

    /// Shard directory names, sorted
    async fn shards(&self) -> std::io::Result<Vec<String>> {
        let mut shards = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                shards.push(name.to_string());
            }
        }
        shards.sort();
        Ok(shards)
    }

    /// Keys stored in one shard directory that start with `prefix`
    async fn shard_keys(&self, shard: &str, prefix: &str) -> std::io::Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(self.root.join(shard)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = format!("/{}", stem);
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.root
            .join(Self::shard(name))
            .join(format!("{}.{}", name, DATA_EXTENSION))
    }
}

/// Write `data` to `temp_path`, flush it, and move it over `path`
async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, path).await
}

impl fmt::Debug for FlatFsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatFsBackend")
            .field("root", &self.root)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for FlatFsBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let name = Self::key_name(key)?;
        match fs::read(self.object_path(&name)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(format!("/{}", name)).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        let name = Self::key_name(key)?;
        let path = self.object_path(&name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{}.{}.tmp", DATA_EXTENSION, seq));

        if let Err(e) = write_then_rename(&temp_path, &path, data).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let name = Self::key_name(key)?;
        Ok(fs::try_exists(self.object_path(&name)).await?)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let name = Self::key_name(key)?;
        match fs::remove_file(self.object_path(&name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let prefix = normalize_key(prefix);
        let mut results = Vec::new();
        for shard in self.shards().await? {
            results.extend(self.shard_keys(&shard, &prefix).await?);
        }

        results.sort();
        Ok(results)
    }

    /// One shard directory per page; the token is the last shard listed
    async fn list_page(&self, prefix: &str, token: Option<String>) -> anyhow::Result<ListPage> {
        let prefix = normalize_key(prefix);
        let shards = self.shards().await?;
        let mut remaining = shards
            .iter()
            .filter(|shard| match token.as_deref() {
                Some(last) => shard.as_str() > last,
                None => true,
            });

        let Some(shard) = remaining.next() else {
            return Ok(ListPage::default());
        };
        let mut keys = self.shard_keys(shard, &prefix).await?;
        keys.sort();
        Ok(ListPage {
            keys,
            next: remaining.next().map(|_| shard.clone()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::is_not_found;
    use tempfile::TempDir;

    #[test]
    fn test_shard_next_to_last() {
        assert_eq!(FlatFsBackend::shard("CIQABCDEF"), "DE");
        assert_eq!(FlatFsBackend::shard("AB"), "_A");
        assert_eq!(FlatFsBackend::shard("A"), "__");
    }

    #[tokio::test]
    async fn test_open_writes_sharding_marker() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("blocks");

        FlatFsBackend::open(&root).await.unwrap();
        let marker = std::fs::read_to_string(root.join(SHARDING_FILE)).unwrap();
        assert_eq!(marker.trim(), SHARDING_SPEC);

        // Reopening an existing store succeeds
        FlatFsBackend::open(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_existing_refuses_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("no-such-blocks");

        assert!(FlatFsBackend::open_existing(&root).await.is_err());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_open_existing_requires_marker() {
        let temp_dir = TempDir::new().unwrap();

        let err = FlatFsBackend::open_existing(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains(SHARDING_FILE));
        assert!(!temp_dir.path().join(SHARDING_FILE).exists());

        FlatFsBackend::open(temp_dir.path()).await.unwrap();
        FlatFsBackend::open_existing(temp_dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_sharding() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(SHARDING_FILE),
            "/repo/flatfs/shard/v1/prefix/2\n",
        )
        .unwrap();

        assert!(FlatFsBackend::open(temp_dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_open_fails_on_file_path() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("file.txt");
        std::fs::write(&file_path, b"content").unwrap();

        assert!(FlatFsBackend::open(&file_path).await.is_err());
    }

    #[tokio::test]
    async fn test_put_get_layout() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FlatFsBackend::open(temp_dir.path()).await.unwrap();

        backend.put("/CIQABCDEF", b"block").await.unwrap();
        assert!(temp_dir.path().join("DE/CIQABCDEF.data").exists());
        assert_eq!(backend.get("CIQABCDEF").await.unwrap(), b"block");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FlatFsBackend::open(temp_dir.path()).await.unwrap();

        // A directory in place of the block file makes the final rename fail
        std::fs::create_dir_all(temp_dir.path().join("DE/CIQABCDEF.data/inner")).unwrap();
        assert!(backend.put("/CIQABCDEF", b"block").await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path().join("DE"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "{:?}", leftovers);
    }

    #[tokio::test]
    async fn test_nested_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FlatFsBackend::open(temp_dir.path()).await.unwrap();

        let err = backend.put("/blocks/CIQA", b"x").await.unwrap_err();
        let storage_err = err.downcast_ref::<StorageError>().unwrap();
        assert!(storage_err.is_invalid_key());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FlatFsBackend::open(temp_dir.path()).await.unwrap();

        assert!(!backend.exists("/NOPE").await.unwrap());
        assert!(is_not_found(&backend.get("/NOPE").await.unwrap_err()));
        backend.delete("/NOPE").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_skips_marker_and_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FlatFsBackend::open(temp_dir.path()).await.unwrap();

        backend.put("/CIQB", b"1").await.unwrap();
        backend.put("/CIQA", b"2").await.unwrap();
        backend.put("/AFKR", b"3").await.unwrap();
        std::fs::write(temp_dir.path().join("IQ/stray.data.7.tmp"), b"x").ok();

        assert_eq!(
            backend.list_objects("").await.unwrap(),
            vec!["/AFKR", "/CIQA", "/CIQB"]
        );
        assert_eq!(
            backend.list_objects("/CIQ").await.unwrap(),
            vec!["/CIQA", "/CIQB"]
        );
    }

    #[tokio::test]
    async fn test_list_page_walks_one_shard_at_a_time() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FlatFsBackend::open(temp_dir.path()).await.unwrap();

        backend.put("/CIQB", b"1").await.unwrap();
        backend.put("/CIQA", b"2").await.unwrap();
        backend.put("/AFKR", b"3").await.unwrap();

        let first = backend.list_page("", None).await.unwrap();
        assert_eq!(first.keys, vec!["/AFKR"]);
        assert_eq!(first.next.as_deref(), Some("FK"));

        let second = backend.list_page("", first.next).await.unwrap();
        assert_eq!(second.keys, vec!["/CIQA", "/CIQB"]);
        assert_eq!(second.next, None);
    }
}
