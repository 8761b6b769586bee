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

//! In-memory datastore
//!
//! Thread-safe [`StorageBackend`](crate::StorageBackend) backed by an
//! `Arc<RwLock<BTreeMap>>`. Clones share the same map, which lets a test hand one
//! handle to a drain and inspect the result through another.

use crate::{normalize_key, StorageBackend, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory datastore
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create an empty datastore
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a datastore pre-populated with `entries`
    pub fn with_data<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: AsRef<str>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v))
            .collect();
        MemoryBackend {
            store: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the datastore is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Snapshot of every stored key
    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys().cloned().collect()
    }

    fn checked_key(key: &str) -> anyhow::Result<String> {
        let key = normalize_key(key);
        if key.is_empty() {
            return Err(StorageError::invalid_key("key cannot be empty").into());
        }
        Ok(key)
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend").finish()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let key = Self::checked_key(key)?;
        let store = self.store.read().await;
        store
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key).into())
    }

    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        let key = Self::checked_key(key)?;
        self.store.write().await.insert(key, data.to_vec());
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let key = Self::checked_key(key)?;
        Ok(self.store.read().await.contains_key(&key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let key = Self::checked_key(key)?;
        self.store.write().await.remove(&key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let prefix = normalize_key(prefix);
        let store = self.store.read().await;
        // BTreeMap iteration is already sorted
        Ok(store
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::is_not_found;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MemoryBackend::new();
        backend.put("/blocks/CIQA", b"data").await.unwrap();

        assert_eq!(backend.len().await, 1);
        assert_eq!(backend.get("/blocks/CIQA").await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let backend = MemoryBackend::new();
        backend.put("blocks/CIQA", b"data").await.unwrap();

        assert!(backend.exists("/blocks/CIQA").await.unwrap());
        assert_eq!(backend.keys().await, vec!["/blocks/CIQA"]);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("/missing").await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_empty_key_operations() {
        let backend = MemoryBackend::new();

        assert!(backend.put("", b"data").await.is_err());
        assert!(backend.get("/").await.is_err());
        assert!(backend.exists("").await.is_err());
        assert!(backend.delete("").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.put("/a", b"data").await.unwrap();
        backend.delete("/a").await.unwrap();
        backend.delete("/a").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_objects_by_prefix() {
        let backend = MemoryBackend::with_data(vec![
            ("/blocks/B", vec![1]),
            ("/blocks/A", vec![2]),
            ("/pins/index/cidRindex/X/Y", vec![3]),
        ]);

        let blocks = backend.list_objects("/blocks").await.unwrap();
        assert_eq!(blocks, vec!["/blocks/A", "/blocks/B"]);

        let all = backend.list_objects("").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let backend1 = MemoryBackend::new();
        let backend2 = backend1.clone();

        backend2.put("/k", b"v").await.unwrap();
        assert_eq!(backend1.get("/k").await.unwrap(), b"v");
    }
}
