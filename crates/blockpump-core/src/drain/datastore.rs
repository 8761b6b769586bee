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

use super::Drain;
use crate::block::Block;
use crate::error::{PumpError, PumpResult};
use crate::key::Key;
use async_trait::async_trait;
use blockpump_storage::StorageBackend;
use std::sync::Arc;
use tracing::trace;

pub(super) async fn put_if_absent(store: &dyn StorageBackend, key: &Key, data: &[u8]) -> PumpResult<()> {
    let present = store
        .exists(key.as_str())
        .await
        .map_err(|e| PumpError::Write(format!("existence check failed: {:#}", e)))?;
    if present {
        trace!(key = %key, "Block already present");
        return Ok(());
    }
    store
        .put(key.as_str(), data)
        .await
        .map_err(|e| PumpError::Write(format!("{:#}", e)))
}

/// Writes each block under its own key
#[derive(Debug, Clone)]
pub struct DatastoreDrain {
    store: Arc<dyn StorageBackend>,
}

impl DatastoreDrain {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        DatastoreDrain { store }
    }
}

#[async_trait]
impl Drain for DatastoreDrain {
    async fn drain(&self, block: &Block) -> PumpResult<()> {
        put_if_absent(self.store.as_ref(), &block.key, &block.data).await
    }
}

/// Writes each block under the base segment of its key
///
/// `/blocks/CIQA` lands as `/CIQA`, the layout of a flat-file block store.
#[derive(Debug, Clone)]
pub struct FlatFsDrain {
    store: Arc<dyn StorageBackend>,
}

impl FlatFsDrain {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        FlatFsDrain { store }
    }
}

#[async_trait]
impl Drain for FlatFsDrain {
    async fn drain(&self, block: &Block) -> PumpResult<()> {
        let key = Key::new(block.key.base_namespace());
        if key.is_root() {
            return Err(PumpError::Write(format!("key {} has no base segment", block.key)));
        }
        put_if_absent(self.store.as_ref(), &key, &block.data).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use blockpump_storage::{FlatFsBackend, MemoryBackend};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_datastore_drain_keeps_key() {
        let store = MemoryBackend::new();
        let drain = DatastoreDrain::new(Arc::new(store.clone()));

        drain
            .drain(&Block::new(Key::new("/blocks/CIQA"), b"a".to_vec()))
            .await
            .unwrap();
        assert_eq!(store.get("/blocks/CIQA").await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_existing_block_is_not_rewritten() {
        let store = MemoryBackend::with_data([("/CIQA", b"original".to_vec())]);
        let drain = DatastoreDrain::new(Arc::new(store.clone()));

        drain
            .drain(&Block::new(Key::new("/CIQA"), b"other".to_vec()))
            .await
            .unwrap();
        assert_eq!(store.get("/CIQA").await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_flatfs_drain_uses_base_segment() {
        let dir = TempDir::new().unwrap();
        let store = FlatFsBackend::open(dir.path()).await.unwrap();
        let drain = FlatFsDrain::new(Arc::new(store.clone()));

        let block = Block::new(Key::new("/blocks/CIQABCDEF"), b"payload".to_vec());
        drain.drain(&block).await.unwrap();
        drain.drain(&block).await.unwrap();

        assert_eq!(store.get("/CIQABCDEF").await.unwrap(), b"payload");
        assert_eq!(store.list_objects("").await.unwrap(), vec!["/CIQABCDEF"]);
    }

    #[tokio::test]
    async fn test_flatfs_drain_rejects_root() {
        let drain = FlatFsDrain::new(Arc::new(MemoryBackend::new()));
        let result = drain.drain(&Block::new(Key::root(), vec![])).await;
        assert!(matches!(result, Err(PumpError::Write(_))));
    }
}
