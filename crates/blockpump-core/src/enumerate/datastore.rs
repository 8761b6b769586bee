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

use super::Enumerator;
use crate::block::{BlockInfo, TotalCount};
use crate::error::{PumpError, PumpResult};
use crate::key::{Key, BLOCKS_PREFIX, PIN_INDEX_PREFIX};
use async_channel::Sender;
use async_trait::async_trait;
use blockpump_storage::StorageBackend;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Lists every key of a datastore, optionally below a prefix
///
/// The listing is paged. [`keys`](Enumerator::keys) fetches the first page itself, so a query
/// the store refuses is a setup error; later pages are fetched by the enumeration task as the
/// consumers drain the queue. A page that fails mid-listing ends the enumeration early and is
/// logged. The total is reported as unknown.
#[derive(Debug, Clone)]
pub struct DatastoreEnumerator {
    store: Arc<dyn StorageBackend>,
    prefix: Option<String>,
}

impl DatastoreEnumerator {
    pub fn new(store: Arc<dyn StorageBackend>, prefix: Option<String>) -> Self {
        DatastoreEnumerator { store, prefix }
    }

    /// Block keys of a node repository datastore
    pub fn blocks(store: Arc<dyn StorageBackend>) -> Self {
        Self::new(store, Some(BLOCKS_PREFIX.to_string()))
    }

    /// Pin reverse-index keys of a node repository datastore
    pub fn pin_index(store: Arc<dyn StorageBackend>) -> Self {
        Self::new(store, Some(PIN_INDEX_PREFIX.to_string()))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

#[async_trait]
impl Enumerator for DatastoreEnumerator {
    fn total_count(&self) -> TotalCount {
        TotalCount::Unknown
    }

    async fn keys(&self, out: Sender<BlockInfo>) -> PumpResult<JoinHandle<()>> {
        let prefix = self.prefix.clone().unwrap_or_default();
        let first = self
            .store
            .list_page(&prefix, None)
            .await
            .map_err(|e| PumpError::Enumeration(format!("datastore query failed: {:#}", e)))?;

        info!(prefix = %prefix, "Enumerating datastore");

        let store = Arc::clone(&self.store);
        Ok(tokio::spawn(async move {
            let mut page = first;
            let mut listed = 0usize;
            loop {
                for raw in page.keys {
                    if out.send(BlockInfo::new(Key::new(&raw))).await.is_err() {
                        debug!("Key consumers are gone, stopping datastore enumeration");
                        return;
                    }
                    listed += 1;
                }

                let Some(token) = page.next else {
                    break;
                };
                page = match store.list_page(&prefix, Some(token)).await {
                    Ok(next) => next,
                    Err(e) => {
                        error!(
                            prefix = %prefix,
                            listed,
                            "Datastore listing failed, enumeration is partial: {:#}",
                            e
                        );
                        return;
                    }
                };
            }
            debug!(listed, "Datastore enumeration finished");
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use blockpump_storage::{ListPage, MemoryBackend};

    /// Serves two pages of keys and fails when asked for the second one
    #[derive(Debug)]
    struct BrokenSecondPage {
        fail_first: bool,
    }

    #[async_trait]
    impl StorageBackend for BrokenSecondPage {
        async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("no value for {}", key)
        }
        async fn put(&self, _key: &str, _data: &[u8]) -> anyhow::Result<()> {
            Ok(())
        }
        async fn exists(&self, _key: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn delete(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_objects(&self, _prefix: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("listing must be paged")
        }
        async fn list_page(
            &self,
            _prefix: &str,
            token: Option<String>,
        ) -> anyhow::Result<ListPage> {
            match token {
                None if self.fail_first => anyhow::bail!("permission denied"),
                None => Ok(ListPage {
                    keys: vec!["/blocks/CIQA".into(), "/blocks/CIQB".into()],
                    next: Some("page-2".into()),
                }),
                Some(_) => anyhow::bail!("connection reset"),
            }
        }
    }

    async fn collect(enumerator: &DatastoreEnumerator) -> Vec<String> {
        let (tx, rx) = async_channel::bounded(2);
        let handle = enumerator.keys(tx).await.unwrap();
        let mut keys = Vec::new();
        while let Ok(info) = rx.recv().await {
            keys.push(info.key.to_string());
        }
        handle.await.unwrap();
        keys
    }

    #[tokio::test]
    async fn test_prefix_presets() {
        let store = MemoryBackend::with_data([
            ("/blocks/CIQA", vec![1]),
            ("/blocks/CIQB", vec![2]),
            ("/pins/index/cidRindex/bafy/1", vec![]),
            ("/local/filesroot", vec![]),
        ]);
        let store: Arc<dyn StorageBackend> = Arc::new(store);

        let blocks = DatastoreEnumerator::blocks(Arc::clone(&store));
        assert_eq!(blocks.total_count(), TotalCount::Unknown);
        assert_eq!(collect(&blocks).await, vec!["/blocks/CIQA", "/blocks/CIQB"]);

        let pins = DatastoreEnumerator::pin_index(Arc::clone(&store));
        assert_eq!(collect(&pins).await, vec!["/pins/index/cidRindex/bafy/1"]);

        let all = DatastoreEnumerator::new(store, None);
        assert_eq!(collect(&all).await.len(), 4);
    }

    #[tokio::test]
    async fn test_mid_listing_failure_keeps_earlier_keys() {
        let enumerator =
            DatastoreEnumerator::blocks(Arc::new(BrokenSecondPage { fail_first: false }));
        assert_eq!(
            collect(&enumerator).await,
            vec!["/blocks/CIQA", "/blocks/CIQB"]
        );
    }

    #[tokio::test]
    async fn test_refused_query_fails_setup() {
        let enumerator =
            DatastoreEnumerator::blocks(Arc::new(BrokenSecondPage { fail_first: true }));
        let (tx, _rx) = async_channel::bounded(1);
        assert!(matches!(
            enumerator.keys(tx).await,
            Err(PumpError::Enumeration(_))
        ));
    }

    #[tokio::test]
    async fn test_pages_are_fetched_lazily() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = blockpump_storage::FlatFsBackend::open(dir.path()).await.unwrap();
        store.put("/AFKR", b"1").await.unwrap();
        store.put("/BFKR", b"2").await.unwrap();
        store.put("/CIQA", b"3").await.unwrap();

        let enumerator = DatastoreEnumerator::new(Arc::new(store), None);
        let (tx, rx) = async_channel::bounded(1);
        let handle = enumerator.keys(tx).await.unwrap();

        // The task cannot list past the first shard until its keys are consumed, so a shard
        // created now is still picked up
        std::fs::create_dir_all(dir.path().join("ZZ")).unwrap();
        std::fs::write(dir.path().join("ZZ/MZZZ.data"), b"4").unwrap();

        let mut keys = Vec::new();
        while let Ok(info) = rx.recv().await {
            keys.push(info.key.to_string());
        }
        handle.await.unwrap();
        assert_eq!(keys, vec!["/AFKR", "/BFKR", "/CIQA", "/MZZZ"]);
    }
}
