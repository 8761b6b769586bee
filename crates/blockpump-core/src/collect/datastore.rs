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

use super::{spawn_collector, Collector};
use crate::block::{Block, BlockInfo, Resolved};
use crate::cid::cid_from_pin_index_key;
use crate::error::{PumpError, PumpResult};
use crate::key::Key;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use blockpump_storage::StorageBackend;
use std::sync::Arc;
use tokio::task::JoinHandle;

async fn read(store: &dyn StorageBackend, key: &Key) -> PumpResult<Vec<u8>> {
    store
        .get(key.as_str())
        .await
        .map_err(|e| PumpError::Fetch(format!("{:#}", e)))
}

async fn check_reachable(store: &dyn StorageBackend) -> PumpResult<()> {
    store
        .ping()
        .await
        .map_err(|e| PumpError::unreachable(format!("{:?}", store), format!("{:#}", e)))
}

/// Reads each key from a datastore as-is
#[derive(Debug, Clone)]
pub struct DatastoreCollector {
    store: Arc<dyn StorageBackend>,
}

impl DatastoreCollector {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        DatastoreCollector { store }
    }
}

#[async_trait]
impl Collector for DatastoreCollector {
    async fn blocks(
        &self,
        input: Receiver<BlockInfo>,
        out: Sender<Resolved>,
    ) -> PumpResult<JoinHandle<()>> {
        check_reachable(self.store.as_ref()).await?;
        let store = Arc::clone(&self.store);

        Ok(spawn_collector(input, out, move |key| {
            let store = Arc::clone(&store);
            async move {
                let data = read(store.as_ref(), &key).await?;
                Ok(Block::new(key, data))
            }
        }))
    }
}

/// Reads pin reverse-index entries and re-keys them to the pinned CID
///
/// The index key `/pins/index/cidRindex/<cid>/<tag>` becomes `/<cid>`, which is what
/// CID-addressed drains expect.
#[derive(Debug, Clone)]
pub struct PinIndexCollector {
    store: Arc<dyn StorageBackend>,
}

impl PinIndexCollector {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        PinIndexCollector { store }
    }
}

#[async_trait]
impl Collector for PinIndexCollector {
    async fn blocks(
        &self,
        input: Receiver<BlockInfo>,
        out: Sender<Resolved>,
    ) -> PumpResult<JoinHandle<()>> {
        check_reachable(self.store.as_ref()).await?;
        let store = Arc::clone(&self.store);

        Ok(spawn_collector(input, out, move |key| {
            let store = Arc::clone(&store);
            async move {
                let data = read(store.as_ref(), &key).await?;
                let cid = cid_from_pin_index_key(&key)?;
                Ok(Block::new(Key::new(&cid.to_string()), data))
            }
        }))
    }
}
