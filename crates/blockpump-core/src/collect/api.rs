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
use crate::api::NodeApi;
use crate::block::{Block, BlockInfo, Resolved};
use crate::cid::{resolve_cid, DEFAULT_BLOCK_CODEC};
use crate::error::PumpResult;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::info;

/// Fetches blocks from a node over its HTTP API
///
/// Keys may carry a CID string or a bare multihash in block-key encoding.
#[derive(Debug, Clone)]
pub struct ApiCollector {
    api: NodeApi,
}

impl ApiCollector {
    pub fn new(api: NodeApi) -> Self {
        ApiCollector { api }
    }
}

#[async_trait]
impl Collector for ApiCollector {
    async fn blocks(
        &self,
        input: Receiver<BlockInfo>,
        out: Sender<Resolved>,
    ) -> PumpResult<JoinHandle<()>> {
        let version = self.api.version().await?;
        info!(api = %self.api.base_url(), version = %version.version, "Collecting from node API");

        let api = self.api.clone();
        Ok(spawn_collector(input, out, move |key| {
            let api = api.clone();
            async move {
                let cid = resolve_cid(&key, DEFAULT_BLOCK_CODEC)?;
                let data = api.block_get(&cid).await?;
                Ok(Block::new(key, data))
            }
        }))
    }
}
