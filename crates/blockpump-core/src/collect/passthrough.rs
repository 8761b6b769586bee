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
use crate::error::PumpResult;
use crate::key::Key;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use tokio::task::JoinHandle;

/// How a pass-through collector names the blocks it emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rekey {
    /// Keep the incoming key
    #[default]
    Identity,
    /// Replace a pin reverse-index key with the CID it embeds
    PinIndex,
}

/// Emits an empty-payload block for every key
///
/// For drains that only need the identifier, such as pinning.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCollector {
    rekey: Rekey,
}

impl PassThroughCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-key pin reverse-index entries to their CID
    pub fn pin_index() -> Self {
        PassThroughCollector {
            rekey: Rekey::PinIndex,
        }
    }
}

#[async_trait]
impl Collector for PassThroughCollector {
    async fn blocks(
        &self,
        input: Receiver<BlockInfo>,
        out: Sender<Resolved>,
    ) -> PumpResult<JoinHandle<()>> {
        let rekey = self.rekey;
        Ok(spawn_collector(input, out, move |key| async move {
            let key = match rekey {
                Rekey::Identity => key,
                Rekey::PinIndex => Key::new(&cid_from_pin_index_key(&key)?.to_string()),
            };
            Ok(Block::new(key, Vec::new()))
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PumpError;

    #[tokio::test]
    async fn test_pin_index_rekeying() {
        let cid = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn";
        let (in_tx, in_rx) = async_channel::bounded(2);
        let (out_tx, out_rx) = async_channel::bounded(2);
        let handle = PassThroughCollector::pin_index()
            .blocks(in_rx, out_tx)
            .await
            .unwrap();

        in_tx
            .send(BlockInfo::new(Key::new(&format!(
                "/pins/index/cidRindex/{}/x",
                cid
            ))))
            .await
            .unwrap();
        in_tx.send(BlockInfo::new(Key::new("/pins/index"))).await.unwrap();
        drop(in_tx);

        let block = out_rx.recv().await.unwrap().unwrap();
        assert_eq!(block.key.base_namespace(), cid);
        assert!(block.data.is_empty());

        let failed = out_rx.recv().await.unwrap().unwrap_err();
        assert!(matches!(failed.error, PumpError::Decode(_)));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_identity() {
        let (in_tx, in_rx) = async_channel::bounded(1);
        let (out_tx, out_rx) = async_channel::bounded(1);
        let handle = PassThroughCollector::new()
            .blocks(in_rx, out_tx)
            .await
            .unwrap();

        in_tx.send(BlockInfo::new(Key::new("/a/b"))).await.unwrap();
        drop(in_tx);

        assert_eq!(out_rx.recv().await.unwrap().unwrap().key.as_str(), "/a/b");
        assert!(out_rx.recv().await.is_err());
        handle.await.unwrap();
    }
}
