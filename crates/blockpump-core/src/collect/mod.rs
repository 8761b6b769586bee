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

//! Payload sources.
//!
//! A collector turns [`BlockInfo`] keys into [`Block`]s. One call to
//! [`Collector::blocks`] runs one sequential loop; the orchestrator starts one loop per
//! worker, all reading the same key queue.

mod api;
mod datastore;
mod passthrough;

pub use api::ApiCollector;
pub use datastore::{DatastoreCollector, PinIndexCollector};
pub use passthrough::{PassThroughCollector, Rekey};

use crate::block::{Block, BlockInfo, FailedBlock, Resolved};
use crate::error::PumpResult;
use crate::key::Key;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

/// Resolves keys into block payloads
#[async_trait]
pub trait Collector: Send + Sync {
    /// Check the source and start a loop moving `input` keys to `out` blocks
    ///
    /// An unreachable source fails here. The loop emits one [`Resolved`] per key and
    /// drops `out` once `input` is closed and empty. Keys that already carry an error are
    /// forwarded as failures without touching the source.
    async fn blocks(
        &self,
        input: Receiver<BlockInfo>,
        out: Sender<Resolved>,
    ) -> PumpResult<JoinHandle<()>>;
}

/// Spawn the standard collector loop around `fetch`
pub(crate) fn spawn_collector<F, Fut>(
    input: Receiver<BlockInfo>,
    out: Sender<Resolved>,
    fetch: F,
) -> JoinHandle<()>
where
    F: Fn(Key) -> Fut + Send + 'static,
    Fut: Future<Output = PumpResult<Block>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Ok(info) = input.recv().await {
            let resolved = match info.error {
                Some(error) => Err(FailedBlock {
                    key: info.key,
                    error,
                }),
                None => fetch(info.key.clone())
                    .await
                    .map_err(|error| FailedBlock {
                        key: info.key,
                        error,
                    }),
            };
            if out.send(resolved).await.is_err() {
                debug!("Block consumer is gone, stopping collector");
                break;
            }
        }
    })
}
