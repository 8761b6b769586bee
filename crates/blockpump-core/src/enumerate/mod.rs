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

//! Key sources.

mod api_pin;
mod datastore;
mod file;

pub use api_pin::ApiPinEnumerator;
pub use datastore::DatastoreEnumerator;
pub use file::FileEnumerator;

use crate::block::{BlockInfo, TotalCount};
use crate::error::PumpResult;
use async_channel::Sender;
use async_trait::async_trait;
use tokio::task::JoinHandle;

/// Produces the keys to migrate
#[async_trait]
pub trait Enumerator: Send + Sync {
    /// Expected number of keys, when the source can tell cheaply
    fn total_count(&self) -> TotalCount;

    /// Open the source and start streaming keys into `out`
    ///
    /// Open or query failures are returned here, before anything is sent. The returned
    /// task ends when the source is exhausted, on a source error (logged), or once every
    /// receiver of `out` is gone; it drops `out` on exit.
    async fn keys(&self, out: Sender<BlockInfo>) -> PumpResult<JoinHandle<()>>;
}
