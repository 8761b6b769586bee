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
use crate::api::NodeApi;
use crate::block::Block;
use crate::cid::{resolve_cid, DEFAULT_BLOCK_CODEC};
use crate::error::{PumpError, PumpResult};
use async_trait::async_trait;
use std::time::Duration;

/// Default bound on one `pin/add` call
pub const DEFAULT_PIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Pins each block's CID on a node, non-recursively
///
/// The payload is ignored; only the key matters. Each call is bounded by a timeout.
#[derive(Debug, Clone)]
pub struct PinDrain {
    api: NodeApi,
    timeout: Duration,
}

impl PinDrain {
    pub fn new(api: NodeApi) -> Self {
        PinDrain {
            api,
            timeout: DEFAULT_PIN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Drain for PinDrain {
    async fn drain(&self, block: &Block) -> PumpResult<()> {
        let cid = resolve_cid(&block.key, DEFAULT_BLOCK_CODEC)?;
        tokio::time::timeout(self.timeout, self.api.pin_add(&cid))
            .await
            .map_err(|_| PumpError::Timeout(self.timeout))?
    }
}
