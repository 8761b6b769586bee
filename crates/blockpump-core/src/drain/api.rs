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
use crate::cid::{resolve_cid, CidPrefix, DEFAULT_BLOCK_CODEC};
use crate::error::{PumpError, PumpResult};
use async_trait::async_trait;
use tracing::trace;

/// Puts each block on a node over its HTTP API and checks the CID the node reports
#[derive(Debug, Clone)]
pub struct ApiDrain {
    api: NodeApi,
}

impl ApiDrain {
    pub fn new(api: NodeApi) -> Self {
        ApiDrain { api }
    }
}

#[async_trait]
impl Drain for ApiDrain {
    async fn drain(&self, block: &Block) -> PumpResult<()> {
        let expected = resolve_cid(&block.key, DEFAULT_BLOCK_CODEC)?;
        if self.api.block_stat(&expected).await? {
            trace!(cid = %expected, "Block already on node");
            return Ok(());
        }

        let prefix = CidPrefix::of(&expected);
        let actual = self.api.block_put(&block.data, &prefix).await?;
        prefix.ensure_matches(&CidPrefix::of(&actual))?;
        if actual.hash().digest() != expected.hash().digest() {
            return Err(PumpError::integrity(
                "digest",
                hex::encode(expected.hash().digest()),
                hex::encode(actual.hash().digest()),
            ));
        }
        Ok(())
    }
}
