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

use super::datastore::put_if_absent;
use super::Drain;
use crate::block::Block;
use crate::cid::{resolve_cid, CidPrefix};
use crate::error::{PumpError, PumpResult};
use async_trait::async_trait;
use blockpump_storage::StorageBackend;
use std::sync::Arc;
use tracing::warn;

/// Writes each block to a datastore, reads it back and re-derives its CID
///
/// The expected CID comes from the key: bare-digest keys are wrapped with `codec`, keys that
/// already encode a CID keep theirs. A stored payload that hashes to anything else is an
/// integrity error and is removed again.
#[derive(Debug, Clone)]
pub struct VerifyingDrain {
    store: Arc<dyn StorageBackend>,
    codec: u64,
}

impl VerifyingDrain {
    pub fn new(store: Arc<dyn StorageBackend>, codec: u64) -> Self {
        VerifyingDrain { store, codec }
    }

    pub fn codec(&self) -> u64 {
        self.codec
    }
}

#[async_trait]
impl Drain for VerifyingDrain {
    async fn drain(&self, block: &Block) -> PumpResult<()> {
        let expected = resolve_cid(&block.key, self.codec)?;
        let prefix = CidPrefix::of(&expected);

        put_if_absent(self.store.as_ref(), &block.key, &block.data).await?;
        let stored = self
            .store
            .get(block.key.as_str())
            .await
            .map_err(|e| PumpError::Write(format!("read-back failed: {:#}", e)))?;

        let actual = prefix.sum(&stored)?;
        let verdict = prefix.ensure_matches(&CidPrefix::of(&actual)).and_then(|_| {
            if actual.hash().digest() == expected.hash().digest() {
                Ok(())
            } else {
                Err(PumpError::integrity(
                    "digest",
                    hex::encode(expected.hash().digest()),
                    hex::encode(actual.hash().digest()),
                ))
            }
        });

        if verdict.is_err() {
            if let Err(e) = self.store.delete(block.key.as_str()).await {
                warn!(key = %block.key, "Failed to remove mismatched block: {:#}", e);
            }
        }
        verdict
    }
}
