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

//! Block destinations.

mod api;
mod datastore;
mod fail;
mod pin;
mod verify;

pub use api::ApiDrain;
pub use datastore::{DatastoreDrain, FlatFsDrain};
pub use fail::FailDrain;
pub use pin::{PinDrain, DEFAULT_PIN_TIMEOUT};
pub use verify::VerifyingDrain;

use crate::block::Block;
use crate::error::PumpResult;
use async_trait::async_trait;

/// Writes one block to a destination
///
/// Called concurrently from every worker. `Ok(())` means the block is at the destination,
/// whether this call wrote it or it was already there.
#[async_trait]
pub trait Drain: Send + Sync {
    async fn drain(&self, block: &Block) -> PumpResult<()>;
}
