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
use crate::block::Block;
use crate::error::{PumpError, PumpResult};
use async_trait::async_trait;

/// Rejects every block
///
/// Paired with a failed-blocks file this turns a run into a key dump: every key the
/// enumerator and collector produce ends up in the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailDrain;

#[async_trait]
impl Drain for FailDrain {
    async fn drain(&self, _block: &Block) -> PumpResult<()> {
        Err(PumpError::Write("fail drain accepts no blocks".into()))
    }
}
