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

//! Items flowing through the pipeline.

use crate::error::PumpError;
use crate::key::Key;
use std::fmt;

/// A key to migrate, as produced by an enumerator
#[derive(Debug)]
pub struct BlockInfo {
    pub key: Key,
    /// Set when the enumerator could not describe this entry properly
    pub error: Option<PumpError>,
}

impl BlockInfo {
    pub fn new(key: Key) -> Self {
        BlockInfo { key, error: None }
    }

    pub fn failed(key: Key, error: PumpError) -> Self {
        BlockInfo {
            key,
            error: Some(error),
        }
    }
}

/// A resolved block ready for a drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub key: Key,
    pub data: Vec<u8>,
}

impl Block {
    pub fn new(key: Key, data: Vec<u8>) -> Self {
        Block { key, data }
    }
}

/// A key the collector could not resolve
#[derive(Debug)]
pub struct FailedBlock {
    pub key: Key,
    pub error: PumpError,
}

/// Collector output: either a block or the reason it is missing
pub type Resolved = Result<Block, FailedBlock>;

/// Number of keys an enumerator expects to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalCount {
    Known(u64),
    #[default]
    Unknown,
}

impl TotalCount {
    pub fn known(self) -> Option<u64> {
        match self {
            TotalCount::Known(n) => Some(n),
            TotalCount::Unknown => None,
        }
    }
}

impl fmt::Display for TotalCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalCount::Known(n) => write!(f, "{}", n),
            TotalCount::Unknown => f.write_str("unknown"),
        }
    }
}
