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

//! Error types for pump runs.
//!
//! Errors fall into two groups. Setup errors abort [`Pump::run`](crate::Pump::run) before
//! the first block moves. Item errors are attached to a single key, recorded in the
//! failed-blocks sink and never stop the run.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{target} is unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("cannot enumerate keys: {0}")]
    Enumeration(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("cannot decode identifier: {0}")]
    Decode(String),

    #[error("{field} mismatch: expected {expected}, got {actual}")]
    Integrity {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("write failed: {0}")]
    Write(String),

    #[error("pin failed: {0}")]
    Pin(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PumpError {
    pub fn unreachable(target: impl Into<String>, reason: impl ToString) -> Self {
        PumpError::Unreachable {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(reason: impl ToString) -> Self {
        PumpError::Decode(reason.to_string())
    }

    pub fn integrity(
        field: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        PumpError::Integrity {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this error aborts a whole run rather than a single block
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PumpError::InvalidConfig(_)
                | PumpError::Unreachable { .. }
                | PumpError::Enumeration(_)
                | PumpError::Storage(_)
        )
    }

    /// Whether the destination reported different identifier parameters than declared
    pub fn is_integrity(&self) -> bool {
        matches!(self, PumpError::Integrity { .. })
    }
}

pub type PumpResult<T> = Result<T, PumpError>;
