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

//! Storage error types

use std::io;
use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by datastore backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key not present in the datastore
    #[error("key not found: {0}")]
    NotFound(String),

    /// Key cannot be represented by this backend
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// I/O error from the local filesystem
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Backend not reachable or misconfigured
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a NotFound error for `key`
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        StorageError::NotFound(key.into())
    }

    /// Create an InvalidKey error with context
    pub fn invalid_key<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidKey(msg.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StorageError::Backend(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Check if this is an InvalidKey error
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, StorageError::InvalidKey(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::not_found("/blocks/CIQA");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "key not found: /blocks/CIQA");
    }

    #[test]
    fn test_invalid_key_error() {
        let err = StorageError::invalid_key("nested key");
        assert!(err.is_invalid_key());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::other("read failed");
        let storage_err = StorageError::from(io_err);
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
