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

//! Datastore abstraction for blockpump
//!
//! Every source and destination that holds raw block bytes is reached through the
//! [`StorageBackend`] trait. The crate ships four implementations:
//! - [`FlatFsBackend`]: one file per key in a sharded directory tree
//! - [`DirBackend`]: one directory level per key segment, for whole-repository datastores
//! - [`MemoryBackend`]: an in-process map, used for tests and dry runs
//! - [`S3Backend`]: AWS S3 and S3-compatible object stores
//!
//! # Keys
//!
//! Keys use the datastore convention `/segment/segment/...`. Backends accept keys with or
//! without the leading slash and always report them back with it, so a key listed from one
//! backend can be written verbatim into another.
//!
//! # Examples
//!
//! ```no_run
//! use blockpump_storage::{StorageBackend, MemoryBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryBackend::new();
//!     store.put("/blocks/CIQA", b"payload").await?;
//!
//!     assert!(store.exists("/blocks/CIQA").await?);
//!     assert_eq!(store.list_objects("/blocks").await?, vec!["/blocks/CIQA"]);
//!     Ok(())
//! }
//! ```

pub mod dir;
pub mod error;
pub mod flatfs;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use std::fmt::Debug;

pub use dir::DirBackend;
pub use error::{StorageError, StorageResult};
pub use flatfs::FlatFsBackend;
pub use memory::MemoryBackend;
pub use s3::{S3Backend, S3Config};

/// Storage backend trait for datastore operations
///
/// Implementations must be `Send + Sync` so a single handle can be shared by every worker
/// of a pump run.
///
/// Operations return `anyhow::Result`. A missing key on `get` is reported as a
/// [`StorageError::NotFound`] wrapped in the `anyhow::Error`, so callers can tell it apart
/// with [`is_not_found`].
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Retrieve the value stored under `key`
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;

    /// Store `data` under `key`, replacing any previous value
    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()>;

    /// Check whether `key` is present
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Remove `key`; removing a missing key succeeds
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// List every key starting with `prefix`, sorted
    ///
    /// An empty prefix lists everything. Returned keys carry a leading `/`.
    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>>;

    /// List one page of keys starting with `prefix`
    ///
    /// Start with `token = None` and pass each page's [`ListPage::next`] to get the
    /// following one. The default returns the whole [`list_objects`](Self::list_objects)
    /// result as a single page.
    async fn list_page(&self, prefix: &str, token: Option<String>) -> anyhow::Result<ListPage> {
        if token.is_some() {
            return Ok(ListPage::default());
        }
        Ok(ListPage {
            keys: self.list_objects(prefix).await?,
            next: None,
        })
    }

    /// Cheap reachability probe used before a run starts
    ///
    /// The default always succeeds; remote backends override it.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One page of a paged key listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys of this page, with a leading `/`
    pub keys: Vec<String>,
    /// Token of the following page, `None` on the last one
    pub next: Option<String>,
}

/// Returns true when `err` wraps a [`StorageError::NotFound`]
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StorageError>()
        .map(StorageError::is_not_found)
        .unwrap_or(false)
}

/// Normalize a key to its canonical `/a/b` form
///
/// Empty segments are dropped, so `a//b/` and `/a/b` are the same key.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 1);
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    out
}
