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

//! Failed-block sinks.
//!
//! Every key that could not be migrated ends up here. The file sink writes one key per
//! line, the same format [`FileEnumerator`](crate::enumerate::FileEnumerator) reads, so a
//! failed run can be retried by feeding its output back in.

use crate::error::{PumpError, PumpResult};
use crate::key::Key;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

/// Destination for keys that failed to migrate
///
/// Shared by every worker of a run, so `append` must tolerate concurrent callers.
#[async_trait]
pub trait FailedBlocksWriter: Send + Sync {
    /// Record `key` as failed because of `cause`
    async fn append(&self, key: &Key, cause: &PumpError) -> PumpResult<()>;

    /// Persist buffered records
    async fn flush(&self) -> PumpResult<()> {
        Ok(())
    }
}

/// Discards failed keys
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFailedBlocks;

#[async_trait]
impl FailedBlocksWriter for NullFailedBlocks {
    async fn append(&self, _key: &Key, _cause: &PumpError) -> PumpResult<()> {
        Ok(())
    }
}

/// Writes failed keys to a file, one per line
#[derive(Debug)]
pub struct FileFailedBlocks {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileFailedBlocks {
    /// Create `path`, truncating an existing file
    pub async fn create<P: AsRef<Path>>(path: P) -> PumpResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        debug!(path = %path.display(), "Recording failed blocks");
        Ok(FileFailedBlocks {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FailedBlocksWriter for FileFailedBlocks {
    async fn append(&self, key: &Key, _cause: &PumpError) -> PumpResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(key.as_str().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn flush(&self) -> PumpResult<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        writer.get_mut().sync_all().await?;
        Ok(())
    }
}

/// Keeps failed keys and their causes in memory
#[derive(Debug, Default)]
pub struct MemoryFailedBlocks {
    entries: StdMutex<Vec<(Key, String)>>,
}

impl MemoryFailedBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded keys, in append order
    pub fn keys(&self) -> Vec<Key> {
        self.entries
            .lock()
            .map(|entries| entries.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    /// Recorded keys with the rendered cause
    pub fn entries(&self) -> Vec<(Key, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FailedBlocksWriter for MemoryFailedBlocks {
    async fn append(&self, key: &Key, cause: &PumpError) -> PumpResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PumpError::Storage(format!("failed-blocks lock poisoned: {}", e)))?;
        entries.push((key.clone(), cause.to_string()));
        Ok(())
    }
}
