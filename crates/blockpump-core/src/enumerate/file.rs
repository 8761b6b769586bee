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

use super::Enumerator;
use crate::block::{BlockInfo, TotalCount};
use crate::error::{PumpError, PumpResult};
use crate::key::Key;
use async_channel::Sender;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Reads keys from a text file, one per line
///
/// Blank lines are skipped. This is the format failed-block files are written in.
#[derive(Debug, Clone)]
pub struct FileEnumerator {
    path: PathBuf,
    count: u64,
}

impl FileEnumerator {
    /// Open `path` and count its keys
    pub async fn open<P: AsRef<Path>>(path: P) -> PumpResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lines = open_lines(&path).await?;

        let mut count = 0;
        while let Some(line) = lines.next_line().await? {
            if !line.trim().is_empty() {
                count += 1;
            }
        }

        debug!(path = %path.display(), count, "Opened key file");
        Ok(FileEnumerator { path, count })
    }
}

async fn open_lines(path: &Path) -> PumpResult<tokio::io::Lines<BufReader<File>>> {
    let file = File::open(path).await.map_err(|e| {
        PumpError::Enumeration(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(BufReader::new(file).lines())
}

#[async_trait]
impl Enumerator for FileEnumerator {
    fn total_count(&self) -> TotalCount {
        TotalCount::Known(self.count)
    }

    async fn keys(&self, out: Sender<BlockInfo>) -> PumpResult<JoinHandle<()>> {
        let mut lines = open_lines(&self.path).await?;
        let path = self.path.clone();

        Ok(tokio::spawn(async move {
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Reading key file failed");
                        break;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if out.send(BlockInfo::new(Key::new(trimmed))).await.is_err() {
                    debug!("Key consumers are gone, stopping file enumeration");
                    break;
                }
            }
        }))
    }
}
