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
use crate::api::{NodeApi, PinEntry, PinListing};
use crate::block::{BlockInfo, TotalCount};
use crate::error::{PumpError, PumpResult};
use crate::key::Key;
use async_channel::Sender;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Response;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Lists recursive pins through the node HTTP API
///
/// Each pinned CID becomes a key `/<cid>`.
#[derive(Debug, Clone)]
pub struct ApiPinEnumerator {
    api: NodeApi,
    stream: bool,
}

impl ApiPinEnumerator {
    pub fn new(api: NodeApi, stream: bool) -> Self {
        ApiPinEnumerator { api, stream }
    }
}

#[async_trait]
impl Enumerator for ApiPinEnumerator {
    fn total_count(&self) -> TotalCount {
        TotalCount::Unknown
    }

    async fn keys(&self, out: Sender<BlockInfo>) -> PumpResult<JoinHandle<()>> {
        let response = self.api.pin_ls(self.stream).await?;
        let stream = self.stream;
        info!(api = %self.api.base_url(), stream, "Listing recursive pins");

        Ok(tokio::spawn(async move {
            let result = if stream {
                forward_lines(response, &out).await
            } else {
                forward_document(response, &out).await
            };
            if let Err(e) = result {
                error!(error = %e, "Pin listing aborted");
            }
        }))
    }
}

/// Returns false once the consumers are gone
async fn send_cid(cid: &str, out: &Sender<BlockInfo>) -> bool {
    if out.send(BlockInfo::new(Key::new(cid))).await.is_err() {
        debug!("Key consumers are gone, stopping pin enumeration");
        return false;
    }
    true
}

async fn forward_lines(response: Response, out: &Sender<BlockInfo>) -> PumpResult<()> {
    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| PumpError::Enumeration(e.to_string()))?;
        buffer.extend_from_slice(&chunk);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if !forward_line(&line, out).await? {
                return Ok(());
            }
        }
    }
    forward_line(&buffer, out).await?;
    Ok(())
}

async fn forward_line(line: &[u8], out: &Sender<BlockInfo>) -> PumpResult<bool> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(true);
    }
    let entry: PinEntry = serde_json::from_slice(line).map_err(|e| {
        PumpError::Enumeration(format!(
            "unexpected pin/ls line '{}': {}",
            String::from_utf8_lossy(line),
            e
        ))
    })?;
    Ok(send_cid(&entry.cid, out).await)
}

async fn forward_document(response: Response, out: &Sender<BlockInfo>) -> PumpResult<()> {
    let listing: PinListing = response
        .json()
        .await
        .map_err(|e| PumpError::Enumeration(format!("unexpected pin/ls answer: {}", e)))?;

    let mut cids: Vec<String> = listing.keys.into_keys().collect();
    cids.sort();
    for cid in cids {
        if !send_cid(&cid, out).await {
            break;
        }
    }
    Ok(())
}
