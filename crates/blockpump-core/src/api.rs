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

//! Client for the node HTTP RPC API (`/api/v0`).
//!
//! Every call is a `POST` with arguments in the query string, the way the node expects.
//! Only the handful of endpoints the pump needs are wrapped.

use crate::cid::{codec_name, hash_name, CidPrefix};
use crate::error::{PumpError, PumpResult};
use ::cid::Cid;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Answer of `/api/v0/version`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub commit: String,
}

/// Answer of `/api/v0/block/put`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockPutResponse {
    key: String,
}

/// One line of a streamed `/api/v0/pin/ls`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinEntry {
    pub cid: String,
    #[serde(rename = "Type")]
    pub pin_type: String,
}

/// Non-streamed `/api/v0/pin/ls` document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinListing {
    pub keys: HashMap<String, PinType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinType {
    #[serde(rename = "Type")]
    pub pin_type: String,
}

/// Error body returned by the node on failed calls
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    message: String,
}

/// Handle on one node API endpoint
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct NodeApi {
    base_url: String,
    client: Client,
}

impl NodeApi {
    /// Client for `url`; a missing scheme defaults to `http://`
    pub fn new(url: &str) -> PumpResult<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(PumpError::InvalidConfig("node API URL is empty".into()));
        }
        let base_url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
        let client = Client::builder()
            .build()
            .map_err(|e| PumpError::InvalidConfig(format!("cannot build HTTP client: {}", e)))?;
        Ok(NodeApi { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, command)
    }

    async fn call(
        &self,
        command: &str,
        query: &[(&str, String)],
        form: Option<Form>,
    ) -> Result<Response, String> {
        let url = self.endpoint(command);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).query(query);
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(format!("{} returned {}: {}", command, status, message.trim()))
    }

    /// Node version; used as a reachability probe
    pub async fn version(&self) -> PumpResult<VersionInfo> {
        let response = self
            .call("version", &[], None)
            .await
            .map_err(|e| PumpError::unreachable(&self.base_url, e))?;
        response
            .json::<VersionInfo>()
            .await
            .map_err(|e| PumpError::unreachable(&self.base_url, e))
    }

    /// Raw bytes of a block
    pub async fn block_get(&self, cid: &Cid) -> PumpResult<Vec<u8>> {
        let response = self
            .call("block/get", &[("arg", cid.to_string())], None)
            .await
            .map_err(PumpError::Fetch)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PumpError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Whether the node holds the block locally, without asking the network
    ///
    /// Any API-level refusal counts as absent; only transport failures are errors.
    pub async fn block_stat(&self, cid: &Cid) -> PumpResult<bool> {
        let url = self.endpoint("block/stat");
        let response = self
            .client
            .post(&url)
            .query(&[("arg", cid.to_string()), ("offline", "true".to_string())])
            .send()
            .await
            .map_err(|e| PumpError::Fetch(e.to_string()))?;
        Ok(response.status().is_success())
    }

    /// Store `data` with the identifier parameters of `prefix`, returning the node's CID
    pub async fn block_put(&self, data: &[u8], prefix: &CidPrefix) -> PumpResult<Cid> {
        let codec = codec_name(prefix.codec).ok_or_else(|| {
            PumpError::Write(format!("unsupported codec 0x{:x}", prefix.codec))
        })?;
        let mhtype = hash_name(prefix.mh_type).ok_or_else(|| {
            PumpError::Write(format!("unsupported multihash 0x{:x}", prefix.mh_type))
        })?;

        let form = Form::new().part("data", Part::bytes(data.to_vec()).file_name("data"));
        let query = [
            ("cid-codec", codec.to_string()),
            ("mhtype", mhtype.to_string()),
            ("mhlen", prefix.mh_len.to_string()),
        ];
        let response = self
            .call("block/put", &query, Some(form))
            .await
            .map_err(PumpError::Write)?;
        let put = response
            .json::<BlockPutResponse>()
            .await
            .map_err(|e| PumpError::Write(format!("invalid block/put answer: {}", e)))?;

        Cid::try_from(put.key.as_str()).map_err(|e| {
            PumpError::decode(format!("node returned invalid CID '{}': {}", put.key, e))
        })
    }

    /// Pin a single block, without its descendants
    pub async fn pin_add(&self, cid: &Cid) -> PumpResult<()> {
        self.call(
            "pin/add",
            &[("arg", cid.to_string()), ("recursive", "false".to_string())],
            None,
        )
        .await
        .map_err(PumpError::Pin)?;
        Ok(())
    }

    /// Start listing recursive pins
    ///
    /// With `stream` the node answers with one [`PinEntry`] JSON object per line,
    /// otherwise with a single [`PinListing`] document.
    pub async fn pin_ls(&self, stream: bool) -> PumpResult<Response> {
        self.call(
            "pin/ls",
            &[("type", "recursive".to_string()), ("stream", stream.to_string())],
            None,
        )
        .await
        .map_err(PumpError::Enumeration)
    }
}
