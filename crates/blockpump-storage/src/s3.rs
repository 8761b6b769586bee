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

//! AWS S3 datastore
//!
//! Maps datastore keys onto object keys inside one bucket, optionally below a root
//! directory: `/blocks/CIQA` with root `ipfs` becomes object `ipfs/blocks/CIQA`.
//! Works with S3-compatible services through a custom endpoint.
//!
//! Credentials come from the explicit fields of [`S3Config`] when an access key is set,
//! otherwise from the default AWS provider chain (environment, profile, instance role).

use crate::{normalize_key, ListPage, StorageBackend, StorageError};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for the S3 backend
#[derive(Clone, Default)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,

    /// AWS region; the provider chain decides when unset
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,

    /// Object key prefix inside the bucket
    pub root_directory: Option<String>,

    /// Static access key id
    pub access_key: Option<String>,

    /// Static secret access key
    pub secret_key: Option<String>,

    /// Session token for temporary credentials
    pub session_token: Option<String>,

    /// Attempts per request before giving up (default: 3)
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (default: 100ms)
    pub initial_retry_delay_ms: u64,
}

impl S3Config {
    /// Configuration for `bucket` with default retry policy
    pub fn new(bucket: impl Into<String>) -> Self {
        S3Config {
            bucket: bucket.into(),
            max_retries: 3,
            initial_retry_delay_ms: 100,
            ..Default::default()
        }
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Secrets stay out of logs
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("root_directory", &self.root_directory)
            .field("static_credentials", &self.access_key.is_some())
            .finish()
    }
}

/// AWS S3 datastore
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    config: Arc<S3Config>,
}

type BoxedOp<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

impl S3Backend {
    /// Connect to the bucket described by `config`
    ///
    /// Verifies bucket access with a `HeadBucket` call, so an unreachable or misnamed
    /// bucket fails here rather than on the first block.
    pub async fn connect(config: S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::backend("S3 bucket name is required").into());
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                config.session_token.clone(),
                None,
                "blockpump",
            ));
        }
        let sdk_config = loader.load().await;

        let client = if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint.clone())
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&sdk_config)
        };

        let backend = S3Backend {
            client,
            config: Arc::new(config),
        };
        backend.ping().await?;

        debug!(
            bucket = %backend.config.bucket,
            region = ?sdk_config.region(),
            "Connected to S3 bucket"
        );
        Ok(backend)
    }

    /// Object key for a datastore key
    fn object_key(&self, key: &str) -> Result<String> {
        let key = normalize_key(key);
        if key.is_empty() {
            return Err(StorageError::invalid_key("key cannot be empty").into());
        }
        let path = key.trim_start_matches('/');
        Ok(match self.root_prefix() {
            Some(root) => format!("{}/{}", root, path),
            None => path.to_string(),
        })
    }

    /// Datastore key for an object key
    fn datastore_key(&self, object_key: &str) -> String {
        let relative = match self.root_prefix() {
            Some(root) => object_key
                .strip_prefix(root)
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(object_key),
            None => object_key,
        };
        normalize_key(relative)
    }

    fn root_prefix(&self) -> Option<&str> {
        self.config
            .root_directory
            .as_deref()
            .map(|r| r.trim_matches('/'))
            .filter(|r| !r.is_empty())
    }

    /// Object-key prefix for a datastore key prefix
    fn object_prefix(&self, prefix: &str) -> String {
        let prefix = normalize_key(prefix);
        match (self.root_prefix(), prefix.trim_start_matches('/')) {
            (Some(root), "") => format!("{}/", root),
            (Some(root), p) => format!("{}/{}", root, p),
            (None, p) => p.to_string(),
        }
    }

    /// Run `operation` with exponential backoff
    async fn with_retry<F, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> BoxedOp<T>,
    {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0;
        let mut delay_ms = self.config.initial_retry_delay_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts || crate::is_not_found(&e) {
                        return Err(e);
                    }
                    warn!(
                        "S3 request failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, attempts, delay_ms, e
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(10_000);
                }
            }
        }
    }
}

fn looks_like_not_found(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("404")
        || message.contains("not found")
        || message.contains("notfound")
        || message.contains("nosuchkey")
        || message.contains("no such key")
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let object_key = self.object_key(key)?;
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let object_key = object_key.clone();

            Box::pin(async move {
                let response = match client
                    .get_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        let message = format!("{:?}", e);
                        if looks_like_not_found(&message) {
                            return Err(StorageError::not_found(object_key).into());
                        }
                        return Err(anyhow!("Failed to get object {}: {}", object_key, e));
                    }
                };

                let body = response
                    .body
                    .collect()
                    .await
                    .context("Failed to read object body")?;
                Ok(body.into_bytes().to_vec())
            })
        })
        .await
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let object_key = self.object_key(key)?;
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let data = Bytes::copy_from_slice(data);

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let object_key = object_key.clone();
            let data = data.clone();

            Box::pin(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .body(data.into())
                    .send()
                    .await
                    .map_err(|e| anyhow!("Failed to put object {}: {}", object_key, e))?;
                Ok(())
            })
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let object_key = self.object_key(key)?;
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let object_key = object_key.clone();

            Box::pin(async move {
                match client
                    .head_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .send()
                    .await
                {
                    Ok(_) => Ok(true),
                    Err(e) if looks_like_not_found(&format!("{:?}", e)) => Ok(false),
                    Err(e) => Err(anyhow!("Failed to check object {}: {}", object_key, e)),
                }
            })
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key)?;
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let object_key = object_key.clone();

            Box::pin(async move {
                client
                    .delete_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .send()
                    .await
                    .map_err(|e| anyhow!("Failed to delete object {}: {}", object_key, e))?;
                Ok(())
            })
        })
        .await
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let mut results = Vec::new();
        let mut token = None;

        loop {
            let page = self.list_page(prefix, token).await?;
            results.extend(page.keys);
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        results.sort();
        debug!("Found {} objects with prefix '{}'", results.len(), prefix);
        Ok(results)
    }

    async fn list_page(&self, prefix: &str, token: Option<String>) -> Result<ListPage> {
        let object_prefix = self.object_prefix(prefix);
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();

        let (keys, next) = self
            .with_retry(move || {
                let client = client.clone();
                let bucket = bucket.clone();
                let object_prefix = object_prefix.clone();
                let token = token.clone();

                Box::pin(async move {
                    let mut request = client.list_objects_v2().bucket(&bucket);
                    if !object_prefix.is_empty() {
                        request = request.prefix(&object_prefix);
                    }
                    if let Some(token) = token {
                        request = request.continuation_token(token);
                    }

                    let response = request
                        .send()
                        .await
                        .map_err(|e| anyhow!("Failed to list objects: {}", e))?;

                    let keys: Vec<String> = response
                        .contents()
                        .iter()
                        .filter_map(|obj| obj.key().map(str::to_string))
                        .collect();
                    let next = if response.is_truncated() == Some(true) {
                        response.next_continuation_token().map(str::to_string)
                    } else {
                        None
                    };
                    Ok((keys, next))
                })
            })
            .await?;

        Ok(ListPage {
            keys: keys.iter().map(|k| self.datastore_key(k)).collect(),
            next,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::backend(format!(
                    "cannot access S3 bucket {}: {}",
                    self.config.bucket, e
                ))
            })?;
        Ok(())
    }
}
