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

//! Building pipeline stages from configuration.

use crate::api::NodeApi;
use crate::cid::DEFAULT_BLOCK_CODEC;
use crate::collect::{ApiCollector, Collector, DatastoreCollector, PinIndexCollector};
use crate::drain::{
    ApiDrain, DatastoreDrain, Drain, FailDrain, FlatFsDrain, PinDrain, VerifyingDrain,
};
use crate::enumerate::{ApiPinEnumerator, DatastoreEnumerator, Enumerator, FileEnumerator};
use crate::error::{PumpError, PumpResult};
use crate::failed::{FailedBlocksWriter, FileFailedBlocks, NullFailedBlocks};
use crate::pump::PumpConfig;
use blockpump_config::{
    CollectorConfig, DrainConfig, EnumeratorConfig, PumpSettings, S3Store, StoreConfig,
};
use blockpump_storage::{
    DirBackend, FlatFsBackend, MemoryBackend, S3Backend, S3Config, StorageBackend,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Open (or create) the datastore described by `config`
///
/// Destination stores are created on demand. Every call opens a new handle; `memory` stores
/// are therefore never shared between stages.
pub async fn open_store(config: &StoreConfig) -> PumpResult<Arc<dyn StorageBackend>> {
    open(config, true).await
}

/// Open the datastore described by `config`, which must already exist
///
/// Used for stores a run reads from: a missing flat-file or directory store is a setup
/// error instead of an empty source.
pub async fn open_existing_store(config: &StoreConfig) -> PumpResult<Arc<dyn StorageBackend>> {
    open(config, false).await
}

async fn open(config: &StoreConfig, create: bool) -> PumpResult<Arc<dyn StorageBackend>> {
    let store: Arc<dyn StorageBackend> = match config {
        StoreConfig::Flatfs { path } => {
            let backend = if create {
                FlatFsBackend::open(path).await
            } else {
                FlatFsBackend::open_existing(path).await
            };
            Arc::new(backend.map_err(|e| storage_error(path.display(), e))?)
        }
        StoreConfig::Dir { path } => {
            let backend = if create {
                DirBackend::open(path).await
            } else {
                DirBackend::open_existing(path).await
            };
            Arc::new(backend.map_err(|e| storage_error(path.display(), e))?)
        }
        StoreConfig::Memory => Arc::new(MemoryBackend::new()),
        StoreConfig::S3(s3) => Arc::new(
            S3Backend::connect(s3_config(s3))
                .await
                .map_err(|e| storage_error(format!("s3://{}", s3.bucket), e))?,
        ),
    };
    info!(backend = ?store, create, "Opened datastore");
    Ok(store)
}

/// Open a destination store and make sure it answers
async fn open_destination(config: &StoreConfig) -> PumpResult<Arc<dyn StorageBackend>> {
    let store = open_store(config).await?;
    store
        .ping()
        .await
        .map_err(|e| PumpError::unreachable(format!("{:?}", store), format!("{:#}", e)))?;
    Ok(store)
}

/// Node API client for a destination, probed with a version call
async fn connect_node(url: &str) -> PumpResult<NodeApi> {
    let api = NodeApi::new(url)?;
    let version = api.version().await?;
    info!(api = %api.base_url(), version = %version.version, "Draining to node API");
    Ok(api)
}

fn storage_error(target: impl std::fmt::Display, e: anyhow::Error) -> PumpError {
    PumpError::Storage(format!("cannot open {}: {:#}", target, e))
}

fn s3_config(store: &S3Store) -> S3Config {
    let mut config = S3Config::new(store.bucket.clone());
    config.region = Some(store.region.clone());
    config.endpoint = store.endpoint.clone();
    config.root_directory = store.root_directory.clone();
    config.access_key = store.access_key.clone();
    config.secret_key = store.secret_key.clone();
    config.session_token = store.session_token.clone();
    config
}

pub async fn build_enumerator(config: &EnumeratorConfig) -> PumpResult<Arc<dyn Enumerator>> {
    let enumerator: Arc<dyn Enumerator> = match config {
        EnumeratorConfig::File { path } => Arc::new(FileEnumerator::open(path).await?),
        EnumeratorConfig::Datastore { store, prefix } => Arc::new(DatastoreEnumerator::new(
            open_existing_store(store).await?,
            prefix.clone(),
        )),
        EnumeratorConfig::Blocks { store } => {
            Arc::new(DatastoreEnumerator::blocks(open_existing_store(store).await?))
        }
        EnumeratorConfig::PinIndex { store } => {
            Arc::new(DatastoreEnumerator::pin_index(open_existing_store(store).await?))
        }
        EnumeratorConfig::ApiPin { url, stream } => {
            Arc::new(ApiPinEnumerator::new(NodeApi::new(url)?, *stream))
        }
    };
    Ok(enumerator)
}

pub async fn build_collector(config: &CollectorConfig) -> PumpResult<Arc<dyn Collector>> {
    let collector: Arc<dyn Collector> = match config {
        CollectorConfig::Api { url } => Arc::new(ApiCollector::new(NodeApi::new(url)?)),
        CollectorConfig::Datastore { store } => {
            Arc::new(DatastoreCollector::new(open_existing_store(store).await?))
        }
        CollectorConfig::PinIndex { store } => {
            Arc::new(PinIndexCollector::new(open_existing_store(store).await?))
        }
    };
    Ok(collector)
}

/// Build the drain described by `config`
///
/// Destinations are probed before the drain is returned, so an unreachable node or store
/// fails the run during setup.
pub async fn build_drain(config: &DrainConfig, pump: &PumpConfig) -> PumpResult<Arc<dyn Drain>> {
    let drain: Arc<dyn Drain> = match config {
        DrainConfig::Api { url } => Arc::new(ApiDrain::new(connect_node(url).await?)),
        DrainConfig::Datastore { store } => {
            Arc::new(DatastoreDrain::new(open_destination(store).await?))
        }
        DrainConfig::Flatfs { path } => Arc::new(FlatFsDrain::new(
            open_destination(&StoreConfig::Flatfs { path: path.clone() }).await?,
        )),
        DrainConfig::Pin { url } => {
            Arc::new(PinDrain::new(connect_node(url).await?).with_timeout(pump.pin_timeout))
        }
        DrainConfig::Verify { store, codec } => Arc::new(VerifyingDrain::new(
            open_destination(store).await?,
            codec.unwrap_or(DEFAULT_BLOCK_CODEC),
        )),
        DrainConfig::Fail => Arc::new(FailDrain),
    };
    Ok(drain)
}

/// Run-wide settings of a configuration document
pub fn pump_config(settings: &PumpSettings) -> PumpConfig {
    PumpConfig::new(settings.workers)
        .with_pin_timeout(Duration::from_secs(settings.pin_timeout_secs))
}

/// Failed-blocks sink for an optional output path
///
/// No path, or an empty one, discards failed keys.
pub async fn failed_blocks_sink(path: Option<&Path>) -> PumpResult<Arc<dyn FailedBlocksWriter>> {
    match path {
        Some(path) if !path.as_os_str().is_empty() => {
            Ok(Arc::new(FileFailedBlocks::create(path).await?))
        }
        _ => Ok(Arc::new(NullFailedBlocks)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_open_flatfs_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&StoreConfig::Flatfs {
            path: dir.path().to_path_buf(),
        })
        .await
        .unwrap();
        store.put("/CIQA", b"x").await.unwrap();
        assert!(store.exists("/CIQA").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_key_file_fails_setup() {
        let dir = TempDir::new().unwrap();
        let result = build_enumerator(&EnumeratorConfig::File {
            path: dir.path().join("absent.txt"),
        })
        .await;
        assert!(matches!(result, Err(PumpError::Enumeration(_))));
    }

    async fn node() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/version"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"Version": "0.29.0"})),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_every_drain_kind_builds() {
        let dir = TempDir::new().unwrap();
        let server = node().await;
        let pump = PumpConfig::default();
        let configs = [
            DrainConfig::Api { url: server.uri() },
            DrainConfig::Datastore {
                store: StoreConfig::Memory,
            },
            DrainConfig::Flatfs {
                path: dir.path().join("flatfs"),
            },
            DrainConfig::Pin {
                url: server.address().to_string(),
            },
            DrainConfig::Verify {
                store: StoreConfig::Memory,
                codec: None,
            },
            DrainConfig::Fail,
        ];
        for config in &configs {
            assert!(build_drain(config, &pump).await.is_ok(), "{}", config.kind());
        }
        assert!(dir.path().join("flatfs").join("SHARDING").is_file());
    }

    #[tokio::test]
    async fn test_unreachable_node_drain_fails_setup() {
        let pump = PumpConfig::default();
        for config in [
            DrainConfig::Api {
                url: "http://127.0.0.1:1".into(),
            },
            DrainConfig::Pin {
                url: "127.0.0.1:1".into(),
            },
        ] {
            assert!(
                matches!(
                    build_drain(&config, &pump).await,
                    Err(PumpError::Unreachable { .. })
                ),
                "{}",
                config.kind()
            );
        }
    }

    #[tokio::test]
    async fn test_missing_source_store_fails_setup() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-blocks-dir");

        let enumerator = build_enumerator(&EnumeratorConfig::Datastore {
            store: StoreConfig::Flatfs {
                path: missing.clone(),
            },
            prefix: None,
        })
        .await;
        assert!(matches!(enumerator, Err(PumpError::Storage(_))));

        let collector = build_collector(&CollectorConfig::Datastore {
            store: StoreConfig::Flatfs {
                path: missing.clone(),
            },
        })
        .await;
        assert!(matches!(collector, Err(PumpError::Storage(_))));

        let repo = build_enumerator(&EnumeratorConfig::Blocks {
            store: StoreConfig::Dir {
                path: missing.clone(),
            },
        })
        .await;
        assert!(matches!(repo, Err(PumpError::Storage(_))));

        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_existing_source_store_opens() {
        let dir = TempDir::new().unwrap();
        let blocks = dir.path().join("blocks");
        open_store(&StoreConfig::Flatfs {
            path: blocks.clone(),
        })
        .await
        .unwrap();

        build_collector(&CollectorConfig::Datastore {
            store: StoreConfig::Flatfs { path: blocks },
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_failed_blocks_sink_selection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed.txt");

        failed_blocks_sink(None).await.unwrap();
        failed_blocks_sink(Some(Path::new(""))).await.unwrap();
        assert!(!path.exists());

        failed_blocks_sink(Some(path.as_path())).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_pump_config_from_settings() {
        let settings = PumpSettings {
            workers: 8,
            pin_timeout_secs: 5,
            ..Default::default()
        };
        let config = pump_config(&settings);
        assert_eq!(config.workers, 8);
        assert_eq!(config.pin_timeout, Duration::from_secs(5));
    }
}
