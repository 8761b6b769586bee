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

//! `blockpump run`: generic enumerator → collector → drain migration

use super::Pipeline;
use crate::output;
use anyhow::{anyhow, Context, Result};
use blockpump_config::{
    CollectorConfig, ConfigLoader, DrainConfig, EnumeratorConfig, PumpSettings, S3Store,
    StoreConfig, Validator,
};
use blockpump_core::factory;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnumeratorKind {
    /// Key file, one key per line
    File,
    /// Recursive pins of a node
    Apipin,
    /// Every key of a flat-file block store
    Flatfs,
    /// Block keys of a repository datastore
    Blocks,
    /// Pin reverse-index keys of a repository datastore
    Pinindex,
    /// Every object of an S3 bucket
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectorKind {
    /// Node HTTP API
    Api,
    /// Flat-file block store
    Flatfs,
    /// Repository datastore holding pin reverse-index keys
    Pinindex,
    /// S3 bucket
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DrainKind {
    /// Node HTTP API block/put
    Api,
    /// Flat-file block store
    Flatfs,
    /// Node HTTP API pin/add
    Pin,
    /// Repository datastore, same keys
    Datastore,
    /// Repository datastore with read-back CID verification
    Verify,
    /// S3 bucket
    S3,
    /// Record every key in the failed-blocks file
    Col,
}

/// S3 location flags, one set per stage
#[derive(Debug, Clone, Copy, Default)]
struct S3Flags<'a> {
    bucket: Option<&'a str>,
    region: Option<&'a str>,
    endpoint: Option<&'a str>,
    access_key: Option<&'a str>,
    secret_key: Option<&'a str>,
    session_token: Option<&'a str>,
}

/// Move blocks from a source into a destination
///
/// Stages come from the positional names, or from the `--config` file when omitted. Each
/// stage needs the flags of its kind; a missing one aborts before anything is copied.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Copy a flat-file block store into a node
    blockpump run flatfs flatfs api \\
        --enum-flatfs-path ~/.ipfs/blocks --coll-flatfs-path ~/.ipfs/blocks \\
        --drain-api-url http://127.0.0.1:5001 --worker 16 --failed-blocks-path failed.txt

    # Retry the failures of a previous run
    blockpump run file flatfs api --enum-file-path failed.txt \\
        --coll-flatfs-path ~/.ipfs/blocks --drain-api-url http://127.0.0.1:5001

    # Dump every key of a bucket into a file
    blockpump run s3 s3 col --enum-s3-bucket blocks --enum-s3-region us-east-1 \\
        --coll-s3-bucket blocks --coll-s3-region us-east-1 --failed-blocks-path keys.txt")]
pub struct RunCmd {
    /// Key source
    #[arg(value_enum)]
    pub enumerator: Option<EnumeratorKind>,

    /// Payload source
    #[arg(value_enum)]
    pub collector: Option<CollectorKind>,

    /// Destination
    #[arg(value_enum)]
    pub drain: Option<DrainKind>,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of parallel collector/drain units
    #[arg(long, value_name = "N")]
    pub worker: Option<usize>,

    /// File receiving the keys of failed blocks
    #[arg(long, value_name = "PATH")]
    pub failed_blocks_path: Option<PathBuf>,

    /// Timeout of each pin call, in seconds
    #[arg(long, value_name = "SECS")]
    pub pin_timeout_secs: Option<u64>,

    /// Key file for the file enumerator
    #[arg(long, value_name = "PATH")]
    pub enum_file_path: Option<PathBuf>,

    /// Flat-file store for the flatfs enumerator
    #[arg(long, value_name = "PATH")]
    pub enum_flatfs_path: Option<PathBuf>,

    /// Repository datastore for the blocks and pinindex enumerators
    #[arg(long, value_name = "PATH")]
    pub enum_repo_path: Option<PathBuf>,

    /// Node API for the apipin enumerator
    #[arg(long, value_name = "URL")]
    pub enum_api_pin_url: Option<String>,

    /// Use the streaming pin listing
    #[arg(long)]
    pub enum_api_pin_stream: bool,

    #[arg(long, value_name = "BUCKET")]
    pub enum_s3_bucket: Option<String>,

    #[arg(long, value_name = "REGION")]
    pub enum_s3_region: Option<String>,

    #[arg(long, value_name = "URL")]
    pub enum_s3_endpoint: Option<String>,

    /// Static access key for the enumerator bucket (default: AWS credential chain)
    #[arg(long, value_name = "KEY")]
    pub enum_s3_access_key: Option<String>,

    #[arg(long, value_name = "SECRET")]
    pub enum_s3_secret_key: Option<String>,

    #[arg(long, value_name = "TOKEN")]
    pub enum_s3_session_token: Option<String>,

    /// Node API for the api collector
    #[arg(long, value_name = "URL")]
    pub coll_api_url: Option<String>,

    /// Flat-file store for the flatfs collector
    #[arg(long, value_name = "PATH")]
    pub coll_flatfs_path: Option<PathBuf>,

    /// Repository datastore for the pinindex collector
    #[arg(long, value_name = "PATH")]
    pub coll_repo_path: Option<PathBuf>,

    #[arg(long, value_name = "BUCKET")]
    pub coll_s3_bucket: Option<String>,

    #[arg(long, value_name = "REGION")]
    pub coll_s3_region: Option<String>,

    #[arg(long, value_name = "URL")]
    pub coll_s3_endpoint: Option<String>,

    /// Static access key for the collector bucket (default: AWS credential chain)
    #[arg(long, value_name = "KEY")]
    pub coll_s3_access_key: Option<String>,

    #[arg(long, value_name = "SECRET")]
    pub coll_s3_secret_key: Option<String>,

    #[arg(long, value_name = "TOKEN")]
    pub coll_s3_session_token: Option<String>,

    /// Node API for the api drain
    #[arg(long, value_name = "URL")]
    pub drain_api_url: Option<String>,

    /// Flat-file store for the flatfs drain
    #[arg(long, value_name = "PATH")]
    pub drain_flatfs_path: Option<PathBuf>,

    /// Repository datastore for the datastore and verify drains
    #[arg(long, value_name = "PATH")]
    pub drain_repo_path: Option<PathBuf>,

    /// Multicodec the verify drain assumes for bare-digest keys (default dag-pb)
    #[arg(long, value_name = "CODE", value_parser = parse_codec)]
    pub drain_codec: Option<u64>,

    /// Node API for the pin drain
    #[arg(long, value_name = "URL")]
    pub drain_pin_url: Option<String>,

    #[arg(long, value_name = "BUCKET")]
    pub drain_s3_bucket: Option<String>,

    #[arg(long, value_name = "REGION")]
    pub drain_s3_region: Option<String>,

    #[arg(long, value_name = "URL")]
    pub drain_s3_endpoint: Option<String>,

    /// Static access key for the drain bucket (default: AWS credential chain)
    #[arg(long, value_name = "KEY")]
    pub drain_s3_access_key: Option<String>,

    #[arg(long, value_name = "SECRET")]
    pub drain_s3_secret_key: Option<String>,

    #[arg(long, value_name = "TOKEN")]
    pub drain_s3_session_token: Option<String>,
}

fn parse_codec(raw: &str) -> Result<u64, String> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|e| format!("invalid multicodec '{}': {}", raw, e))
}

fn require<T: Clone>(value: &Option<T>, flag: &str, stage: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| anyhow!("{} is required for the {}", flag, stage))
}

fn s3_store(flags: S3Flags<'_>, prefix: &str, stage: &str) -> Result<StoreConfig> {
    let bucket = flags
        .bucket
        .ok_or_else(|| anyhow!("--{}-s3-bucket is required for the {}", prefix, stage))?;
    let region = flags
        .region
        .ok_or_else(|| anyhow!("--{}-s3-region is required for the {}", prefix, stage))?;
    Ok(StoreConfig::S3(S3Store {
        bucket: bucket.to_string(),
        region: region.to_string(),
        endpoint: flags.endpoint.map(str::to_string),
        access_key: flags.access_key.map(str::to_string),
        secret_key: flags.secret_key.map(str::to_string),
        session_token: flags.session_token.map(str::to_string),
        ..Default::default()
    }))
}

impl RunCmd {
    pub async fn execute(&self, quiet: bool) -> Result<()> {
        let settings = self.settings().await?;
        let config = factory::pump_config(&settings);

        let (enumerator, collector, drain) = match (
            &settings.enumerator,
            &settings.collector,
            &settings.drain,
        ) {
            (Some(e), Some(c), Some(d)) => (e, c, d),
            _ => {
                return Err(anyhow!(
                    "enumerator, collector and drain must be given on the command line or in --config"
                ))
            }
        };

        if !quiet {
            output::header(&format!(
                "Pumping blocks: {} → {} → {}",
                enumerator.kind(),
                collector.kind(),
                drain.kind()
            ));
            output::detail("Workers", &config.workers.to_string());
        }

        let pipeline = Pipeline {
            enumerator: factory::build_enumerator(enumerator)
                .await
                .with_context(|| format!("Cannot open {} enumerator", enumerator.kind()))?,
            collector: factory::build_collector(collector)
                .await
                .with_context(|| format!("Cannot open {} collector", collector.kind()))?,
            drain: factory::build_drain(drain, &config)
                .await
                .with_context(|| format!("Cannot open {} drain", drain.kind()))?,
            config,
        };

        pipeline
            .execute("Pumping", settings.failed_blocks_path.as_deref(), quiet)
            .await?;
        Ok(())
    }

    /// Configuration file and environment, overridden by command-line flags
    async fn settings(&self) -> Result<PumpSettings> {
        let mut settings = ConfigLoader::without_validation()
            .load_with_overrides(self.config.as_deref())
            .await
            .context("Cannot load configuration")?;

        if let Some(workers) = self.worker {
            settings.workers = workers;
        }
        if let Some(path) = &self.failed_blocks_path {
            settings.failed_blocks_path = Some(path.clone());
        }
        if let Some(secs) = self.pin_timeout_secs {
            settings.pin_timeout_secs = secs;
        }
        if let Some(kind) = self.enumerator {
            settings.enumerator = Some(self.enumerator_config(kind)?);
        }
        if let Some(kind) = self.collector {
            settings.collector = Some(self.collector_config(kind)?);
        }
        if let Some(kind) = self.drain {
            settings.drain = Some(self.drain_config(kind)?);
        }

        settings.validate().context("Invalid configuration")?;
        Ok(settings)
    }

    fn enumerator_config(&self, kind: EnumeratorKind) -> Result<EnumeratorConfig> {
        const STAGE: &str = "enumerator";
        Ok(match kind {
            EnumeratorKind::File => EnumeratorConfig::File {
                path: require(&self.enum_file_path, "--enum-file-path", STAGE)?,
            },
            EnumeratorKind::Apipin => EnumeratorConfig::ApiPin {
                url: require(&self.enum_api_pin_url, "--enum-api-pin-url", STAGE)?,
                stream: self.enum_api_pin_stream,
            },
            EnumeratorKind::Flatfs => EnumeratorConfig::Datastore {
                store: StoreConfig::Flatfs {
                    path: require(&self.enum_flatfs_path, "--enum-flatfs-path", STAGE)?,
                },
                prefix: None,
            },
            EnumeratorKind::Blocks => EnumeratorConfig::Blocks {
                store: StoreConfig::Dir {
                    path: require(&self.enum_repo_path, "--enum-repo-path", STAGE)?,
                },
            },
            EnumeratorKind::Pinindex => EnumeratorConfig::PinIndex {
                store: StoreConfig::Dir {
                    path: require(&self.enum_repo_path, "--enum-repo-path", STAGE)?,
                },
            },
            EnumeratorKind::S3 => EnumeratorConfig::Datastore {
                store: s3_store(
                    S3Flags {
                        bucket: self.enum_s3_bucket.as_deref(),
                        region: self.enum_s3_region.as_deref(),
                        endpoint: self.enum_s3_endpoint.as_deref(),
                        access_key: self.enum_s3_access_key.as_deref(),
                        secret_key: self.enum_s3_secret_key.as_deref(),
                        session_token: self.enum_s3_session_token.as_deref(),
                    },
                    "enum",
                    STAGE,
                )?,
                prefix: None,
            },
        })
    }

    fn collector_config(&self, kind: CollectorKind) -> Result<CollectorConfig> {
        const STAGE: &str = "collector";
        Ok(match kind {
            CollectorKind::Api => CollectorConfig::Api {
                url: require(&self.coll_api_url, "--coll-api-url", STAGE)?,
            },
            CollectorKind::Flatfs => CollectorConfig::Datastore {
                store: StoreConfig::Flatfs {
                    path: require(&self.coll_flatfs_path, "--coll-flatfs-path", STAGE)?,
                },
            },
            CollectorKind::Pinindex => CollectorConfig::PinIndex {
                store: StoreConfig::Dir {
                    path: require(&self.coll_repo_path, "--coll-repo-path", STAGE)?,
                },
            },
            CollectorKind::S3 => CollectorConfig::Datastore {
                store: s3_store(
                    S3Flags {
                        bucket: self.coll_s3_bucket.as_deref(),
                        region: self.coll_s3_region.as_deref(),
                        endpoint: self.coll_s3_endpoint.as_deref(),
                        access_key: self.coll_s3_access_key.as_deref(),
                        secret_key: self.coll_s3_secret_key.as_deref(),
                        session_token: self.coll_s3_session_token.as_deref(),
                    },
                    "coll",
                    STAGE,
                )?,
            },
        })
    }

    fn drain_config(&self, kind: DrainKind) -> Result<DrainConfig> {
        const STAGE: &str = "drain";
        Ok(match kind {
            DrainKind::Api => DrainConfig::Api {
                url: require(&self.drain_api_url, "--drain-api-url", STAGE)?,
            },
            DrainKind::Flatfs => DrainConfig::Flatfs {
                path: require(&self.drain_flatfs_path, "--drain-flatfs-path", STAGE)?,
            },
            DrainKind::Pin => DrainConfig::Pin {
                url: require(&self.drain_pin_url, "--drain-pin-url", STAGE)?,
            },
            DrainKind::Datastore => DrainConfig::Datastore {
                store: StoreConfig::Dir {
                    path: require(&self.drain_repo_path, "--drain-repo-path", STAGE)?,
                },
            },
            DrainKind::Verify => DrainConfig::Verify {
                store: StoreConfig::Dir {
                    path: require(&self.drain_repo_path, "--drain-repo-path", STAGE)?,
                },
                codec: self.drain_codec,
            },
            DrainKind::S3 => DrainConfig::Datastore {
                store: s3_store(
                    S3Flags {
                        bucket: self.drain_s3_bucket.as_deref(),
                        region: self.drain_s3_region.as_deref(),
                        endpoint: self.drain_s3_endpoint.as_deref(),
                        access_key: self.drain_s3_access_key.as_deref(),
                        secret_key: self.drain_s3_secret_key.as_deref(),
                        session_token: self.drain_s3_session_token.as_deref(),
                    },
                    "drain",
                    STAGE,
                )?,
            },
            DrainKind::Col => DrainConfig::Fail,
        })
    }
}
