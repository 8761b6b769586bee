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

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of collector/drain worker units
pub const DEFAULT_WORKERS: usize = 1;

/// Upper bound accepted for the worker count
pub const MAX_WORKERS: usize = 4096;

/// Default bound on a single remote pin call, in seconds
pub const DEFAULT_PIN_TIMEOUT_SECS: u64 = 60;

/// Main pump configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PumpSettings {
    /// Number of collector/drain worker units
    pub workers: usize,

    /// File receiving the keys of every failed block; `None` discards them
    pub failed_blocks_path: Option<PathBuf>,

    /// Bound on each remote pin call
    pub pin_timeout_secs: u64,

    /// Logging settings
    pub logging: LoggingSettings,

    /// Where keys come from
    pub enumerator: Option<EnumeratorConfig>,

    /// Where block payloads are fetched from
    pub collector: Option<CollectorConfig>,

    /// Where blocks are written to
    pub drain: Option<DrainConfig>,
}

impl Default for PumpSettings {
    fn default() -> Self {
        PumpSettings {
            workers: DEFAULT_WORKERS,
            failed_blocks_path: None,
            pin_timeout_secs: DEFAULT_PIN_TIMEOUT_SECS,
            logging: LoggingSettings::default(),
            enumerator: None,
            collector: None,
            drain: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Output format: pretty, compact, json
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Datastore backend shared by enumerators, collectors and drains
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Sharded flat-file directory
    Flatfs {
        /// Repository directory
        path: PathBuf,
    },

    /// Directory tree with one level per key segment
    Dir {
        /// Repository directory
        path: PathBuf,
    },

    /// Process-local in-memory store
    Memory,

    /// AWS S3 or compatible bucket
    S3(S3Store),
}

/// S3 datastore settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct S3Store {
    /// Bucket name
    pub bucket: String,

    /// AWS region
    pub region: String,

    /// Custom endpoint for S3-compatible services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Object key prefix inside the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<String>,

    /// Access key id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Secret access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Key source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnumeratorConfig {
    /// One key per line in a text file
    File {
        /// Key list path
        path: PathBuf,
    },

    /// Every key of a datastore, optionally below a prefix
    Datastore {
        /// Datastore to list
        store: StoreConfig,
        /// Key prefix
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },

    /// Block keys of a node repository datastore
    Blocks {
        /// Datastore to list
        store: StoreConfig,
    },

    /// Pin reverse-index keys of a node repository datastore
    PinIndex {
        /// Datastore to list
        store: StoreConfig,
    },

    /// Recursive pins listed over a node HTTP API
    ApiPin {
        /// API base URL
        url: String,
        /// Request the streaming pin listing
        #[serde(default)]
        stream: bool,
    },
}

impl EnumeratorConfig {
    /// Name used on the command line and in logs
    pub fn kind(&self) -> &'static str {
        match self {
            EnumeratorConfig::File { .. } => "file",
            EnumeratorConfig::Datastore { .. } => "datastore",
            EnumeratorConfig::Blocks { .. } => "blocks",
            EnumeratorConfig::PinIndex { .. } => "pin_index",
            EnumeratorConfig::ApiPin { .. } => "api_pin",
        }
    }
}

/// Payload source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectorConfig {
    /// Node HTTP API
    Api {
        /// API base URL
        url: String,
    },

    /// Datastore, reading each key as-is
    Datastore {
        /// Datastore to read
        store: StoreConfig,
    },

    /// Datastore holding pin reverse-index keys; blocks are re-keyed to their CID
    PinIndex {
        /// Datastore to read
        store: StoreConfig,
    },
}

impl CollectorConfig {
    /// Name used on the command line and in logs
    pub fn kind(&self) -> &'static str {
        match self {
            CollectorConfig::Api { .. } => "api",
            CollectorConfig::Datastore { .. } => "datastore",
            CollectorConfig::PinIndex { .. } => "pin_index",
        }
    }
}

/// Block destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrainConfig {
    /// Node HTTP API `block/put`
    Api {
        /// API base URL
        url: String,
    },

    /// Datastore, writing under the same key
    Datastore {
        /// Destination datastore
        store: StoreConfig,
    },

    /// Flat-file repository, writing under the base key segment
    Flatfs {
        /// Repository directory
        path: PathBuf,
    },

    /// Node HTTP API `pin/add`
    Pin {
        /// API base URL
        url: String,
    },

    /// Datastore write followed by read-back identifier verification
    Verify {
        /// Destination datastore
        store: StoreConfig,
        /// Multicodec assumed for bare-digest keys
        #[serde(default, skip_serializing_if = "Option::is_none")]
        codec: Option<u64>,
    },

    /// Records every block as failed
    Fail,
}

impl DrainConfig {
    /// Name used on the command line and in logs
    pub fn kind(&self) -> &'static str {
        match self {
            DrainConfig::Api { .. } => "api",
            DrainConfig::Datastore { .. } => "datastore",
            DrainConfig::Flatfs { .. } => "flatfs",
            DrainConfig::Pin { .. } => "pin",
            DrainConfig::Verify { .. } => "verify",
            DrainConfig::Fail => "fail",
        }
    }
}
