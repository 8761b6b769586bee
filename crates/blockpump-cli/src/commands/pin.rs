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

//! `blockpump pin`: pin the CIDs named by pin reverse-index keys

use super::Pipeline;
use crate::output;
use anyhow::{Context, Result};
use blockpump_config::{DEFAULT_PIN_TIMEOUT_SECS, DEFAULT_WORKERS};
use blockpump_core::{FileEnumerator, NodeApi, PassThroughCollector, PinDrain, PumpConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Pin every CID listed in a file of pin reverse-index keys
///
/// Each line is a datastore key shaped `/pins/index/cidRindex/<cid>/<tag>`. The CID is pinned
/// non-recursively on the node; no block data is transferred.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    blockpump pin --pins-keys pin-keys.txt --api http://127.0.0.1:5001 --worker 8")]
pub struct PinCmd {
    /// File of pin reverse-index keys, one per line
    #[arg(long, value_name = "FILE")]
    pub pins_keys: PathBuf,

    /// Node API receiving the pins
    #[arg(long, value_name = "URL")]
    pub api: String,

    /// Number of parallel pin units
    #[arg(long, value_name = "N", default_value_t = DEFAULT_WORKERS)]
    pub worker: usize,

    /// File receiving the keys that could not be pinned
    #[arg(long, value_name = "PATH")]
    pub failed_blocks_path: Option<PathBuf>,

    /// Timeout of each pin call, in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_PIN_TIMEOUT_SECS)]
    pub pin_timeout_secs: u64,
}

impl PinCmd {
    pub async fn execute(&self, quiet: bool) -> Result<()> {
        let config = PumpConfig::new(self.worker)
            .with_pin_timeout(Duration::from_secs(self.pin_timeout_secs));
        config.validate()?;

        let enumerator = FileEnumerator::open(&self.pins_keys)
            .await
            .with_context(|| format!("Cannot read {}", self.pins_keys.display()))?;
        let api = NodeApi::new(&self.api)?;
        let version = api.version().await?;

        if !quiet {
            output::header(&format!("Pinning keys from {}", self.pins_keys.display()));
            output::detail("Node", &format!("{} ({})", api.base_url(), version.version));
            output::detail("Workers", &config.workers.to_string());
        }

        let pipeline = Pipeline {
            enumerator: Arc::new(enumerator),
            collector: Arc::new(PassThroughCollector::pin_index()),
            drain: Arc::new(PinDrain::new(api).with_timeout(config.pin_timeout)),
            config,
        };
        pipeline
            .execute("Pinning", self.failed_blocks_path.as_deref(), quiet)
            .await?;
        Ok(())
    }
}
