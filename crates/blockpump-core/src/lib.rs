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

//! Block migration pipeline
//!
//! `blockpump-core` moves content-addressed blocks from one store to another. A run is made
//! of three stages:
//!
//! - an [`Enumerator`] lists the keys to migrate (a key file, a datastore listing, a node's
//!   pin set)
//! - a [`Collector`] fetches the payload behind each key
//! - a [`Drain`] writes, pins or verifies each block at the destination
//!
//! [`Pump`] wires the three together with a configurable number of parallel worker units
//! and keeps going when single blocks fail: their keys go to a [`FailedBlocksWriter`] in the
//! same one-key-per-line format [`FileEnumerator`] reads, so a later run can retry them.
//!
//! # Identifiers
//!
//! Flat datastores file blocks under the base32 form of their multihash. Drains that talk to
//! CID-aware destinations rebuild the CID from the key (see [`cid`]) and refuse any block
//! whose destination-side codec, hash function or digest length differs from the source.
//!
//! # Examples
//!
//! ```no_run
//! use blockpump_core::{factory, Pump};
//! use blockpump_config::{CollectorConfig, DrainConfig, EnumeratorConfig, StoreConfig};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = StoreConfig::Flatfs { path: PathBuf::from("/var/lib/node/blocks") };
//!     let enumerator = factory::build_enumerator(&EnumeratorConfig::Datastore {
//!         store: source.clone(),
//!         prefix: None,
//!     })
//!     .await?;
//!     let collector =
//!         factory::build_collector(&CollectorConfig::Datastore { store: source }).await?;
//!     let config = blockpump_core::PumpConfig::new(8);
//!     let drain = factory::build_drain(
//!         &DrainConfig::Api { url: "http://127.0.0.1:5001".into() },
//!         &config,
//!     )
//!     .await?;
//!
//!     let report = Pump::new(enumerator, collector, drain, config).run().await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod block;
pub mod cid;
pub mod collect;
pub mod drain;
pub mod enumerate;
pub mod error;
pub mod factory;
pub mod failed;
pub mod key;
pub mod progress;
pub mod pump;

pub use api::NodeApi;
pub use block::{Block, BlockInfo, FailedBlock, Resolved, TotalCount};
pub use crate::cid::CidPrefix;
pub use collect::{
    ApiCollector, Collector, DatastoreCollector, PassThroughCollector, PinIndexCollector,
};
pub use drain::{
    ApiDrain, DatastoreDrain, Drain, FailDrain, FlatFsDrain, PinDrain, VerifyingDrain,
};
pub use enumerate::{ApiPinEnumerator, DatastoreEnumerator, Enumerator, FileEnumerator};
pub use error::{PumpError, PumpResult};
pub use failed::{FailedBlocksWriter, FileFailedBlocks, MemoryFailedBlocks, NullFailedBlocks};
pub use key::Key;
pub use progress::{CountingProgress, ProgressWriter};
pub use pump::{Pump, PumpConfig, PumpReport};
