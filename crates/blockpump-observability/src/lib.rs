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

//! Structured logging for blockpump.
//!
//! Wraps `tracing-subscriber` setup behind a small builder so every binary gets the
//! same three output formats and `RUST_LOG` handling.
//!
//! ```ignore
//! use blockpump_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty, None)?;
//! tracing::info!(workers = 4, "pump starting");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
