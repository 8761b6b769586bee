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

//! Subscriber installation.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize tracing with the given format and optional level
///
/// ```ignore
/// use blockpump_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("debug"))?;
/// tracing::info!("pump starting");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Install a global subscriber built from `config`
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let layer = build_layer(&config)?;
    Registry::default()
        .with(layer)
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

fn build_layer(config: &LogConfig) -> Result<BoxedLayer, LogError> {
    let filter = build_env_filter(config)?;
    let writer = match config.output {
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
    };
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(config.include_targets)
        .with_ansi(config.use_color && config.format != LogFormat::Json);

    let layer = match (config.format, config.use_timestamps) {
        (LogFormat::Pretty, true) => base.pretty().with_filter(filter).boxed(),
        (LogFormat::Pretty, false) => base.pretty().without_time().with_filter(filter).boxed(),
        (LogFormat::Compact, true) => base.compact().with_filter(filter).boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().with_filter(filter).boxed(),
        (LogFormat::Json, true) => base.json().flatten_event(true).with_filter(filter).boxed(),
        (LogFormat::Json, false) => base
            .json()
            .flatten_event(true)
            .without_time()
            .with_filter(filter)
            .boxed(),
    };
    Ok(layer)
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let filter = config.effective_level();
    EnvFilter::try_new(&filter).map_err(|e| LogError::InvalidFilter {
        filter,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installing the global subscriber is left to the binary; only the
    // construction paths are exercised here.

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(&LogConfig::new().with_level("debug")).is_ok());
        assert!(build_env_filter(&LogConfig::new().with_level("blockpump_core=trace,info")).is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let result = build_env_filter(&LogConfig::new().with_level("blockpump=loud"));
        assert!(matches!(result, Err(LogError::InvalidFilter { .. })));
    }

    #[test]
    fn test_every_format_builds() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            for timestamps in [true, false] {
                let config = LogConfig::new()
                    .with_format(format)
                    .with_level("info")
                    .with_timestamps(timestamps);
                assert!(build_layer(&config).is_ok());
            }
        }
    }
}
