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

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Configuration validation trait
pub trait Validator {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for PumpSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::invalid_value(
                "workers",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_WORKERS, self.workers
                ),
            ));
        }

        if self.pin_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "pin_timeout_secs",
                "must be greater than 0",
            ));
        }

        if let Some(path) = &self.failed_blocks_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid_value(
                    "failed_blocks_path",
                    "cannot be empty when set",
                ));
            }
        }

        self.logging.validate()?;

        if let Some(enumerator) = &self.enumerator {
            enumerator.validate()?;
        }
        if let Some(collector) = &self.collector {
            collector.validate()?;
        }
        if let Some(drain) = &self.drain {
            drain.validate()?;
        }
        Ok(())
    }
}

impl Validator for LoggingSettings {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }
        Ok(())
    }
}

impl Validator for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            StoreConfig::Flatfs { path } | StoreConfig::Dir { path } => {
                require_path("store.path", path)
            }
            StoreConfig::Memory => Ok(()),
            StoreConfig::S3(s3) => s3.validate(),
        }
    }
}

impl Validator for S3Store {
    fn validate(&self) -> ConfigResult<()> {
        if self.bucket.is_empty() {
            return Err(ConfigError::missing("store.bucket"));
        }
        if self.region.is_empty() {
            return Err(ConfigError::missing("store.region"));
        }
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(ConfigError::validation_error(
                "store.access_key and store.secret_key must be set together",
            ));
        }
        Ok(())
    }
}

impl Validator for EnumeratorConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            EnumeratorConfig::File { path } => require_path("enumerator.path", path),
            EnumeratorConfig::Datastore { store, .. }
            | EnumeratorConfig::Blocks { store }
            | EnumeratorConfig::PinIndex { store } => store.validate(),
            EnumeratorConfig::ApiPin { url, .. } => require_url("enumerator.url", url),
        }
    }
}

impl Validator for CollectorConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            CollectorConfig::Api { url } => require_url("collector.url", url),
            CollectorConfig::Datastore { store } | CollectorConfig::PinIndex { store } => {
                store.validate()
            }
        }
    }
}

impl Validator for DrainConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            DrainConfig::Api { url } | DrainConfig::Pin { url } => require_url("drain.url", url),
            DrainConfig::Datastore { store } | DrainConfig::Verify { store, .. } => {
                store.validate()
            }
            DrainConfig::Flatfs { path } => require_path("drain.path", path),
            DrainConfig::Fail => Ok(()),
        }
    }
}

fn require_path(field: &str, path: &std::path::Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::missing(field));
    }
    Ok(())
}

fn require_url(field: &str, url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing(field));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::invalid_value(
            field,
            format!("must be an http(s) URL, got {}", url),
        ));
    }
    Ok(())
}
