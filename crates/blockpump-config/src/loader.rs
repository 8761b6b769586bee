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
use crate::schema::PumpSettings;
use crate::validation::Validator;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    ///
    /// Used when command-line flags still have to be layered on top before the
    /// result is checked.
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<PumpSettings> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        let format = ConfigFormat::from_path(path)?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<PumpSettings> {
        let settings: PumpSettings = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        debug!("Configuration loaded from {}", format.name());

        if self.validate {
            settings.validate()?;
        }

        Ok(settings)
    }

    /// Load configuration with environment variable overrides
    ///
    /// Without a path the defaults are used as the base document.
    pub async fn load_with_overrides(&self, path: Option<&Path>) -> ConfigResult<PumpSettings> {
        let mut settings = match path {
            Some(path) => {
                ConfigLoader::without_validation()
                    .load_file(path)
                    .await?
            }
            None => PumpSettings::default(),
        };
        self.apply_env_overrides(&mut settings)?;

        if self.validate {
            settings.validate()?;
        }
        Ok(settings)
    }

    /// Apply `BLOCKPUMP_*` environment variable overrides
    pub fn apply_env_overrides(&self, settings: &mut PumpSettings) -> ConfigResult<()> {
        self.apply_overrides_from(settings, |name| std::env::var(name).ok())
    }

    fn apply_overrides_from<F>(&self, settings: &mut PumpSettings, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BLOCKPUMP_WORKERS") {
            settings.workers = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(
                    "BLOCKPUMP_WORKERS",
                    &value,
                    "expected positive integer",
                )
            })?;
        }
        if let Some(value) = lookup("BLOCKPUMP_FAILED_BLOCKS_PATH") {
            settings.failed_blocks_path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        if let Some(value) = lookup("BLOCKPUMP_PIN_TIMEOUT_SECS") {
            settings.pin_timeout_secs = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(
                    "BLOCKPUMP_PIN_TIMEOUT_SECS",
                    &value,
                    "expected number of seconds",
                )
            })?;
        }
        if let Some(value) = lookup("BLOCKPUMP_LOG_LEVEL") {
            settings.logging.level = value;
        }
        if let Some(value) = lookup("BLOCKPUMP_LOG_FORMAT") {
            settings.logging.format = value;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("pump.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("pump.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("pump.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("pump.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(ConfigFormat::from_path("pump.xml").is_err());
        assert!(ConfigFormat::from_path("pump").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
        workers = 8
        failed_blocks_path = "failed.txt"

        [enumerator]
        type = "blocks"

        [enumerator.store]
        backend = "flatfs"
        path = "/srv/ipfs/blocks"

        [collector]
        type = "datastore"

        [collector.store]
        backend = "flatfs"
        path = "/srv/ipfs/blocks"

        [drain]
        type = "api"
        url = "http://127.0.0.1:5001"
        "#;
        let settings = ConfigLoader::new()
            .load_from_string(toml, ConfigFormat::Toml)
            .unwrap();

        assert_eq!(settings.workers, 8);
        assert_eq!(settings.failed_blocks_path, Some(PathBuf::from("failed.txt")));
        assert_eq!(settings.pin_timeout_secs, DEFAULT_PIN_TIMEOUT_SECS);
        assert_eq!(
            settings.enumerator,
            Some(EnumeratorConfig::Blocks {
                store: StoreConfig::Flatfs {
                    path: PathBuf::from("/srv/ipfs/blocks"),
                },
            })
        );
        assert_eq!(settings.drain.map(|d| d.kind()), Some("api"));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"workers: 4
enumerator:
  type: api_pin
  url: http://127.0.0.1:5001
  stream: true
drain:
  type: datastore
  store:
    backend: s3
    bucket: blocks
    region: eu-west-1"#;
        let settings = ConfigLoader::new()
            .load_from_string(yaml, ConfigFormat::Yaml)
            .unwrap();

        assert_eq!(
            settings.enumerator,
            Some(EnumeratorConfig::ApiPin {
                url: "http://127.0.0.1:5001".to_string(),
                stream: true,
            })
        );
        match settings.drain {
            Some(DrainConfig::Datastore {
                store: StoreConfig::S3(s3),
            }) => {
                assert_eq!(s3.bucket, "blocks");
                assert_eq!(s3.region, "eu-west-1");
                assert!(s3.endpoint.is_none());
            }
            other => panic!("unexpected drain: {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_unit_variants() {
        let json = r#"{"drain": {"type": "fail"}, "collector": {"type": "datastore", "store": {"backend": "memory"}}}"#;
        let settings = ConfigLoader::new()
            .load_from_string(json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(settings.drain, Some(DrainConfig::Fail));
        assert_eq!(
            settings.collector,
            Some(CollectorConfig::Datastore {
                store: StoreConfig::Memory
            })
        );
    }

    #[test]
    fn test_validation_applies() {
        let json = r#"{"workers": 0}"#;
        assert!(ConfigLoader::new()
            .load_from_string(json, ConfigFormat::Json)
            .is_err());
        assert!(ConfigLoader::without_validation()
            .load_from_string(json, ConfigFormat::Json)
            .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BLOCKPUMP_WORKERS", "12"),
            ("BLOCKPUMP_FAILED_BLOCKS_PATH", "/tmp/failed"),
            ("BLOCKPUMP_PIN_TIMEOUT_SECS", "5"),
            ("BLOCKPUMP_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut settings = PumpSettings::default();
        ConfigLoader::new()
            .apply_overrides_from(&mut settings, |name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.workers, 12);
        assert_eq!(settings.failed_blocks_path, Some(PathBuf::from("/tmp/failed")));
        assert_eq!(settings.pin_timeout_secs, 5);
        assert_eq!(settings.logging.format, "json");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_env_override_parse_error() {
        let mut settings = PumpSettings::default();
        let result = ConfigLoader::new().apply_overrides_from(&mut settings, |name| {
            (name == "BLOCKPUMP_WORKERS").then(|| "many".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::EnvVarParsingError { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pump.toml");
        tokio::fs::write(&path, "workers = 3\npin_timeout_secs = 30\n")
            .await
            .unwrap();

        let settings = ConfigLoader::new().load_file(&path).await.unwrap();
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.pin_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = ConfigLoader::new()
            .load_file("/nonexistent/pump.toml")
            .await;
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
