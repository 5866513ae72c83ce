//! Configuration for repobatch

mod ingest;
mod logging;

pub use ingest::IngestConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for a repobatch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ingestion run configuration
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.ingest.default_namespace.is_empty() {
            errors.push("default_namespace must not be empty".to_string());
        }
        if self.ingest.default_namespace.contains(':') {
            errors.push("default_namespace must not contain ':'".to_string());
        }
        if !self.ingest.parent_id.contains(':') {
            errors.push("parent_id must be a full identifier (namespace:serial)".to_string());
        }
        if self.ingest.content_models.is_empty() {
            errors.push("at least one content model is required".to_string());
        }
        if self.ingest.transform_ref.is_empty() {
            errors.push("transform_ref must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Invalid configuration:\n  - {}",
                errors.join("\n  - ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[ingest]
parent_id = "collection:theses"
default_namespace = "thesis"

[logging]
level = "debug"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ingest.parent_id, "collection:theses");
        assert_eq!(config.ingest.default_namespace, "thesis");
        assert_eq!(config.logging.level, LogLevel::Debug);
        // Unspecified fields keep their defaults
        assert!(config.ingest.commit_immediately);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = Config {
            ingest: IngestConfig {
                parent_id: "noseparator".to_string(),
                default_namespace: "bad:ns".to_string(),
                content_models: Vec::new(),
                ..IngestConfig::default()
            },
            ..Config::default()
        };

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("parent_id"));
        assert!(err.contains("':'"));
        assert!(err.contains("content model"));
    }
}
