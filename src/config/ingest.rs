//! Ingestion run configuration

use crate::datastream::ControlGroup;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a batch ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Parent container every preprocessed draft becomes a member of
    #[serde(default = "default_parent_id")]
    pub parent_id: String,
    /// Namespace items draw identifiers from when no policy overrides it
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
    /// Content-model tags applied to extracted records
    #[serde(default = "default_content_models")]
    pub content_models: Vec<String>,
    /// Named transform producing the derived document
    #[serde(default = "default_transform_ref")]
    pub transform_ref: String,
    /// Storage mode for attached datastreams
    #[serde(default)]
    pub control_group: ControlGroup,
    /// Run commit synchronously after preprocess; off defers it to a later,
    /// externally-triggered pass
    #[serde(default = "default_commit_immediately")]
    pub commit_immediately: bool,
    /// Where to persist the batch context; None disables checkpointing
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
}

fn default_parent_id() -> String {
    "collection:root".to_string()
}

fn default_namespace() -> String {
    "ir".to_string()
}

fn default_content_models() -> Vec<String> {
    vec!["model:generic".to_string()]
}

fn default_transform_ref() -> String {
    "simplify".to_string()
}

fn default_commit_immediately() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parent_id: default_parent_id(),
            default_namespace: default_namespace(),
            content_models: default_content_models(),
            transform_ref: default_transform_ref(),
            control_group: ControlGroup::default(),
            commit_immediately: default_commit_immediately(),
            checkpoint_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.parent_id, "collection:root");
        assert_eq!(config.default_namespace, "ir");
        assert!(config.commit_immediately);
        assert_eq!(config.control_group, ControlGroup::Managed);
    }
}
