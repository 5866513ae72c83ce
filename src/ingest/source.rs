//! Core types and traits for the ingestion pipeline

use super::item::ImportItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Trait for record sources that can be drained one item at a time
///
/// `extract_one` must return the next logical record and mutate the source so
/// the same record is never returned again, or `None` when the source is
/// exhausted. The pipeline calls it exactly `count()` attempts per run;
/// `count()` is read once before the loop starts.
pub trait ItemSource: Send {
    /// Total number of records the source reports, read once before extraction
    fn count(&self) -> usize;

    /// Extract the next record, advancing the source
    fn extract_one(&mut self) -> Result<Option<ImportItem>, IngestError>;

    /// Discard the next `count` records without building items, so a resumed
    /// run lines a freshly opened source up with its checkpoint.
    ///
    /// A record that fails to extract still counts as discarded; it consumed
    /// one attempt in the run that wrote the checkpoint. Sources with cheaper
    /// positioning should override the extract-and-drop default.
    fn skip(&mut self, count: usize) -> Result<(), IngestError> {
        for _ in 0..count {
            if let Err(e) = self.extract_one() {
                warn!("Record discarded while skipping ahead: {}", e);
            }
        }
        Ok(())
    }

    /// Get the source name for display
    fn source_name(&self) -> &str;
}

/// Progress counters persisted across possibly-multiple pipeline invocations
///
/// Saved after each completed item, never mid-item, so an external driver can
/// stop invoking the pipeline between items without corrupting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchContext {
    /// Items already processed in this run
    pub progress: usize,
    /// Total items the run will attempt
    pub max: usize,
    /// Timestamp of the last checkpoint
    pub updated: DateTime<Utc>,
}

impl BatchContext {
    /// Create a fresh context for a run of `max` items
    pub fn new(max: usize) -> Self {
        Self {
            progress: 0,
            max,
            updated: Utc::now(),
        }
    }

    /// Extraction attempts still owed by this run
    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.progress)
    }

    /// Record one completed item
    pub fn advance(&mut self) {
        self.progress += 1;
        self.updated = Utc::now();
    }

    /// Save checkpoint to file
    pub fn save(&self, path: &Path) -> Result<(), IngestError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IngestError::Checkpoint(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| IngestError::Checkpoint(e.to_string()))?;
        Ok(())
    }

    /// Load checkpoint from file
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| IngestError::Checkpoint(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| IngestError::Checkpoint(e.to_string()))
    }
}

/// Statistics for a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Extraction attempts performed
    pub items_processed: usize,
    /// Drafts built during preprocess
    pub drafts_preprocessed: usize,
    /// Drafts committed to the store
    pub drafts_committed: usize,
    /// Items or drafts that ended in an error state
    pub items_errored: usize,
    /// Extraction attempts that yielded nothing
    pub items_skipped: usize,
    /// Processing time in seconds
    pub elapsed_seconds: f64,
    /// Current items per second rate
    pub items_per_second: f64,
}

impl IngestStats {
    /// Calculate items per second
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.items_per_second = self.items_processed as f64 / self.elapsed_seconds;
        }
    }
}

/// Errors that can occur during ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("invalid source format: {0}")]
    InvalidFormat(String),

    #[error("collection policy error: {0}")]
    Policy(String),

    #[error("identifier allocation failed: {0}")]
    PidAllocation(String),

    #[error("store rejected operation: {0}")]
    StoreRejected(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("transform error: {0}")]
    Transform(String),
}

impl From<quick_xml::Error> for IngestError {
    fn from(e: quick_xml::Error) -> Self {
        IngestError::XmlParse(e.to_string())
    }
}

/// Source format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Single XML file holding a list of `<record>` elements
    DelimitedXml,
    /// Directory of standalone XML record files
    Directory,
}

impl SourceFormat {
    /// Detect format from a filesystem path
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(SourceFormat::Directory);
        }
        let name = path.file_name()?.to_str()?.to_lowercase();
        if name.ends_with(".xml") {
            Some(SourceFormat::DelimitedXml)
        } else {
            None
        }
    }
}

/// Checkpoint path helper: sibling file next to the source
pub fn default_checkpoint_path(source: &Path) -> PathBuf {
    let mut name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "batch".to_string());
    name.push_str(".checkpoint.json");
    source.with_file_name(name)
}
