//! Batch ingestion pipeline
//!
//! This module drives the two-phase ingestion of records into repository
//! objects: a preprocess pass that drains a source and builds drafts, and a
//! commit pass that finalizes labels and datastreams on the store.
//!
//! # Example Usage
//!
//! ```no_run
//! use repobatch::document::TransformRegistry;
//! use repobatch::ingest::{
//!     BatchContext, BatchPipelineBuilder, DelimitedSource, ItemFactory,
//! };
//! use repobatch::repository::MemoryRepository;
//! use repobatch::types::{ContentModel, Namespace, Pid};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = ItemFactory::new(
//!     vec![ContentModel::new("model:generic")],
//!     Namespace::new("ir"),
//!     Arc::new(TransformRegistry::with_builtins()),
//!     "simplify",
//! );
//! let source = DelimitedSource::open("records.xml", factory)?;
//!
//! let repo = Arc::new(MemoryRepository::new());
//! let mut pipeline =
//!     BatchPipelineBuilder::new(Box::new(source), repo, Pid::from("collection:root")).build();
//!
//! let mut ctx = BatchContext::new(0);
//! let report = pipeline.run(&mut ctx)?;
//! println!("Committed {} objects", report.committed);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           BatchPipeline                             │
//! │            (preprocess -> commit, checkpointed progress)            │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          ItemSource Trait                           │
//! │                 fn extract_one() -> Option<ImportItem>              │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │                                          │
//!          ▼                                          ▼
//! ┌─────────────────────┐                  ┌─────────────────────┐
//! │   DelimitedSource   │                  │   DirectorySource   │
//! │  (one XML listing)  │                  │  (one file per item)│
//! └─────────────────────┘                  └─────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │     NamespaceResolver -> IdentifierAllocator -> Draft wiring        │
//! │           then: title + transform -> datastream assembly            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod delimited;
pub mod directory;
pub mod item;
pub mod pipeline;
pub mod progress;
pub mod source;

// Re-export main types
pub use delimited::DelimitedSource;
pub use directory::DirectorySource;
pub use item::{ImportItem, ItemFactory, ItemVariant, XmlRecordVariant};
pub use pipeline::{BatchPipeline, BatchPipelineBuilder, PipelineReport};
pub use progress::IngestProgress;
pub use source::{
    default_checkpoint_path, BatchContext, IngestError, IngestStats, ItemSource, SourceFormat,
};
