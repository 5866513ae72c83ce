//! repobatch: batch ingestion of records into repository objects
//!
//! A two-phase ingestion pipeline that drains records from a mutable source
//! and materializes each as a repository object, featuring:
//! - Pluggable record sources (delimited XML lists, directory listings)
//! - Lazily generated, memoized primary and derived documents (XML transform)
//! - Namespace resolution from parent-container collection policies
//! - Amortized, pooled persistent-identifier allocation
//! - Preprocess/commit state machine with per-item error isolation
//! - Resumable runs via checkpointed batch context

pub mod config;
pub mod datastream;
pub mod document;
pub mod draft;
pub mod ingest;
pub mod pid;
pub mod repository;
pub mod types;

pub use config::Config;
pub use types::*;
