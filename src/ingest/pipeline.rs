//! Batch pipeline: the two-phase preprocess/commit state machine

use super::item::ImportItem;
use super::progress::IngestProgress;
use super::source::{BatchContext, IngestError, IngestStats, ItemSource};
use crate::datastream::{self, ControlGroup, DatastreamError};
use crate::draft::{DraftState, RepositoryObjectDraft};
use crate::pid::{IdentifierAllocator, NamespaceResolver};
use crate::repository::RepositoryClient;
use crate::types::{Pid, Relationship};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a pipeline run: counts plus the retrievable error records
#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    /// Drafts built during preprocess
    pub drafts_preprocessed: usize,
    /// Drafts that reached `Committed`
    pub committed: usize,
    /// Drafts that reached `Error`
    pub errored: usize,
    /// Items that never became drafts (extraction or allocation failures)
    pub preprocess_failures: Vec<String>,
    /// Per-draft commit failures
    pub draft_failures: Vec<(Pid, String)>,
    /// Missing-document errors recorded during datastream assembly
    pub datastream_errors: Vec<DatastreamError>,
}

impl PipelineReport {
    fn merge(&mut self, other: PipelineReport) {
        self.drafts_preprocessed += other.drafts_preprocessed;
        self.committed += other.committed;
        self.errored += other.errored;
        self.preprocess_failures.extend(other.preprocess_failures);
        self.draft_failures.extend(other.draft_failures);
        self.datastream_errors.extend(other.datastream_errors);
    }
}

/// Drives extraction, draft construction and datastream commit
///
/// Preprocess moves drafts `Pending -> Preprocessed`; commit moves them to
/// the terminal `Committed` or `Error` states. Failures are isolated per
/// item: no error category aborts the overall run.
pub struct BatchPipeline {
    source: Box<dyn ItemSource>,
    client: Arc<dyn RepositoryClient>,
    allocator: IdentifierAllocator,
    resolver: NamespaceResolver,
    parent_id: Pid,
    control_group: ControlGroup,
    commit_immediately: bool,
    checkpoint_path: Option<PathBuf>,
    quiet: bool,
    progress: Arc<IngestProgress>,
    /// Extraction attempts this instance has already made against the source
    attempted: usize,
    drafts: Vec<RepositoryObjectDraft>,
}

impl BatchPipeline {
    /// Preprocess transition: run the extraction loop and build drafts
    ///
    /// Performs exactly `ctx.remaining()` extraction attempts (a fresh
    /// context adopts the source's reported count), checkpointing `ctx`
    /// after each completed item. A resumed context first skips the records
    /// an earlier invocation already handled, so extraction picks up at the
    /// checkpoint instead of re-ingesting the head of the source. Extraction
    /// and allocation failures are recorded and the loop continues with the
    /// next item.
    pub fn preprocess(&mut self, ctx: &mut BatchContext) -> Result<PipelineReport, IngestError> {
        let total = self.source.count();
        if ctx.max == 0 {
            ctx.max = total;
        }
        info!(
            "Preprocessing '{}': {} of {} items done",
            self.source.source_name(),
            ctx.progress,
            ctx.max
        );

        if self.attempted < ctx.progress {
            let behind = ctx.progress - self.attempted;
            info!("Skipping {} already-processed records", behind);
            self.source.skip(behind)?;
            self.attempted = ctx.progress;
        }

        self.progress.set_total(ctx.max);
        let mut report = PipelineReport::default();

        for _ in 0..ctx.remaining() {
            if self.progress.is_cancelled() {
                info!("Run cancelled between items");
                break;
            }

            match self.source.extract_one() {
                Ok(Some(item)) => match self.preprocess_item(item, ctx) {
                    Ok(title) => {
                        report.drafts_preprocessed += 1;
                        self.progress.draft_preprocessed(&title);
                    }
                    Err(e) => {
                        warn!("Item skipped during preprocess: {}", e);
                        report.preprocess_failures.push(e.to_string());
                        self.progress.item_errored();
                    }
                },
                Ok(None) => {
                    // Exhaustion is not an error; the loop still runs its
                    // remaining attempts so the counters converge
                    self.progress.item_skipped();
                }
                Err(e) => {
                    warn!("Extraction failed: {}", e);
                    report.preprocess_failures.push(e.to_string());
                    self.progress.item_errored();
                }
            }

            self.attempted += 1;
            ctx.advance();
            self.checkpoint(ctx);
        }

        self.progress.finish();
        Ok(report)
    }

    /// Resolve namespace, allocate an identifier and wire a draft for one item
    fn preprocess_item(
        &mut self,
        item: ImportItem,
        ctx: &BatchContext,
    ) -> Result<String, IngestError> {
        let namespace = self.resolver.resolve(&item, &self.parent_id);
        let pid = self.allocator.allocate(&namespace, ctx)?;

        let mut draft = RepositoryObjectDraft::new(pid, self.parent_id.clone());
        draft.set_content_models(item.content_models().to_vec());
        draft.add_relationship(Relationship::is_member_of(self.parent_id.clone()));
        item.modify_relationships(&mut draft);

        let title = item.title().to_string();
        draft.adopt(item);
        self.drafts.push(draft);
        Ok(title)
    }

    /// Commit transition: finalize every preprocessed draft on the store
    ///
    /// A store rejection moves that draft alone to `Error`; sibling drafts
    /// proceed. Missing-document errors are collected, not raised.
    pub fn commit(&mut self) -> PipelineReport {
        let mut report = PipelineReport::default();

        for draft in &mut self.drafts {
            if *draft.state() != DraftState::Preprocessed {
                continue;
            }

            match commit_draft(self.client.as_ref(), self.control_group, draft) {
                Ok(mut datastream_errors) => {
                    draft.mark_committed();
                    self.progress.draft_committed();
                    report.committed += 1;
                    report.datastream_errors.append(&mut datastream_errors);
                }
                Err(e) => {
                    warn!("Commit of '{}' failed: {}", draft.pid(), e);
                    draft.mark_error(e.to_string());
                    report.errored += 1;
                    report.draft_failures.push((draft.pid().clone(), e.to_string()));
                }
            }
        }

        info!(
            "Commit pass finished: {} committed, {} errored",
            report.committed, report.errored
        );
        report
    }

    /// Run preprocess and, unless commit is deferred, the commit pass
    pub fn run(&mut self, ctx: &mut BatchContext) -> Result<PipelineReport, IngestError> {
        let mut report = self.preprocess(ctx)?;
        if self.commit_immediately {
            report.merge(self.commit());
        }
        if !self.quiet {
            self.progress.print_summary();
        }
        Ok(report)
    }

    /// Drafts recorded so far, in preprocess order
    pub fn drafts(&self) -> &[RepositoryObjectDraft] {
        &self.drafts
    }

    /// Shared progress tracker; a clone doubles as a cancellation handle
    /// for stopping the run between items
    pub fn progress(&self) -> Arc<IngestProgress> {
        Arc::clone(&self.progress)
    }

    /// Counters accumulated so far across the preprocess and commit passes
    pub fn stats(&self) -> IngestStats {
        self.progress.get_stats()
    }

    fn checkpoint(&self, ctx: &BatchContext) {
        if let Some(ref path) = self.checkpoint_path {
            if let Err(e) = ctx.save(path) {
                warn!("Failed to save checkpoint: {}", e);
            }
        }
    }
}

/// Fill label and datastreams for one draft and attach them to the store
fn commit_draft(
    client: &dyn RepositoryClient,
    control_group: ControlGroup,
    draft: &mut RepositoryObjectDraft,
) -> Result<Vec<DatastreamError>, IngestError> {
    let (label, assembly) = {
        let item = draft.item().ok_or_else(|| {
            IngestError::StoreRejected(format!("draft '{}' has no item", draft.pid()))
        })?;
        (
            item.title().to_string(),
            datastream::assemble(item, draft.pid(), control_group)?,
        )
    };

    draft.set_label(&label);
    client.create_object(draft.pid(), &label)?;

    for descriptor in assembly.descriptors {
        client.attach_datastream(draft.pid(), &descriptor)?;
        draft.add_datastream(descriptor);
    }

    // Dropping the assembly deletes the temporary artifacts now that every
    // descriptor has been attached
    drop(assembly.temp_artifacts);
    Ok(assembly.errors)
}

/// Builder for [`BatchPipeline`]
pub struct BatchPipelineBuilder {
    source: Box<dyn ItemSource>,
    client: Arc<dyn RepositoryClient>,
    parent_id: Pid,
    control_group: ControlGroup,
    commit_immediately: bool,
    checkpoint_path: Option<PathBuf>,
    quiet: bool,
}

impl BatchPipelineBuilder {
    pub fn new(source: Box<dyn ItemSource>, client: Arc<dyn RepositoryClient>, parent_id: Pid) -> Self {
        Self {
            source,
            client,
            parent_id,
            control_group: ControlGroup::default(),
            commit_immediately: true,
            checkpoint_path: None,
            quiet: false,
        }
    }

    /// Storage mode for attached datastreams
    pub fn with_control_group(mut self, control_group: ControlGroup) -> Self {
        self.control_group = control_group;
        self
    }

    /// Run commit synchronously after preprocess (default) or defer it
    pub fn with_commit_immediately(mut self, commit_immediately: bool) -> Self {
        self.commit_immediately = commit_immediately;
        self
    }

    /// Persist the batch context here after each completed item
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    /// Suppress the progress bar
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> BatchPipeline {
        BatchPipeline {
            allocator: IdentifierAllocator::new(self.client.clone()),
            resolver: NamespaceResolver::new(self.client.clone()),
            source: self.source,
            client: self.client,
            parent_id: self.parent_id,
            control_group: self.control_group,
            commit_immediately: self.commit_immediately,
            checkpoint_path: self.checkpoint_path,
            quiet: self.quiet,
            progress: Arc::new(IngestProgress::new(0, self.quiet)),
            attempted: 0,
            drafts: Vec::new(),
        }
    }
}
