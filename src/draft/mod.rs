//! In-progress repository objects under construction by the pipeline

use crate::datastream::DatastreamDescriptor;
use crate::ingest::ImportItem;
use crate::types::{ContentModel, Pid, Relationship};
use std::path::PathBuf;

/// Lifecycle of a draft through the two-phase pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftState {
    /// Created, not yet wired
    Pending,
    /// Structure complete: relationships and content models attached
    Preprocessed,
    /// Terminal success: label and datastreams finalized on the store
    Committed,
    /// Terminal failure for this draft only; siblings proceed
    Error(String),
}

impl DraftState {
    /// Committed and errored drafts are immutable
    pub fn is_terminal(&self) -> bool {
        matches!(self, DraftState::Committed | DraftState::Error(_))
    }
}

/// An in-progress repository object
///
/// Preprocess fills in structure (parent, content models, relationships);
/// commit fills in content (label, datastreams) and moves the draft to a
/// terminal state.
#[derive(Debug)]
pub struct RepositoryObjectDraft {
    pid: Pid,
    parent_id: Pid,
    label: String,
    content_models: Vec<ContentModel>,
    relationships: Vec<Relationship>,
    datastreams: Vec<DatastreamDescriptor>,
    state: DraftState,
    item: Option<ImportItem>,
}

impl RepositoryObjectDraft {
    /// Start a draft; the item is adopted separately once wiring is done
    pub fn new(pid: Pid, parent_id: Pid) -> Self {
        Self {
            pid,
            parent_id,
            label: String::new(),
            content_models: Vec::new(),
            relationships: Vec::new(),
            datastreams: Vec::new(),
            state: DraftState::Pending,
            item: None,
        }
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn parent_id(&self) -> &Pid {
        &self.parent_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn content_models(&self) -> &[ContentModel] {
        &self.content_models
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn datastreams(&self) -> &[DatastreamDescriptor] {
        &self.datastreams
    }

    /// The wrapped item; present from adoption until the draft is dropped
    pub fn item(&self) -> Option<&ImportItem> {
        self.item.as_ref()
    }

    pub fn set_content_models(&mut self, models: Vec<ContentModel>) {
        if !self.state.is_terminal() {
            self.content_models = models;
        }
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        if !self.state.is_terminal() {
            self.relationships.push(relationship);
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        if !self.state.is_terminal() {
            self.label = label.into();
        }
    }

    pub fn add_datastream(&mut self, descriptor: DatastreamDescriptor) {
        if !self.state.is_terminal() {
            self.datastreams.push(descriptor);
        }
    }

    /// Take ownership of the item and mark the draft ready for commit
    pub fn adopt(&mut self, item: ImportItem) {
        self.item = Some(item);
        self.state = DraftState::Preprocessed;
    }

    pub fn mark_committed(&mut self) {
        if !self.state.is_terminal() {
            self.state = DraftState::Committed;
        }
    }

    pub fn mark_error(&mut self, reason: impl Into<String>) {
        if !self.state.is_terminal() {
            self.state = DraftState::Error(reason.into());
        }
    }

    /// External file dependencies that must be persisted before this draft
    ///
    /// Lets a dependency tracker sequence commits when drafts depend on one
    /// another. Generated-document drafts have none.
    pub fn resources(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TransformRegistry;
    use crate::ingest::item::XmlRecordVariant;
    use crate::types::{Namespace, IS_MEMBER_OF};
    use std::sync::Arc;

    fn draft_with_item() -> RepositoryObjectDraft {
        let mut draft = RepositoryObjectDraft::new(Pid::from("ir:1"), Pid::from("collection:root"));
        let item = ImportItem::new(
            Box::new(XmlRecordVariant::new(
                "<record><title>T</title></record>".to_string(),
                vec![ContentModel::new("model:generic")],
                Namespace::new("ir"),
            )),
            Arc::new(TransformRegistry::with_builtins()),
            "simplify",
        );
        let parent = draft.parent_id().clone();
        draft.add_relationship(Relationship::is_member_of(parent));
        draft.adopt(item);
        draft
    }

    #[test]
    fn test_wiring_and_adoption() {
        let draft = draft_with_item();
        assert_eq!(*draft.state(), DraftState::Preprocessed);
        assert_eq!(draft.relationships().len(), 1);
        assert_eq!(draft.relationships()[0].predicate, IS_MEMBER_OF);
        assert!(draft.item().is_some());
        assert!(draft.resources().is_empty());
    }

    #[test]
    fn test_terminal_drafts_are_immutable() {
        let mut draft = draft_with_item();
        draft.set_label("final label");
        draft.mark_committed();

        draft.set_label("too late");
        draft.add_relationship(Relationship::new("isPartOf", Pid::from("x:1")));
        draft.mark_error("ignored");

        assert_eq!(draft.label(), "final label");
        assert_eq!(draft.relationships().len(), 1);
        assert_eq!(*draft.state(), DraftState::Committed);
    }
}
