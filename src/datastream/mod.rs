//! Datastream descriptors and the document-to-datastream assembler

use crate::ingest::{ImportItem, IngestError};
use crate::types::Pid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempPath;

/// Identifier of a generated datastream on a repository object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatastreamId {
    /// The main descriptive document
    Primary,
    /// The document produced by transforming the primary document
    Derived,
}

impl DatastreamId {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatastreamId::Primary => "PRIMARY",
            DatastreamId::Derived => "DERIVED",
        }
    }

    /// Display label used on the attached datastream
    pub fn label(&self) -> &'static str {
        match self {
            DatastreamId::Primary => "Primary descriptive record",
            DatastreamId::Derived => "Derived descriptive record",
        }
    }
}

impl fmt::Display for DatastreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage mode the repository store uses for a datastream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlGroup {
    /// Content stored inline in the object record
    Inline,
    /// Content managed by the store
    Managed,
    /// Content referenced at an external location
    External,
}

impl ControlGroup {
    /// One-letter code the store protocol uses
    pub fn code(&self) -> char {
        match self {
            ControlGroup::Inline => 'X',
            ControlGroup::Managed => 'M',
            ControlGroup::External => 'E',
        }
    }
}

impl Default for ControlGroup {
    fn default() -> Self {
        ControlGroup::Managed
    }
}

/// A named, typed content unit ready to be attached to a repository object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastreamDescriptor {
    pub dsid: DatastreamId,
    pub label: String,
    pub mimetype: String,
    pub control_group: ControlGroup,
    /// Path of the persisted document content
    pub content_path: PathBuf,
}

impl DatastreamDescriptor {
    pub fn new(dsid: DatastreamId, control_group: ControlGroup, content_path: PathBuf) -> Self {
        Self {
            dsid,
            label: dsid.label().to_string(),
            mimetype: "application/xml".to_string(),
            control_group,
            content_path,
        }
    }
}

/// Structured, non-fatal error recorded when a document is missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastreamError {
    pub dsid: DatastreamId,
    pub pid: Pid,
    pub reason: String,
}

impl DatastreamError {
    pub fn missing_document(dsid: DatastreamId, pid: Pid) -> Self {
        Self {
            dsid,
            pid,
            reason: "missing document".to_string(),
        }
    }
}

impl fmt::Display for DatastreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.pid, self.dsid, self.reason)
    }
}

/// Output of [`assemble`]: descriptors, recorded errors, temp files to clean up
///
/// `temp_artifacts` are owned by the caller; dropping them deletes the files,
/// so they must be kept alive until every descriptor has been attached.
pub struct Assembly {
    pub descriptors: Vec<DatastreamDescriptor>,
    pub errors: Vec<DatastreamError>,
    pub temp_artifacts: Vec<TempPath>,
}

/// Turn an item's generated documents into datastream descriptors
///
/// Primary and derived documents are attempted independently: a missing
/// document appends a structured error and assembly continues with the other
/// one. Only an IO failure while persisting a present document is fatal.
pub fn assemble(
    item: &ImportItem,
    pid: &Pid,
    control_group: ControlGroup,
) -> Result<Assembly, IngestError> {
    let mut assembly = Assembly {
        descriptors: Vec::with_capacity(2),
        errors: Vec::new(),
        temp_artifacts: Vec::new(),
    };

    let documents = [
        (DatastreamId::Primary, item.primary_document()),
        (DatastreamId::Derived, item.derived_document()),
    ];

    for (dsid, document) in documents {
        match document {
            Some(content) => {
                let path = persist(content)?;
                assembly.descriptors.push(DatastreamDescriptor::new(
                    dsid,
                    control_group,
                    path.to_path_buf(),
                ));
                assembly.temp_artifacts.push(path);
            }
            None => {
                assembly
                    .errors
                    .push(DatastreamError::missing_document(dsid, pid.clone()));
            }
        }
    }

    Ok(assembly)
}

/// Write document content to a temporary artifact
fn persist(content: &str) -> Result<TempPath, IngestError> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TransformRegistry;
    use crate::ingest::item::XmlRecordVariant;
    use crate::types::{ContentModel, Namespace};
    use std::sync::Arc;

    fn item_with_record(record: &str) -> ImportItem {
        ImportItem::new(
            Box::new(XmlRecordVariant::new(
                record.to_string(),
                vec![ContentModel::new("model:generic")],
                Namespace::new("ir"),
            )),
            Arc::new(TransformRegistry::with_builtins()),
            "simplify",
        )
    }

    #[test]
    fn test_assemble_both_documents() {
        let item = item_with_record("<record><title>Both</title></record>");
        let pid = Pid::from("ir:1");

        let assembly = assemble(&item, &pid, ControlGroup::Managed).unwrap();

        assert_eq!(assembly.descriptors.len(), 2);
        assert_eq!(assembly.errors.len(), 0);
        assert_eq!(assembly.temp_artifacts.len(), 2);
        assert_eq!(assembly.descriptors[0].dsid, DatastreamId::Primary);
        assert_eq!(assembly.descriptors[1].dsid, DatastreamId::Derived);
        assert_eq!(assembly.descriptors[0].mimetype, "application/xml");

        // Artifacts hold the document content until dropped
        let primary = std::fs::read_to_string(&assembly.descriptors[0].content_path).unwrap();
        assert!(primary.contains("<title>Both</title>"));
    }

    #[test]
    fn test_assemble_primary_only() {
        // No simplify-able fields, so the transform yields no derived document
        let item = item_with_record("<record><note>unmapped</note></record>");
        let pid = Pid::from("ir:2");

        let assembly = assemble(&item, &pid, ControlGroup::Managed).unwrap();

        assert_eq!(assembly.descriptors.len(), 1);
        assert_eq!(assembly.descriptors[0].dsid, DatastreamId::Primary);
        assert_eq!(assembly.errors.len(), 1);
        assert_eq!(assembly.errors[0].dsid, DatastreamId::Derived);
        assert_eq!(assembly.errors[0].reason, "missing document");
    }

    #[test]
    fn test_assemble_no_documents() {
        let item = item_with_record("");
        let pid = Pid::from("ir:3");

        let assembly = assemble(&item, &pid, ControlGroup::Managed).unwrap();

        assert!(assembly.descriptors.is_empty());
        assert_eq!(assembly.errors.len(), 2);
        assert_eq!(assembly.errors[0].dsid, DatastreamId::Primary);
        assert_eq!(assembly.errors[1].dsid, DatastreamId::Derived);
    }

    #[test]
    fn test_artifacts_deleted_on_drop() {
        let item = item_with_record("<record><title>T</title></record>");
        let pid = Pid::from("ir:4");

        let assembly = assemble(&item, &pid, ControlGroup::Managed).unwrap();
        let paths: Vec<_> = assembly
            .descriptors
            .iter()
            .map(|d| d.content_path.clone())
            .collect();

        for p in &paths {
            assert!(p.exists());
        }
        drop(assembly);
        for p in &paths {
            assert!(!p.exists());
        }
    }

    #[test]
    fn test_control_group_codes() {
        assert_eq!(ControlGroup::Inline.code(), 'X');
        assert_eq!(ControlGroup::Managed.code(), 'M');
        assert_eq!(ControlGroup::External.code(), 'E');
    }
}
