//! Directory listing source
//!
//! A flat directory of standalone XML record files, one item per file,
//! drained in file-name order.

use super::item::{ImportItem, ItemFactory};
use super::source::{IngestError, ItemSource};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source backed by a directory of `*.xml` record files
pub struct DirectorySource {
    name: String,
    files: VecDeque<PathBuf>,
    total: usize,
    factory: ItemFactory,
}

impl DirectorySource {
    /// Scan a directory for record files, sorted by file name
    pub fn open(dir: impl AsRef<Path>, factory: ItemFactory) -> Result<Self, IngestError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(IngestError::InvalidFormat(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("xml"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();
        debug!("Directory source '{}': {} record files", dir.display(), files.len());

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let total = files.len();
        Ok(Self {
            name,
            files: files.into(),
            total,
            factory,
        })
    }
}

impl ItemSource for DirectorySource {
    fn count(&self) -> usize {
        self.total
    }

    fn extract_one(&mut self) -> Result<Option<ImportItem>, IngestError> {
        match self.files.pop_front() {
            Some(path) => {
                let record = std::fs::read_to_string(&path)?;
                Ok(Some(self.factory.item_from_record(record)))
            }
            None => Ok(None),
        }
    }

    fn skip(&mut self, count: usize) -> Result<(), IngestError> {
        self.files.drain(..count.min(self.files.len()));
        Ok(())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TransformRegistry;
    use crate::types::{ContentModel, Namespace};
    use std::sync::Arc;

    fn factory() -> ItemFactory {
        ItemFactory::new(
            vec![ContentModel::new("model:generic")],
            Namespace::new("ir"),
            Arc::new(TransformRegistry::with_builtins()),
            "simplify",
        )
    }

    #[test]
    fn test_directory_extraction_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.xml"),
            "<record><title>Beta</title></record>",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.xml"),
            "<record><title>Alpha</title></record>",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = DirectorySource::open(dir.path(), factory()).unwrap();
        assert_eq!(source.count(), 2);

        let first = source.extract_one().unwrap().unwrap();
        assert_eq!(first.title(), "Alpha");
        let second = source.extract_one().unwrap().unwrap();
        assert_eq!(second.title(), "Beta");
        assert!(source.extract_one().unwrap().is_none());
    }

    #[test]
    fn test_skip_advances_past_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xml"), "<record><title>Alpha</title></record>").unwrap();
        std::fs::write(dir.path().join("b.xml"), "<record><title>Beta</title></record>").unwrap();

        let mut source = DirectorySource::open(dir.path(), factory()).unwrap();
        source.skip(1).unwrap();

        let next = source.extract_one().unwrap().unwrap();
        assert_eq!(next.title(), "Beta");
        assert!(source.extract_one().unwrap().is_none());
    }

    #[test]
    fn test_open_rejects_non_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(DirectorySource::open(file.path(), factory()).is_err());
    }
}
