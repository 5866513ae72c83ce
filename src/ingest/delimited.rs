//! Delimited XML list source
//!
//! A single XML file holding a flat list of `<record>` elements. Records are
//! split out verbatim (tags and attributes included) at open time so the
//! reported count is exact; extraction drains them front to back.

use super::item::{ImportItem, ItemFactory};
use super::source::{IngestError, ItemSource};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Source backed by one list-of-records XML file
pub struct DelimitedSource {
    path: PathBuf,
    name: String,
    records: VecDeque<String>,
    total: usize,
    factory: ItemFactory,
}

impl DelimitedSource {
    /// Open and pre-scan a delimited record list
    pub fn open(path: impl AsRef<Path>, factory: ItemFactory) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let xml = std::fs::read_to_string(&path)?;
        let records = split_records(&xml)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "records.xml".to_string());

        let total = records.len();
        Ok(Self {
            path,
            name,
            records,
            total,
            factory,
        })
    }

    /// Build a source directly from an XML string (tests, piped input)
    pub fn from_xml(xml: &str, factory: ItemFactory) -> Result<Self, IngestError> {
        let records = split_records(xml)?;
        let total = records.len();
        Ok(Self {
            path: PathBuf::new(),
            name: "inline records".to_string(),
            records,
            total,
            factory,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemSource for DelimitedSource {
    fn count(&self) -> usize {
        self.total
    }

    fn extract_one(&mut self) -> Result<Option<ImportItem>, IngestError> {
        match self.records.pop_front() {
            Some(record) => Ok(Some(self.factory.item_from_record(record))),
            None => Ok(None),
        }
    }

    fn skip(&mut self, count: usize) -> Result<(), IngestError> {
        self.records.drain(..count.min(self.records.len()));
        Ok(())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Slice every top-level `<record>` element out of the list document
fn split_records(xml: &str) -> Result<VecDeque<String>, IngestError> {
    let mut reader = Reader::from_str(xml);
    let mut records = VecDeque::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;
    let mut pos_before = 0usize;

    loop {
        let event = reader.read_event()?;
        // buffer_position reports u64; the input is an in-memory str, so the
        // offset always fits usize
        let pos_after = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"record" => {
                if start.is_none() {
                    start = Some(pos_before);
                } else {
                    depth += 1;
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"record" => {
                if start.is_none() {
                    records.push_back(xml[pos_before..pos_after].trim().to_string());
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"record" => {
                if depth > 0 {
                    depth -= 1;
                } else if let Some(s) = start.take() {
                    records.push_back(xml[s..pos_after].trim().to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }

        pos_before = pos_after;
    }

    if start.is_some() {
        return Err(IngestError::InvalidFormat(
            "unterminated <record> element".to_string(),
        ));
    }

    Ok(records)
}
