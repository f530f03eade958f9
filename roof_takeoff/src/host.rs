//! Selection records delivered to the embedding host application.

use std::io::Write;

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};

use crate::measurement::{FaceSummary, SummaryItem};

/// Version of the [`HostRecord`] layout. Bump when fields change meaning.
pub const RECORD_VERSION: u32 = 1;

/// Snapshot of the selection sent to the host after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    pub version: u32,
    pub selected_faces: Vec<FaceSummary>,
    pub total_area: f64,
    pub line_summary: Vec<SummaryItem>,
    pub all_selected: bool,
    /// Selection revision the record was produced for.
    pub revision: u64,
    pub timestamp: DateTime<Utc>,
}

/// Destination of host records. The transport behind it is up to the
/// embedding application.
pub trait HostSink {
    fn deliver(&mut self, record: &HostRecord);
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl HostSink for NullSink {
    fn deliver(&mut self, _record: &HostRecord) {}
}

/// Keeps every delivered record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<HostRecord>,
}

impl RecordingSink {
    pub fn last(&self) -> Option<&HostRecord> {
        self.records.last()
    }
}

impl HostSink for RecordingSink {
    fn deliver(&mut self, record: &HostRecord) {
        self.records.push(record.clone());
    }
}

/// Writes each record as one line of JSON.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> HostSink for JsonLinesSink<W> {
    fn deliver(&mut self, record: &HostRecord) {
        let result = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::other)
            .and_then(|_| writeln!(self.writer))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            error!("failed to deliver selection record: {}", e);
        }
    }
}

impl<S: HostSink + ?Sized> HostSink for &mut S {
    fn deliver(&mut self, record: &HostRecord) {
        (**self).deliver(record);
    }
}

impl<S: HostSink + ?Sized> HostSink for Box<S> {
    fn deliver(&mut self, record: &HostRecord) {
        (**self).deliver(record);
    }
}
