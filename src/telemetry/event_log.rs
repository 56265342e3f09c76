//! Append-only event log with a one-record retraction window.
//!
//! Two classifiers rewrite history: a second click replaces the click before it with a
//! double-click, and a second quick keypress absorbs the one before it into an input run.
//! Only the most recent record can be retracted, and only until the log is sealed
//! (on pause, stop and custom events).

use crate::recorder::channel::{RecordingError, RecordingResult};
use crate::telemetry::record::{EventRecord, MetadataDocument, ScreenSize, METADATA_VERSION};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    tail_open: bool,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EventRecord) -> &EventRecord {
        tracing::debug!(
            "Telemetry record {} ({}) at {:.3}s",
            record.id,
            record.type_name(),
            record.time()
        );
        self.records.push(record);
        self.tail_open = true;
        &self.records[self.records.len() - 1]
    }

    /// The last record, if it can still be retracted.
    pub fn retractable(&self) -> Option<&EventRecord> {
        if self.tail_open {
            self.records.last()
        } else {
            None
        }
    }

    /// Remove the last record if it is still retractable and matches `predicate`.
    pub fn retract_if(
        &mut self,
        predicate: impl FnOnce(&EventRecord) -> bool,
    ) -> Option<EventRecord> {
        if !self.retractable().is_some_and(predicate) {
            return None;
        }
        self.tail_open = false;
        self.records.pop()
    }

    /// Commit everything logged so far; nothing before this point can be retracted.
    pub fn seal(&mut self) {
        self.tail_open = false;
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.tail_open = false;
    }

    /// Serialize the session document (pretty JSON).
    pub fn render(
        &self,
        recording_start: Option<&str>,
        recording_duration_ms: u64,
        screen: ScreenSize,
        fps: u32,
    ) -> RecordingResult<Vec<u8>> {
        let document = MetadataDocument {
            version: METADATA_VERSION,
            recording_start,
            recording_duration: recording_duration_ms,
            screen,
            fps,
            events: &self.records,
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

/// A rendered document waiting to be written; produced under the engine lock, written outside it.
#[derive(Debug)]
pub struct PendingFlush {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl PendingFlush {
    pub fn write(&self) -> RecordingResult<()> {
        write_metadata(&self.path, &self.bytes)
    }
}

/// Write the document atomically enough for a crash mid-write to leave the previous flush intact.
///
/// Each call stages into its own temp file, so concurrent writers never share one.
pub fn write_metadata(path: &Path, bytes: &[u8]) -> RecordingResult<()> {
    let persist = |e: std::io::Error| RecordingError::Persistence {
        path: path.to_path_buf(),
        source: e,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(persist)?;
            parent
        }
        None => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(persist)?;
    staged.write_all(bytes).map_err(persist)?;
    staged.persist(path).map_err(|e| persist(e.error))?;
    Ok(())
}
