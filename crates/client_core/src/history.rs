//! Persistence side effect fired after a successful refinement.

use std::sync::{Arc, Mutex};

use shared::protocol::HistoryRecord;

/// Fire-and-forget persistence collaborator. The workflow never waits on it.
pub trait HistorySink: Send {
    fn save(&self, record: HistoryRecord);
}

/// Drops every record, for controllers that do not keep history.
pub struct DiscardHistory;

impl HistorySink for DiscardHistory {
    fn save(&self, record: HistoryRecord) {
        tracing::debug!(record_id = %record.id, "history disabled; record dropped");
    }
}

/// Keeps saved records in memory; shared handle for inspection.
#[derive(Clone, Default)]
pub struct RecordingHistory {
    records: Arc<Mutex<Vec<HistoryRecord>>>,
}

impl RecordingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl HistorySink for RecordingHistory {
    fn save(&self, record: HistoryRecord) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
