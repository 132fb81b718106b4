//! Command orchestration helpers from UI actions to backend command queue.

use client_core::HistorySink;
use crossbeam_channel::{Sender, TrySendError};
use shared::protocol::HistoryRecord;

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd`; on failure writes a user-facing reason into `status` and returns false.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> bool {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            false
        }
    }
}

/// Hands refined results to the backend worker for storage.
pub struct QueuedHistory {
    cmd_tx: Sender<BackendCommand>,
}

impl QueuedHistory {
    pub fn new(cmd_tx: Sender<BackendCommand>) -> Self {
        Self { cmd_tx }
    }
}

impl HistorySink for QueuedHistory {
    fn save(&self, record: HistoryRecord) {
        let record_id = record.id;
        let mut status = String::new();
        let queued =
            dispatch_backend_command(&self.cmd_tx, BackendCommand::SaveHistory(record), &mut status);
        if !queued {
            tracing::warn!(%record_id, "history record not saved: {status}");
        }
    }
}
