//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use client_core::OutgoingRequest;
use shared::{domain::HistoryKind, protocol::HistoryRecord};
use storage::HistoryFilter;
use uuid::Uuid;

pub enum BackendCommand {
    /// Annotation or refinement issued by the workflow controller.
    Execute(OutgoingRequest),
    SaveHistory(HistoryRecord),
    ListHistory(HistoryFilter),
    DeleteHistory(Uuid),
    ClearHistory(Option<HistoryKind>),
    ExportText { path: PathBuf, text: String },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Execute(request) => request.operation(),
            BackendCommand::SaveHistory(_) => "save_history",
            BackendCommand::ListHistory(_) => "list_history",
            BackendCommand::DeleteHistory(_) => "delete_history",
            BackendCommand::ClearHistory(_) => "clear_history",
            BackendCommand::ExportText { .. } => "export_text",
        }
    }
}
