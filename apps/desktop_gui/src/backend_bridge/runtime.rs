//! Backend worker thread: owns the tokio runtime, the service client and the
//! history store, and answers UI commands with UI events.

use std::{sync::Arc, thread, time::Duration};

use client_core::{
    execute, AnnotationService, Completion, HttpServiceClient, RefinementService,
};
use crossbeam_channel::{Receiver, Sender};
use storage::HistoryStore;

use crate::backend_bridge::commands::BackendCommand;
use crate::config::{prepare_database_url, Settings};
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Both backends behind one handle.
pub trait ServiceBackend: AnnotationService + RefinementService {}

impl<T: AnnotationService + RefinementService> ServiceBackend for T {}

const COMPLETION_SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: Settings) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let worker = Worker::start(&settings, ui_tx).await;
            worker.emit(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                worker.handle(cmd).await;
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}

pub struct Worker {
    ui_tx: Sender<UiEvent>,
    services: Result<Arc<dyn ServiceBackend>, String>,
    history: Option<HistoryStore>,
}

impl Worker {
    pub fn new(
        ui_tx: Sender<UiEvent>,
        services: Result<Arc<dyn ServiceBackend>, String>,
        history: Option<HistoryStore>,
    ) -> Self {
        Self {
            ui_tx,
            services,
            history,
        }
    }

    async fn start(settings: &Settings, ui_tx: Sender<UiEvent>) -> Self {
        let services = HttpServiceClient::new(
            &settings.service_url,
            &settings.session(),
            settings.request_timeout(),
        )
        .map(|client| {
            let client = client.with_paths(&settings.annotate_path, &settings.refine_path);
            tracing::info!(service_url = %client.base_url(), "service client ready");
            Arc::new(client) as Arc<dyn ServiceBackend>
        })
        .map_err(|err| format!("service client unavailable: {err:#}"));

        if let Err(reason) = &services {
            tracing::error!("{reason}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: {reason}"),
            )));
        }

        let history = match open_history(&settings.database_url).await {
            Ok(store) => Some(store),
            Err(err) => {
                tracing::error!("history disabled: {err:#}");
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::History,
                    format!("History unavailable: {err:#}"),
                )));
                None
            }
        };

        Self::new(ui_tx, services, history)
    }

    pub fn emit(&self, event: UiEvent) {
        if self.ui_tx.try_send(event).is_err() {
            tracing::warn!("ui event queue full or closed; event dropped");
        }
    }

    pub async fn handle(&self, cmd: BackendCommand) {
        let name = cmd.name();
        tracing::debug!(command = name, "backend command received");

        match cmd {
            BackendCommand::Execute(request) => match &self.services {
                Ok(services) => {
                    let services = Arc::clone(services);
                    let ui_tx = self.ui_tx.clone();
                    tokio::spawn(async move {
                        let completion = execute(services.as_ref(), request).await;
                        deliver_completion(&ui_tx, completion);
                    });
                }
                Err(reason) => deliver_completion(&self.ui_tx, request.undelivered(reason.clone())),
            },
            BackendCommand::SaveHistory(record) => {
                let Some(store) = &self.history else {
                    tracing::warn!(record_id = %record.id, "history disabled; record dropped");
                    return;
                };
                match store.save(&record).await {
                    Ok(()) => {
                        tracing::info!(record_id = %record.id, kind = record.kind.as_str(), "history record saved");
                        self.emit(UiEvent::HistoryChanged);
                    }
                    Err(err) => self.history_error(format!("failed to save history: {err:#}")),
                }
            }
            BackendCommand::ListHistory(filter) => {
                let Some(store) = &self.history else {
                    self.emit(UiEvent::HistoryLoaded(Vec::new()));
                    return;
                };
                match store.list(&filter).await {
                    Ok(records) => self.emit(UiEvent::HistoryLoaded(records)),
                    Err(err) => self.history_error(format!("failed to load history: {err:#}")),
                }
            }
            BackendCommand::DeleteHistory(id) => {
                let Some(store) = &self.history else {
                    return;
                };
                match store.delete(id).await {
                    Ok(true) => self.emit(UiEvent::HistoryChanged),
                    Ok(false) => self.emit(UiEvent::Info("History entry was already removed".into())),
                    Err(err) => self.history_error(format!("failed to delete history entry: {err:#}")),
                }
            }
            BackendCommand::ClearHistory(kind) => {
                let Some(store) = &self.history else {
                    return;
                };
                match store.clear(kind).await {
                    Ok(removed) => {
                        self.emit(UiEvent::Info(format!("Removed {removed} history entries")));
                        self.emit(UiEvent::HistoryChanged);
                    }
                    Err(err) => self.history_error(format!("failed to clear history: {err:#}")),
                }
            }
            BackendCommand::ExportText { path, text } => {
                match tokio::fs::write(&path, text.as_bytes()).await {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), bytes = text.len(), "text exported");
                        self.emit(UiEvent::Exported(path));
                    }
                    Err(err) => self.emit(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Export,
                        format!("could not write '{}': {err}", path.display()),
                    ))),
                }
            }
        }
    }

    fn history_error(&self, message: String) {
        tracing::warn!("{message}");
        self.emit(UiEvent::Error(UiError::from_message(
            UiErrorContext::History,
            message,
        )));
    }
}

/// The workflow stays busy until its completion arrives, so a full queue is
/// waited on instead of dropping the event.
fn deliver_completion(ui_tx: &Sender<UiEvent>, completion: Completion) {
    let ticket = completion.ticket();
    if ui_tx
        .send_timeout(UiEvent::Completion(completion), COMPLETION_SEND_TIMEOUT)
        .is_err()
    {
        tracing::error!(%ticket, "ui event queue unavailable; completion lost");
    }
}

async fn open_history(database_url: &str) -> anyhow::Result<HistoryStore> {
    let database_url = prepare_database_url(database_url)?;
    let store = HistoryStore::new(&database_url).await?;
    store.health_check().await?;
    tracing::info!(%database_url, "history store ready");
    Ok(store)
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
