mod backend_bridge;
mod config;
mod controller;
mod ui;

use clap::Parser;
use client_core::WorkflowController;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::{commands::BackendCommand, runtime};
use crate::config::{load_settings, Args};
use crate::controller::{events::UiEvent, orchestration::QueuedHistory};
use crate::ui::{AnnotatorApp, PersistedAnnotatorSettings, SETTINGS_STORAGE_KEY};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = load_settings(&args);
    tracing::info!(
        service_url = %settings.service_url,
        has_user = settings.user_id.is_some(),
        "starting annotator"
    );

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    let controller = WorkflowController::new(
        settings.session(),
        Box::new(QueuedHistory::new(cmd_tx.clone())),
    );
    runtime::launch(cmd_rx, ui_tx, settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Annotator")
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([860.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Annotator",
        options,
        Box::new(|cc| {
            let persisted_settings = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedAnnotatorSettings>(&text).ok())
            });
            Ok(Box::new(AnnotatorApp::new(
                cmd_tx,
                ui_rx,
                controller,
                persisted_settings,
            )))
        }),
    )
}
