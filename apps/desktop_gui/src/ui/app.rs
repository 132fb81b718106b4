use std::{collections::BTreeMap, time::Duration};

use arboard::Clipboard;
use chrono::{Local, NaiveDate};
use client_core::{
    instructions::{template_for_instruction, INSTRUCTION_TEMPLATES},
    metrics::MAX_SCORE,
    text::normalize_text,
    Applied, Completion, OutgoingRequest, Submission, WorkflowController, WorkflowError,
    WorkflowState,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{HistoryKind, MetricId, ModelId, KNOWN_MODELS},
    protocol::HistoryRecord,
};
use storage::HistoryFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{err_label, UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::ui::overlay::{self, metric_palette, OverlayStyle, ScrollMirror};

pub const SETTINGS_STORAGE_KEY: &str = "annotator.settings";

const DEFAULT_TEXT_SIZE: f32 = 16.0;
const MIN_TEXT_SIZE: f32 = 12.0;
const MAX_TEXT_SIZE: f32 = 28.0;
const HISTORY_PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedAnnotatorSettings {
    models: BTreeMap<MetricId, ModelId>,
    text_size: f32,
}

impl Default for PersistedAnnotatorSettings {
    fn default() -> Self {
        Self {
            models: BTreeMap::new(),
            text_size: DEFAULT_TEXT_SIZE,
        }
    }
}

impl PersistedAnnotatorSettings {
    /// Applies stored model choices and returns the text size to use.
    fn into_runtime(self, controller: &mut WorkflowController) -> f32 {
        for (metric, model) in &self.models {
            if let Err(err) = controller.set_model(*metric, model.as_str()) {
                tracing::warn!(metric = metric.as_str(), "stored model not applied: {err}");
            }
        }
        self.text_size.clamp(MIN_TEXT_SIZE, MAX_TEXT_SIZE)
    }

    fn from_runtime(controller: &WorkflowController, text_size: f32) -> Self {
        Self {
            models: controller.metrics().model_assignments(),
            text_size: text_size.clamp(MIN_TEXT_SIZE, MAX_TEXT_SIZE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppView {
    Analyze,
    History,
}

#[derive(Debug, Default)]
struct HistoryUiState {
    records: Vec<HistoryRecord>,
    query: String,
    kind: Option<HistoryKind>,
    loaded: bool,
}

impl HistoryUiState {
    fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            kind: self.kind,
            query: None,
        }
        .search(self.query.clone())
    }
}

pub struct AnnotatorApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    controller: WorkflowController,
    /// Editor buffers mirror the controller; edits are pushed up the same frame.
    editor_text: String,
    instruction_text: String,
    scroll_mirror: ScrollMirror,
    status: String,
    status_banner: Option<StatusBanner>,
    inline_error: Option<UiError>,
    view: AppView,
    history: HistoryUiState,
    text_size: f32,
}

impl AnnotatorApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        mut controller: WorkflowController,
        persisted_settings: Option<PersistedAnnotatorSettings>,
    ) -> Self {
        let text_size = persisted_settings
            .unwrap_or_default()
            .into_runtime(&mut controller);
        let status = match controller.session().user_id() {
            Some(user_id) => format!("Signed in as {user_id}"),
            None => "No user id configured; set ANNOTATOR_USER_ID or --user-id".to_string(),
        };
        Self {
            cmd_tx,
            ui_rx,
            controller,
            editor_text: String::new(),
            instruction_text: String::new(),
            scroll_mirror: ScrollMirror::default(),
            status,
            status_banner: None,
            inline_error: None,
            view: AppView::Analyze,
            history: HistoryUiState::default(),
            text_size,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => self.show_error(err),
                UiEvent::Completion(completion) => self.apply_completion(completion),
                UiEvent::HistoryLoaded(records) => {
                    self.status = format!("{} history entries", records.len());
                    self.history.records = records;
                    self.history.loaded = true;
                }
                UiEvent::HistoryChanged => {
                    if self.view == AppView::History {
                        self.request_history();
                    } else {
                        self.history.loaded = false;
                    }
                }
                UiEvent::Exported(path) => {
                    self.status = format!("Exported to {}", path.display());
                }
            }
        }
        self.sync_buffers();
    }

    fn apply_completion(&mut self, completion: Completion) {
        let context = match &completion {
            Completion::Annotation { .. } => UiErrorContext::Analysis,
            Completion::Refinement { .. } => UiErrorContext::Refinement,
        };
        match self.controller.complete(completion) {
            Ok(Applied::Annotated { segments, fallback }) => {
                self.status_banner = None;
                self.status = if fallback {
                    format!("Analysis ready ({segments} segments, split by sentence)")
                } else {
                    format!("Analysis ready ({segments} segments)")
                };
            }
            Ok(Applied::Refined(outcome)) => {
                self.status_banner = None;
                self.status = format!("Refined text ready: {}", outcome.record.title);
            }
            Err(err) if err.is_stale() => {
                tracing::debug!("{err}");
            }
            Err(WorkflowError::Service(err)) => {
                self.show_error(UiError::from_service(context, &err));
            }
            Err(WorkflowError::Validation(err)) => {
                self.inline_error = Some(UiError::from_validation(&err));
            }
            Err(err) => {
                self.show_error(UiError::from_message(context, err.to_string()));
            }
        }
    }

    fn show_error(&mut self, err: UiError) {
        tracing::warn!(category = ?err.category(), context = ?err.context(), "{}", err.message());
        let mut message = format!("{} error: {}", err_label(err.category()), err.message());
        if err.requires_reauth() {
            message.push_str(" (check the configured access token)");
        }
        self.status = message.clone();
        self.status_banner = Some(StatusBanner {
            severity: StatusBannerSeverity::Error,
            message,
        });
    }

    /// Pulls controller-side text changes (refinement, clear, restore) into the editor.
    fn sync_buffers(&mut self) {
        if self.editor_text != self.controller.text() {
            self.editor_text = self.controller.text().to_string();
        }
        if self.instruction_text != self.controller.instruction() {
            self.instruction_text = self.controller.instruction().to_string();
        }
    }

    fn submit(&mut self) {
        self.inline_error = None;
        match self.controller.submit() {
            Ok(Submission::Dispatched(request)) => {
                self.status = match &request {
                    OutgoingRequest::Annotate { .. } => "Analyzing...".to_string(),
                    OutgoingRequest::Refine { .. } => "Refining...".to_string(),
                };
                let pending = request.clone();
                if !dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::Execute(request),
                    &mut self.status,
                ) {
                    // The controller is waiting on this ticket; settle it now.
                    let reason = self.status.clone();
                    self.apply_completion(pending.undelivered(reason));
                }
            }
            Ok(Submission::Ignored { state }) => {
                self.status = format!("Still {}; please wait", state_label(state).to_lowercase());
            }
            Err(err) => self.inline_error = Some(UiError::from_validation(&err)),
        }
        self.sync_buffers();
    }

    fn edit_text(&mut self) {
        if let Err(err) = self.controller.edit_text(self.editor_text.clone()) {
            self.inline_error = Some(UiError::from_validation(&err));
            self.sync_buffers();
        }
    }

    fn edit_instruction(&mut self) {
        if let Err(err) = self.controller.set_instruction(self.instruction_text.clone()) {
            self.inline_error = Some(UiError::from_validation(&err));
            self.sync_buffers();
        }
    }

    fn clear(&mut self) {
        self.controller.clear();
        self.inline_error = None;
        self.status_banner = None;
        self.scroll_mirror = ScrollMirror::default();
        self.sync_buffers();
        self.status = "Cleared".to_string();
    }

    fn format_text(&mut self) {
        let formatted = normalize_text(&self.editor_text);
        if formatted == self.editor_text {
            self.status = "Text already formatted".to_string();
            return;
        }
        self.editor_text = formatted;
        self.edit_text();
        self.status = "Text formatted".to_string();
    }

    fn copy_text(&mut self) {
        let text = self.controller.text().to_string();
        if text.is_empty() {
            return;
        }
        self.copy_to_clipboard(text, "Text copied to clipboard");
    }

    fn copy_to_clipboard(&mut self, text: String, done: &str) {
        match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.status = done.to_string(),
            Err(err) => self.show_error(UiError::from_message(
                UiErrorContext::General,
                format!("Clipboard unavailable: {err}"),
            )),
        }
    }

    fn export_text(&mut self) {
        let text = self.controller.text().to_string();
        if text.trim().is_empty() {
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(export_file_name(Local::now().date_naive()))
            .add_filter("Text", &["txt"])
            .save_file()
        else {
            return;
        };
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::ExportText { path, text },
            &mut self.status,
        );
    }

    fn set_model(&mut self, metric: MetricId, model: &str) {
        if let Err(err) = self.controller.set_model(metric, model) {
            self.inline_error = Some(UiError::from_validation(&err));
        }
    }

    fn request_history(&mut self) {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::ListHistory(self.history.filter()),
            &mut self.status,
        );
    }

    fn open_history_record(&mut self, record: &HistoryRecord) {
        self.controller.restore(record.content.clone());
        self.inline_error = None;
        self.scroll_mirror = ScrollMirror::default();
        self.sync_buffers();
        self.view = AppView::Analyze;
        self.status = format!("Opened \"{}\"", record.title);
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Annotator");
                ui.separator();
                ui.selectable_value(&mut self.view, AppView::Analyze, "Analyze");
                let history_tab = ui.selectable_value(&mut self.view, AppView::History, "History");
                if history_tab.clicked() && !self.history.loaded {
                    self.request_history();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add(
                        egui::Slider::new(&mut self.text_size, MIN_TEXT_SIZE..=MAX_TEXT_SIZE)
                            .text("Text size")
                            .step_by(1.0),
                    );
                    ui.separator();
                    ui.label(state_label(self.controller.state()));
                    if self.controller.is_busy() {
                        ui.spinner();
                    }
                });
            });
            self.show_status_banner(ui);
            ui.add_space(4.0);
        });
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&self.status).small());
                if let Some(user_id) = self.controller.session().user_id() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(egui::RichText::new(user_id.as_str()).small().weak());
                    });
                }
            });
        });
    }

    fn show_metrics_panel(&mut self, ctx: &egui::Context) {
        let busy = self.controller.is_busy();
        let mut model_change: Option<(MetricId, &'static str)> = None;

        egui::SidePanel::right("metrics_panel")
            .resizable(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("Metrics");
                ui.add_space(4.0);
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.add_enabled_ui(!busy, |ui| {
                        for metric in self.controller.metrics().iter() {
                            let palette = metric_palette(metric.id());
                            let model = metric.display_model();
                            egui::Frame::new()
                                .fill(palette.background)
                                .corner_radius(egui::CornerRadius::same(8))
                                .inner_margin(egui::Margin::symmetric(12, 10))
                                .show(ui, |ui| {
                                    ui.set_width(ui.available_width());
                                    ui.label(
                                        egui::RichText::new(metric.id().label())
                                            .strong()
                                            .color(palette.foreground),
                                    );
                                    ui.label(
                                        egui::RichText::new(metric.description())
                                            .small()
                                            .color(palette.foreground),
                                    );
                                    ui.add(
                                        egui::ProgressBar::new(
                                            f32::from(metric.score()) / f32::from(MAX_SCORE),
                                        )
                                        .fill(palette.foreground)
                                        .text(format!("{}%", metric.score())),
                                    );
                                    egui::ComboBox::from_id_salt(("model", metric.id()))
                                        .selected_text(model.display_name())
                                        .width(ui.available_width())
                                        .show_ui(ui, |ui| {
                                            for known in &KNOWN_MODELS {
                                                let selected = model.as_str() == known.id;
                                                if ui
                                                    .selectable_label(selected, known.name)
                                                    .on_hover_text(known.description)
                                                    .clicked()
                                                    && !selected
                                                {
                                                    model_change = Some((metric.id(), known.id));
                                                }
                                            }
                                        });
                                });
                            ui.add_space(6.0);
                        }
                    });
                });
            });

        if let Some((metric, model)) = model_change {
            self.set_model(metric, model);
        }
    }

    fn show_metric_legend(ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for metric in MetricId::ALL {
                let palette = metric_palette(metric);
                egui::Frame::new()
                    .fill(palette.background)
                    .corner_radius(egui::CornerRadius::same(6))
                    .inner_margin(egui::Margin::symmetric(8, 2))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(metric.label())
                                .small()
                                .color(palette.foreground),
                        );
                    });
            }
        });
    }

    fn show_editor(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let state = self.controller.state();
            let busy = state.is_busy();

            Self::show_metric_legend(ui);
            ui.add_space(6.0);

            let editor_height = (ui.available_height() * 0.6).max(160.0);
            let style = OverlayStyle::new(self.text_size, ui.visuals());
            let edited = egui::Frame::new()
                .stroke(ui.visuals().widgets.inactive.bg_stroke)
                .corner_radius(egui::CornerRadius::same(8))
                .show(ui, |ui| {
                    ui.set_height(editor_height);
                    overlay::show(
                        ui,
                        "editor",
                        &mut self.editor_text,
                        self.controller.segments(),
                        &style,
                        !busy,
                        &mut self.scroll_mirror,
                    )
                    .changed
                })
                .inner;
            if edited {
                self.edit_text();
            }

            if let Some(err) = &self.inline_error {
                ui.colored_label(ui.visuals().error_fg_color, err.message());
            }
            ui.add_space(6.0);

            if state.is_annotated() || state == WorkflowState::Refining {
                self.show_instruction(ui, busy);
                ui.add_space(6.0);
            }

            ui.horizontal(|ui| {
                let submit_label = if state.is_annotated() || state == WorkflowState::Refining {
                    "Refine"
                } else {
                    "Analyze"
                };
                let submit = ui
                    .add_enabled(!busy, egui::Button::new(submit_label))
                    .on_hover_text("Ctrl+Enter");
                let shortcut = ui.input(|input| {
                    input.modifiers.command && input.key_pressed(egui::Key::Enter)
                });
                if submit.clicked() || (shortcut && !busy) {
                    self.submit();
                }
                if busy {
                    ui.spinner();
                }
                if ui.button("Clear").clicked() {
                    self.clear();
                }
                let has_text = !self.editor_text.trim().is_empty();
                if ui
                    .add_enabled(!busy && has_text, egui::Button::new("Format"))
                    .clicked()
                {
                    self.format_text();
                }
                if ui.add_enabled(has_text, egui::Button::new("Copy")).clicked() {
                    self.copy_text();
                }
                if ui
                    .add_enabled(has_text && !busy, egui::Button::new("Export"))
                    .clicked()
                {
                    self.export_text();
                }
            });

            if let Some(outcome) = self.controller.last_result() {
                ui.add_space(4.0);
                ui.label(
                    egui::RichText::new(format!(
                        "Last refinement: \"{}\"",
                        outcome.record.instruction.as_deref().unwrap_or_default()
                    ))
                    .small()
                    .weak(),
                );
            }
        });
    }

    fn show_instruction(&mut self, ui: &mut egui::Ui, busy: bool) {
        ui.horizontal(|ui| {
            ui.label("Instruction");
            let current = template_for_instruction(&self.instruction_text)
                .map(|template| template.name)
                .unwrap_or("Templates");
            let mut picked = None;
            ui.add_enabled_ui(!busy, |ui| {
                egui::ComboBox::from_id_salt("instruction_template")
                    .selected_text(current)
                    .show_ui(ui, |ui| {
                        for template in &INSTRUCTION_TEMPLATES {
                            if ui
                                .selectable_label(current == template.name, template.name)
                                .on_hover_text(template.prompt)
                                .clicked()
                            {
                                picked = Some(template.prompt);
                            }
                        }
                    });
            });
            if let Some(prompt) = picked {
                self.instruction_text = prompt.to_string();
                self.edit_instruction();
            }
        });
        let response = ui.add_enabled(
            !busy,
            egui::TextEdit::multiline(&mut self.instruction_text)
                .hint_text("Describe how the text should change")
                .desired_rows(2)
                .desired_width(f32::INFINITY),
        );
        if response.changed() {
            self.edit_instruction();
        }
    }

    fn show_history(&mut self, ctx: &egui::Context) {
        let mut open = None;
        let mut copy = None;
        let mut delete = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.history.query)
                        .hint_text("Search titles")
                        .desired_width(240.0),
                );
                let mut refresh = search.changed();

                egui::ComboBox::from_id_salt("history_kind")
                    .selected_text(self.history.kind.map(kind_label).unwrap_or("All"))
                    .show_ui(ui, |ui| {
                        refresh |= ui
                            .selectable_value(&mut self.history.kind, None, "All")
                            .clicked();
                        for kind in HistoryKind::ALL {
                            refresh |= ui
                                .selectable_value(
                                    &mut self.history.kind,
                                    Some(kind),
                                    kind_label(kind),
                                )
                                .clicked();
                        }
                    });

                refresh |= ui.button("Refresh").clicked();
                if refresh {
                    self.request_history();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(!self.history.records.is_empty(), egui::Button::new("Clear all"))
                        .clicked()
                    {
                        dispatch_backend_command(
                            &self.cmd_tx,
                            BackendCommand::ClearHistory(self.history.kind),
                            &mut self.status,
                        );
                    }
                });
            });
            ui.separator();

            if self.history.records.is_empty() {
                ui.label(if self.history.loaded {
                    "No saved results yet."
                } else {
                    "Loading history..."
                });
                return;
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for record in &self.history.records {
                        egui::Frame::new()
                            .stroke(ui.visuals().widgets.noninteractive.bg_stroke)
                            .corner_radius(egui::CornerRadius::same(8))
                            .inner_margin(egui::Margin::symmetric(12, 10))
                            .show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                ui.horizontal(|ui| {
                                    ui.label(egui::RichText::new(&record.title).strong());
                                    ui.label(
                                        egui::RichText::new(kind_label(record.kind))
                                            .small()
                                            .weak(),
                                    );
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            if ui.button("Delete").clicked() {
                                                delete = Some(record.id);
                                            }
                                            if ui.button("Copy").clicked() {
                                                copy = Some(record.content.clone());
                                            }
                                            if ui.button("Open").clicked() {
                                                open = Some(record.clone());
                                            }
                                            ui.label(
                                                egui::RichText::new(
                                                    record
                                                        .created_at
                                                        .with_timezone(&Local)
                                                        .format("%Y-%m-%d %H:%M")
                                                        .to_string(),
                                                )
                                                .small()
                                                .weak(),
                                            );
                                        },
                                    );
                                });
                                if let Some(instruction) = &record.instruction {
                                    ui.label(
                                        egui::RichText::new(format!("Instruction: {instruction}"))
                                            .small()
                                            .italics(),
                                    );
                                }
                                ui.label(history_preview(&record.content, HISTORY_PREVIEW_CHARS));
                            });
                        ui.add_space(6.0);
                    }
                });
        });

        if let Some(record) = open {
            self.open_history_record(&record);
        }
        if let Some(content) = copy {
            self.copy_to_clipboard(content, "History entry copied to clipboard");
        }
        if let Some(id) = delete {
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::DeleteHistory(id),
                &mut self.status,
            );
        }
    }
}

fn kind_label(kind: HistoryKind) -> &'static str {
    match kind {
        HistoryKind::Analysis => "Analysis",
        HistoryKind::Editor => "Editor",
        HistoryKind::Chat => "Chat",
    }
}

fn state_label(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::Idle => "Ready",
        WorkflowState::Analyzing => "Analyzing",
        WorkflowState::Annotated => "Annotated",
        WorkflowState::Instructing => "Instructing",
        WorkflowState::Refining => "Refining",
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("refined-text-{}.txt", date.format("%Y-%m-%d"))
}

fn history_preview(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", flat[..cut].trim_end()),
        None => flat,
    }
}

impl eframe::App for AnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        match self.view {
            AppView::Analyze => {
                self.show_metrics_panel(ctx);
                self.show_editor(ctx);
            }
            AppView::History => self.show_history(ctx),
        }

        if self.controller.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedAnnotatorSettings::from_runtime(&self.controller, self.text_size);
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
