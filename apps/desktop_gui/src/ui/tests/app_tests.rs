use super::*;

use std::collections::BTreeMap;

use client_core::{DiscardHistory, ServiceError, SessionContext};
use crossbeam_channel::bounded;
use shared::protocol::{AnalysisSegment, AnnotateResponse, RefineResponse};

use crate::controller::events::UiErrorCategory;

fn app_with_queue(capacity: usize) -> (AnnotatorApp, Receiver<BackendCommand>, Sender<UiEvent>) {
    let (cmd_tx, cmd_rx) = bounded(capacity);
    let (ui_tx, ui_rx) = bounded(16);
    let controller = WorkflowController::new(
        SessionContext::for_user("user-42"),
        Box::new(DiscardHistory),
    );
    (AnnotatorApp::new(cmd_tx, ui_rx, controller, None), cmd_rx, ui_tx)
}

fn annotate_response() -> AnnotateResponse {
    let percentages = MetricId::ALL
        .into_iter()
        .zip([70.0, 90.0, 40.0, 85.0, 60.0])
        .map(|(metric, score)| (metric.as_str().to_string(), score))
        .collect::<BTreeMap<_, _>>();
    AnnotateResponse {
        analysis: vec![
            AnalysisSegment {
                text: "The sky is blue. ".into(),
                kind: "factual".into(),
            },
            AnalysisSegment {
                text: "Water boils at 100C.".into(),
                kind: "factual".into(),
            },
        ],
        percentages,
        models: BTreeMap::new(),
    }
}

fn type_text(app: &mut AnnotatorApp, text: &str) {
    app.editor_text = text.to_string();
    app.edit_text();
}

#[test]
fn export_file_name_uses_the_calendar_date() {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("date");
    assert_eq!(export_file_name(date), "refined-text-2024-05-01.txt");
}

#[test]
fn history_preview_flattens_and_truncates() {
    assert_eq!(history_preview("one\n\ntwo   three", 40), "one two three");
    assert_eq!(history_preview("abcdef", 3), "abc…");
    assert_eq!(history_preview("déjà vu", 4), "déjà…");
}

#[test]
fn persisted_settings_restore_canonical_models_and_clamp_text_size() {
    let raw = r#"{"models":{"creativity":"Claude"},"text_size":99.0}"#;
    let settings: PersistedAnnotatorSettings = serde_json::from_str(raw).expect("settings");
    let mut controller = WorkflowController::new(SessionContext::anonymous(), Box::new(DiscardHistory));

    let text_size = settings.into_runtime(&mut controller);
    assert_eq!(text_size, MAX_TEXT_SIZE);
    assert_eq!(
        controller.metrics().get(MetricId::Creativity).display_model().as_str(),
        "claude-3"
    );

    let saved = PersistedAnnotatorSettings::from_runtime(&controller, 14.0);
    assert_eq!(saved.text_size, 14.0);
    assert_eq!(saved.models.len(), MetricId::ALL.len());
}

#[test]
fn submit_queues_an_annotation_request() {
    let (mut app, cmd_rx, _ui_tx) = app_with_queue(4);
    type_text(&mut app, "The sky is blue. Water boils at 100C.");

    app.submit();

    assert_eq!(app.controller.state(), WorkflowState::Analyzing);
    assert_eq!(app.status, "Analyzing...");
    match cmd_rx.try_recv().expect("queued command") {
        BackendCommand::Execute(OutgoingRequest::Annotate { request, .. }) => {
            assert_eq!(request.text, "The sky is blue. Water boils at 100C.");
            assert_eq!(request.models.len(), MetricId::ALL.len());
        }
        other => panic!("unexpected command {}", other.name()),
    }
}

#[test]
fn blank_submit_shows_an_inline_error() {
    let (mut app, cmd_rx, _ui_tx) = app_with_queue(4);
    type_text(&mut app, "   ");

    app.submit();

    assert_eq!(app.controller.state(), WorkflowState::Idle);
    let err = app.inline_error.as_ref().expect("inline error");
    assert_eq!(err.category(), UiErrorCategory::Validation);
    assert!(cmd_rx.try_recv().is_err());
}

#[test]
fn unqueued_request_rolls_the_workflow_back() {
    let (mut app, cmd_rx, _ui_tx) = app_with_queue(4);
    drop(cmd_rx);
    type_text(&mut app, "The sky is blue.");

    app.submit();

    assert_eq!(app.controller.state(), WorkflowState::Idle);
    assert_eq!(app.editor_text, "The sky is blue.");
    let banner = app.status_banner.as_ref().expect("banner");
    assert!(banner.message.contains("disconnected"));
}

#[test]
fn completion_events_drive_the_editor() {
    let (mut app, cmd_rx, ui_tx) = app_with_queue(4);
    type_text(&mut app, "The sky is blue. Water boils at 100C.");
    app.submit();
    let Ok(BackendCommand::Execute(request)) = cmd_rx.try_recv() else {
        panic!("expected an execute command");
    };

    ui_tx
        .send(UiEvent::Completion(Completion::Annotation {
            ticket: request.ticket(),
            result: Ok(annotate_response()),
        }))
        .expect("send");
    app.process_ui_events();
    assert_eq!(app.controller.state(), WorkflowState::Annotated);
    assert_eq!(app.controller.segments().len(), 2);
    assert_eq!(app.controller.metrics().get(MetricId::Factual).score(), 90);

    app.instruction_text = "make it shorter".into();
    app.edit_instruction();
    app.submit();
    let Ok(BackendCommand::Execute(request)) = cmd_rx.try_recv() else {
        panic!("expected a refine command");
    };
    ui_tx
        .send(UiEvent::Completion(Completion::Refinement {
            ticket: request.ticket(),
            result: Ok(RefineResponse {
                enhanced_text: "Sky: blue. Water: 100C.".into(),
            }),
        }))
        .expect("send");
    app.process_ui_events();

    assert_eq!(app.controller.state(), WorkflowState::Idle);
    assert_eq!(app.editor_text, "Sky: blue. Water: 100C.");
    assert!(app.instruction_text.is_empty());
    assert!(app.controller.segments().is_empty());
}

#[test]
fn service_failure_raises_a_banner() {
    let (mut app, cmd_rx, ui_tx) = app_with_queue(4);
    type_text(&mut app, "The sky is blue.");
    app.submit();
    let Ok(BackendCommand::Execute(request)) = cmd_rx.try_recv() else {
        panic!("expected an execute command");
    };

    ui_tx
        .send(UiEvent::Completion(
            request.undelivered("connection refused"),
        ))
        .expect("send");
    app.process_ui_events();

    assert_eq!(app.controller.state(), WorkflowState::Idle);
    assert!(app
        .status_banner
        .as_ref()
        .is_some_and(|banner| banner.message.starts_with("Transport error")));
}

#[test]
fn stale_completion_after_clear_is_silent() {
    let (mut app, cmd_rx, ui_tx) = app_with_queue(4);
    type_text(&mut app, "The sky is blue.");
    app.submit();
    let Ok(BackendCommand::Execute(request)) = cmd_rx.try_recv() else {
        panic!("expected an execute command");
    };
    app.clear();

    ui_tx
        .send(UiEvent::Completion(Completion::Annotation {
            ticket: request.ticket(),
            result: Err(ServiceError::Transport("late".into())),
        }))
        .expect("send");
    app.process_ui_events();

    assert_eq!(app.controller.state(), WorkflowState::Idle);
    assert!(app.status_banner.is_none());
    assert!(app.editor_text.is_empty());
}

#[test]
fn format_normalizes_the_editor_text() {
    let (mut app, _cmd_rx, _ui_tx) = app_with_queue(4);
    type_text(&mut app, "Hello ,  world!How are you ?");

    app.format_text();

    assert_eq!(app.controller.text(), "Hello, world! How are you?");
    assert_eq!(app.editor_text, app.controller.text());
}

#[test]
fn opening_history_restores_the_text() {
    let (mut app, _cmd_rx, _ui_tx) = app_with_queue(4);
    app.view = AppView::History;
    let record = HistoryRecord {
        id: uuid::Uuid::new_v4(),
        kind: HistoryKind::Analysis,
        title: "Sky: blue.".into(),
        content: "Sky: blue.".into(),
        original_text: "The sky is blue.".into(),
        instruction: Some("make it shorter".into()),
        models: BTreeMap::new(),
        created_at: chrono::Utc::now(),
    };

    app.open_history_record(&record);

    assert_eq!(app.view, AppView::Analyze);
    assert_eq!(app.controller.text(), "Sky: blue.");
    assert_eq!(app.editor_text, "Sky: blue.");
}

#[test]
fn history_changes_reload_only_the_visible_list() {
    let (mut app, cmd_rx, ui_tx) = app_with_queue(4);
    app.history.loaded = true;
    ui_tx.send(UiEvent::HistoryChanged).expect("send");
    app.process_ui_events();
    assert!(!app.history.loaded);
    assert!(cmd_rx.try_recv().is_err());

    app.view = AppView::History;
    app.history.query = "sky".into();
    app.history.kind = Some(HistoryKind::Analysis);
    ui_tx.send(UiEvent::HistoryChanged).expect("send");
    app.process_ui_events();
    match cmd_rx.try_recv().expect("list command") {
        BackendCommand::ListHistory(filter) => {
            assert_eq!(filter, HistoryFilter::kind(HistoryKind::Analysis).search("sky"));
        }
        other => panic!("unexpected command {}", other.name()),
    }
}
