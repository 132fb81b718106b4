use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{MetricId, ModelId, UserId},
    error::{ErrorCode, FALLBACK_ERROR_MESSAGE},
    protocol::RefineSegment,
};
use tokio::net::TcpListener;

use super::*;
use crate::{
    history::RecordingHistory,
    workflow::{Submission, WorkflowController},
};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Captured {
    fn take(&self) -> Vec<(Option<String>, Value)> {
        self.requests.lock().expect("lock").drain(..).collect()
    }
}

fn record(state: &Captured, headers: &HeaderMap, body: Value) {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().expect("lock").push((auth, body));
}

async fn handle_annotate(
    State(state): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, &headers, body);
    Json(json!({
        "analysis": [
            {"text": "The sky is blue. ", "type": "factual"},
            {"text": "Water boils at 100C.", "type": "factual"}
        ],
        "percentages": {
            "reasoning": 70, "factual": 90, "creativity": 40,
            "conciseness": 85, "relevance": 60
        },
        "models": {"factual": "gpt-4o"}
    }))
}

async fn handle_refine(
    State(state): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, &headers, body);
    Json(json!({"enhancedText": "Sky: blue. Water: 100C."}))
}

async fn spawn_service(prefix: &str) -> (String, Captured) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = Captured::default();
    let app = Router::new()
        .route(&format!("{prefix}/analysis/annotate"), post(handle_annotate))
        .route(&format!("{prefix}/analysis/refine"), post(handle_refine))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}{prefix}"), state)
}

async fn spawn_fixed(status: StatusCode, body: &'static str) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let reply = move || async move {
        (status, [("content-type", "application/json")], body).into_response()
    };
    let app = Router::new()
        .route("/analysis/annotate", post(reply))
        .route("/analysis/refine", post(reply));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn annotate_request() -> AnnotateRequest {
    AnnotateRequest {
        user_id: UserId::new("user-42").expect("user"),
        text: "The sky is blue. Water boils at 100C.".into(),
        models: MetricId::ALL
            .into_iter()
            .map(|metric| (metric, ModelId::new("claude")))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn client(base_url: &str, session: &SessionContext) -> HttpServiceClient {
    HttpServiceClient::new(base_url, session, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn annotate_posts_camel_case_payload_with_bearer_token() {
    let (base_url, captured) = spawn_service("").await;
    let session = SessionContext::for_user("user-42").with_access_token("secret-token");

    let response = client(&base_url, &session)
        .annotate(annotate_request())
        .await
        .expect("annotate");

    assert_eq!(response.analysis.len(), 2);
    assert_eq!(response.percentages["factual"], 90.0);
    assert_eq!(response.models["factual"], "gpt-4o");

    let requests = captured.take();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer secret-token"));
    assert_eq!(body["userId"], "user-42");
    assert_eq!(body["models"]["relevance"], "claude-3");
    assert_eq!(body["text"], "The sky is blue. Water boils at 100C.");
}

#[tokio::test]
async fn anonymous_session_sends_no_authorization_header() {
    let (base_url, captured) = spawn_service("/api").await;
    let _ = client(&base_url, &SessionContext::anonymous())
        .annotate(annotate_request())
        .await
        .expect("annotate");

    let requests = captured.take();
    assert_eq!(requests[0].0, None);
}

#[tokio::test]
async fn base_url_path_prefix_is_preserved() {
    let (base_url, captured) = spawn_service("/v1").await;
    let response = client(&base_url, &SessionContext::for_user("user-42"))
        .refine(RefineRequest {
            user_id: UserId::new("user-42").expect("user"),
            full_text: "The sky is blue.".into(),
            instruction: "make it shorter".into(),
            segments: vec![RefineSegment {
                text: "The sky is blue.".into(),
                kind: MetricId::Factual,
                model: ModelId::new("gpt-4o"),
            }],
        })
        .await
        .expect("refine");

    assert_eq!(response.enhanced_text, "Sky: blue. Water: 100C.");
    let requests = captured.take();
    let body = &requests[0].1;
    assert_eq!(body["fullText"], "The sky is blue.");
    assert_eq!(body["segments"][0]["type"], "factual");
    assert_eq!(body["segments"][0]["model"], "gpt-4o");
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let base_url = spawn_fixed(
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"message":"Daily analysis limit reached"}"#,
    )
    .await;

    let err = client(&base_url, &SessionContext::for_user("user-42"))
        .annotate(annotate_request())
        .await
        .expect_err("rate limited");

    assert_eq!(
        err,
        ServiceError::Server {
            status: 429,
            code: ErrorCode::RateLimited,
            message: "Daily analysis limit reached".into(),
        }
    );
}

#[tokio::test]
async fn unlisted_error_code_still_surfaces_the_message() {
    let base_url = spawn_fixed(
        StatusCode::BAD_REQUEST,
        r#"{"code":"text_too_long","message":"Text exceeds 10000 characters"}"#,
    )
    .await;

    let err = client(&base_url, &SessionContext::for_user("user-42"))
        .annotate(annotate_request())
        .await
        .expect_err("server error");

    assert_eq!(
        err,
        ServiceError::Server {
            status: 400,
            code: ErrorCode::Validation,
            message: "Text exceeds 10000 characters".into(),
        }
    );
}

#[tokio::test]
async fn error_without_message_falls_back_to_generic_text() {
    let base_url = spawn_fixed(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").await;

    let err = client(&base_url, &SessionContext::for_user("user-42"))
        .annotate(annotate_request())
        .await
        .expect_err("server error");

    match err {
        ServiceError::Server { status, code, message } => {
            assert_eq!(status, 500);
            assert_eq!(code, ErrorCode::Internal);
            assert_eq!(message, FALLBACK_ERROR_MESSAGE);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_body_is_malformed() {
    let base_url = spawn_fixed(StatusCode::OK, r#"{"enhanced": 12}"#).await;

    let err = client(&base_url, &SessionContext::for_user("user-42"))
        .refine(RefineRequest {
            user_id: UserId::new("user-42").expect("user"),
            full_text: "text".into(),
            instruction: "shorter".into(),
            segments: Vec::new(),
        })
        .await
        .expect_err("malformed");

    assert!(matches!(err, ServiceError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}"), &SessionContext::for_user("user-42"))
        .annotate(annotate_request())
        .await
        .expect_err("refused");

    assert!(matches!(err, ServiceError::Transport(_)));
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = HttpServiceClient::new(
        "not a url",
        &SessionContext::anonymous(),
        DEFAULT_REQUEST_TIMEOUT,
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn execute_drives_a_full_annotate_and_refine_cycle() {
    let (base_url, captured) = spawn_service("").await;
    let session = SessionContext::for_user("user-42");
    let services = client(&base_url, &session);
    let history = RecordingHistory::new();
    let mut controller = WorkflowController::new(session, Box::new(history.clone()));

    controller
        .edit_text("The sky is blue. Water boils at 100C.")
        .expect("edit");
    let Submission::Dispatched(request) = controller.submit().expect("submit") else {
        panic!("annotation not dispatched");
    };
    assert!(matches!(request, OutgoingRequest::Annotate { .. }));
    let completion = execute(&services, request).await;
    controller.complete(completion).expect("annotation applied");
    assert_eq!(controller.metrics().get(MetricId::Factual).score(), 90);

    controller.set_instruction("make it shorter").expect("instruction");
    let Submission::Dispatched(request) = controller.submit().expect("submit") else {
        panic!("refinement not dispatched");
    };
    let completion = execute(&services, request).await;
    controller.complete(completion).expect("refinement applied");

    assert_eq!(controller.text(), "Sky: blue. Water: 100C.");
    assert_eq!(history.records().len(), 1);
    assert_eq!(captured.take().len(), 2);
}
