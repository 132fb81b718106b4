//! Annotation and refinement backends.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::{ApiError, ApiException},
    protocol::{AnnotateRequest, AnnotateResponse, RefineRequest, RefineResponse},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::ServiceError,
    session::SessionContext,
    workflow::{Completion, OutgoingRequest},
};

pub const DEFAULT_ANNOTATE_PATH: &str = "analysis/annotate";
pub const DEFAULT_REFINE_PATH: &str = "analysis/refine";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait AnnotationService: Send + Sync {
    async fn annotate(&self, request: AnnotateRequest) -> Result<AnnotateResponse, ServiceError>;
}

#[async_trait]
pub trait RefinementService: Send + Sync {
    async fn refine(&self, request: RefineRequest) -> Result<RefineResponse, ServiceError>;
}

/// JSON-over-HTTP client for both backends.
#[derive(Clone)]
pub struct HttpServiceClient {
    http: Client,
    base_url: Url,
    annotate_path: String,
    refine_path: String,
    access_token: Option<String>,
}

impl HttpServiceClient {
    pub fn new(base_url: &str, session: &SessionContext, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url.trim()).with_context(|| format!("invalid service url '{base_url}'"))?;
        // Relative joins replace the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url,
            annotate_path: DEFAULT_ANNOTATE_PATH.to_string(),
            refine_path: DEFAULT_REFINE_PATH.to_string(),
            access_token: session.access_token().map(str::to_string),
        })
    }

    pub fn with_paths(mut self, annotate_path: &str, refine_path: &str) -> Self {
        self.annotate_path = annotate_path.trim_start_matches('/').to_string();
        self.refine_path = refine_path.trim_start_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|err| ServiceError::Transport(format!("invalid endpoint '{path}': {err}")))
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let mut request = self.http.post(url.clone()).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body: ApiError = serde_json::from_slice(&bytes).unwrap_or(ApiError {
                code: None,
                message: None,
            });
            let exception = ApiException::from_body(status.as_u16(), &body);
            warn!(%url, status = status.as_u16(), message = %exception.message, "service returned an error");
            return Err(ServiceError::Server {
                status: status.as_u16(),
                code: exception.code,
                message: exception.message,
            });
        }

        debug!(%url, bytes = bytes.len(), "service response received");
        serde_json::from_slice(&bytes).map_err(|err| ServiceError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl AnnotationService for HttpServiceClient {
    async fn annotate(&self, request: AnnotateRequest) -> Result<AnnotateResponse, ServiceError> {
        self.post_json(&self.annotate_path, &request).await
    }
}

#[async_trait]
impl RefinementService for HttpServiceClient {
    async fn refine(&self, request: RefineRequest) -> Result<RefineResponse, ServiceError> {
        self.post_json(&self.refine_path, &request).await
    }
}

/// Runs one outgoing request and packages the result for the controller.
pub async fn execute<S>(services: &S, request: OutgoingRequest) -> Completion
where
    S: AnnotationService + RefinementService + ?Sized,
{
    let ticket = request.ticket();
    let operation = request.operation();
    let started = Instant::now();

    let completion = match request {
        OutgoingRequest::Annotate { request, .. } => Completion::Annotation {
            ticket,
            result: services.annotate(request).await,
        },
        OutgoingRequest::Refine { request, .. } => Completion::Refinement {
            ticket,
            result: services.refine(request).await,
        },
    };

    let ok = match &completion {
        Completion::Annotation { result, .. } => result.is_ok(),
        Completion::Refinement { result, .. } => result.is_ok(),
    };
    info!(
        %ticket,
        operation,
        ok,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "service call finished"
    );
    completion
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
