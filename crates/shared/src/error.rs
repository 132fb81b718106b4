use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            500..=599 => ErrorCode::Internal,
            _ => ErrorCode::Unknown,
        }
    }
}

pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong";

/// Error body returned by the annotation backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: Option<ErrorCode>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
        }
    }

    pub fn message_or_fallback(&self) -> &str {
        self.message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(FALLBACK_ERROR_MESSAGE)
    }
}

/// Codes this client does not know, or that are not strings, read as absent.
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<ErrorCode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| serde_json::from_value::<ErrorCode>(value).ok())
        .filter(|code| *code != ErrorCode::Unknown))
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiException {
    pub fn from_body(status: u16, body: &ApiError) -> Self {
        Self {
            code: body.code.unwrap_or_else(|| ErrorCode::from_status(status)),
            message: body.message_or_fallback().to_string(),
        }
    }
}
