//! Backend-to-UI events and error modeling for the desktop GUI.

use std::path::PathBuf;

use client_core::{Completion, ServiceError, ValidationError};
use shared::{error::ErrorCode, protocol::HistoryRecord};

pub enum UiEvent {
    Info(String),
    Error(UiError),
    Completion(Completion),
    HistoryLoaded(Vec<HistoryRecord>),
    /// A save, delete or clear went through; the list should be reloaded.
    HistoryChanged,
    Exported(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Analysis,
    Refinement,
    History,
    Export,
    General,
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Auth => "Authentication",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("403")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("session expired")
            || message_lower.contains("invalid token")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("required")
            || message_lower.contains("please enter")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_service(context: UiErrorContext, err: &ServiceError) -> Self {
        match err {
            ServiceError::Server {
                code: ErrorCode::Unauthorized | ErrorCode::Forbidden,
                message,
                ..
            } => Self {
                category: UiErrorCategory::Auth,
                context,
                message: message.clone(),
            },
            ServiceError::Server { message, .. } => Self::from_message(context, message.clone()),
            ServiceError::Transport(_) => Self {
                category: UiErrorCategory::Transport,
                context,
                message: err.to_string(),
            },
            ServiceError::Malformed(_) => Self {
                category: UiErrorCategory::Validation,
                context,
                message: err.to_string(),
            },
        }
    }

    pub fn from_validation(err: &ValidationError) -> Self {
        Self {
            category: UiErrorCategory::Validation,
            context: UiErrorContext::General,
            message: err.to_string(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
