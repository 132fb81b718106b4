//! Failure taxonomy for the annotation workflow.

use shared::error::ErrorCode;
use thiserror::Error;

use crate::workflow::{RequestTicket, WorkflowState};

/// Rejected before any request leaves the client. Never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some text to analyze.")]
    EmptyText,
    #[error("Instruction is required.")]
    EmptyInstruction,
    #[error("missing user identity; sign in before submitting")]
    MissingIdentity,
    #[error("a request is already in flight ({state:?}); wait for it to finish")]
    WorkflowBusy { state: WorkflowState },
}

/// Non-2xx, undecodable or unreachable annotation/refinement backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service returned {status} ({code:?}): {message}")]
    Server {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("malformed service response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Malformed(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Result for a request the controller no longer expects. Dropped silently.
    #[error("discarded stale response for request {ticket} (controller is {state:?})")]
    Stale {
        ticket: RequestTicket,
        state: WorkflowState,
    },
}

impl WorkflowError {
    pub fn is_stale(&self) -> bool {
        matches!(self, WorkflowError::Stale { .. })
    }

    /// Stale responses are never shown to the user.
    pub fn is_user_visible(&self) -> bool {
        !self.is_stale()
    }
}
