//! Idle → Analyzing → Annotated → Refining → Idle state machine.
//!
//! The controller is synchronous and single-writer: it owns the canonical
//! text, the pending instruction, the segment list and the metric registry.
//! Outbound work leaves as an [`OutgoingRequest`] carrying a
//! [`RequestTicket`]; results come back through [`WorkflowController::complete`].
//! A result is applied only while the controller is still waiting on that
//! exact ticket in the state that issued it.

use std::{fmt, mem};

use chrono::Utc;
use serde::Serialize;
use shared::{
    domain::{HistoryKind, MetricId},
    protocol::{
        AnnotateRequest, AnnotateResponse, HistoryRecord, RefineRequest, RefineResponse,
        RefineSegment,
    },
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{ServiceError, ValidationError, WorkflowError},
    history::HistorySink,
    metrics::MetricRegistry,
    segment::{build_from_sentences, segments_from_analysis, Segment},
    session::SessionContext,
    text::title_from_text,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestTicket(u64);

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowState {
    Idle,
    Analyzing,
    Annotated,
    /// Annotated with a non-blank instruction being composed.
    Instructing,
    Refining,
}

impl WorkflowState {
    pub fn is_busy(self) -> bool {
        matches!(self, WorkflowState::Analyzing | WorkflowState::Refining)
    }

    pub fn is_annotated(self) -> bool {
        matches!(self, WorkflowState::Annotated | WorkflowState::Instructing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Analyzing,
    Annotated,
    Refining,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingRequest {
    Annotate {
        ticket: RequestTicket,
        request: AnnotateRequest,
    },
    Refine {
        ticket: RequestTicket,
        request: RefineRequest,
    },
}

impl OutgoingRequest {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            OutgoingRequest::Annotate { ticket, .. } | OutgoingRequest::Refine { ticket, .. } => {
                *ticket
            }
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            OutgoingRequest::Annotate { .. } => "annotate",
            OutgoingRequest::Refine { .. } => "refine",
        }
    }

    /// Completion for a request that never reached the service.
    pub fn undelivered(&self, reason: impl Into<String>) -> Completion {
        let error = ServiceError::Transport(reason.into());
        match self {
            OutgoingRequest::Annotate { ticket, .. } => Completion::Annotation {
                ticket: *ticket,
                result: Err(error),
            },
            OutgoingRequest::Refine { ticket, .. } => Completion::Refinement {
                ticket: *ticket,
                result: Err(error),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Dispatched(OutgoingRequest),
    /// A request is already in flight; nothing was sent.
    Ignored { state: WorkflowState },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Annotation {
        ticket: RequestTicket,
        result: Result<AnnotateResponse, ServiceError>,
    },
    Refinement {
        ticket: RequestTicket,
        result: Result<RefineResponse, ServiceError>,
    },
}

impl Completion {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            Completion::Annotation { ticket, .. } | Completion::Refinement { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutcome {
    pub ticket: RequestTicket,
    pub record: HistoryRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Annotated {
        segments: usize,
        /// Service segments did not cover the text; local segmentation was used.
        fallback: bool,
    },
    Refined(RefinementOutcome),
}

pub struct WorkflowController {
    session: SessionContext,
    history: Box<dyn HistorySink>,
    phase: Phase,
    text: String,
    instruction: String,
    segments: Vec<Segment>,
    metrics: MetricRegistry,
    next_ticket: u64,
    in_flight: Option<RequestTicket>,
    last_result: Option<RefinementOutcome>,
}

impl WorkflowController {
    pub fn new(session: SessionContext, history: Box<dyn HistorySink>) -> Self {
        Self {
            session,
            history,
            phase: Phase::Idle,
            text: String::new(),
            instruction: String::new(),
            segments: Vec::new(),
            metrics: MetricRegistry::new(),
            next_ticket: 1,
            in_flight: None,
            last_result: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        match self.phase {
            Phase::Idle => WorkflowState::Idle,
            Phase::Analyzing => WorkflowState::Analyzing,
            Phase::Annotated if self.instruction.trim().is_empty() => WorkflowState::Annotated,
            Phase::Annotated => WorkflowState::Instructing,
            Phase::Refining => WorkflowState::Refining,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn instruction_pending(&self) -> bool {
        self.state() == WorkflowState::Instructing
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn metrics(&self) -> &MetricRegistry {
        &self.metrics
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }

    /// Most recent successful refinement, kept until the next analysis or clear.
    pub fn last_result(&self) -> Option<&RefinementOutcome> {
        self.last_result.as_ref()
    }

    /// Replaces the canonical text. In Annotated, a changed text drops the
    /// segments right away since they no longer cover it.
    pub fn edit_text(&mut self, text: impl Into<String>) -> Result<(), ValidationError> {
        self.ensure_not_busy()?;
        let text = text.into();
        if text == self.text {
            return Ok(());
        }
        if self.phase == Phase::Annotated && !self.segments.is_empty() {
            debug!(segments = self.segments.len(), "text edited; invalidating segments");
            self.segments.clear();
        }
        self.text = text;
        Ok(())
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) -> Result<(), ValidationError> {
        self.ensure_not_busy()?;
        self.instruction = instruction.into();
        Ok(())
    }

    pub fn set_model(&mut self, metric: MetricId, raw_model: &str) -> Result<(), ValidationError> {
        self.ensure_not_busy()?;
        self.metrics.set_model(metric, raw_model);
        Ok(())
    }

    /// Idle: starts an analysis. Annotated: sends the instruction for refinement.
    /// While a request is in flight this is a no-op.
    pub fn submit(&mut self) -> Result<Submission, ValidationError> {
        match self.phase {
            Phase::Analyzing | Phase::Refining => {
                debug!(state = ?self.state(), "submit ignored while a request is in flight");
                Ok(Submission::Ignored {
                    state: self.state(),
                })
            }
            Phase::Idle => self.submit_analysis(),
            Phase::Annotated => self.submit_instruction(),
        }
    }

    /// Discards text, segments, instruction and any in-flight ticket; resets scores.
    pub fn clear(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            info!(%ticket, "clearing session with a request in flight; its result will be dropped");
        }
        self.phase = Phase::Idle;
        self.text.clear();
        self.instruction.clear();
        self.segments.clear();
        self.metrics.reset_scores();
        self.last_result = None;
    }

    /// Clears the session and starts over from `text` (e.g. a history entry).
    pub fn restore(&mut self, text: impl Into<String>) {
        self.clear();
        self.text = text.into();
    }

    pub fn complete(&mut self, completion: Completion) -> Result<Applied, WorkflowError> {
        match completion {
            Completion::Annotation { ticket, result } => self.apply_annotation(ticket, result),
            Completion::Refinement { ticket, result } => self.apply_refinement(ticket, result),
        }
    }

    fn submit_analysis(&mut self) -> Result<Submission, ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let user_id = self.session.require_user()?.clone();

        let ticket = self.issue_ticket();
        self.segments.clear();
        self.instruction.clear();
        self.last_result = None;
        self.phase = Phase::Analyzing;
        self.in_flight = Some(ticket);

        let request = AnnotateRequest {
            user_id,
            text: self.text.clone(),
            models: self.metrics.model_assignments(),
        };
        info!(%ticket, chars = self.text.chars().count(), "analysis requested");
        Ok(Submission::Dispatched(OutgoingRequest::Annotate {
            ticket,
            request,
        }))
    }

    fn submit_instruction(&mut self) -> Result<Submission, ValidationError> {
        let instruction = self.instruction.trim();
        if instruction.is_empty() {
            return Err(ValidationError::EmptyInstruction);
        }
        let user_id = self.session.require_user()?.clone();

        let segments = self
            .segments
            .iter()
            .map(|segment| RefineSegment {
                text: segment.text().to_string(),
                kind: segment.metric(),
                model: self.metrics.get(segment.metric()).display_model(),
            })
            .collect::<Vec<_>>();
        let request = RefineRequest {
            user_id,
            full_text: self.text.clone(),
            instruction: instruction.to_string(),
            segments,
        };

        let ticket = self.issue_ticket();
        self.phase = Phase::Refining;
        self.in_flight = Some(ticket);
        info!(%ticket, segments = request.segments.len(), "refinement requested");
        Ok(Submission::Dispatched(OutgoingRequest::Refine { ticket, request }))
    }

    fn apply_annotation(
        &mut self,
        ticket: RequestTicket,
        result: Result<AnnotateResponse, ServiceError>,
    ) -> Result<Applied, WorkflowError> {
        self.expect_in_flight(ticket, Phase::Analyzing)?;
        self.in_flight = None;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(%ticket, error = %err, "analysis failed");
                self.phase = Phase::Idle;
                return Err(err.into());
            }
        };

        if let Err(err) = self.metrics.apply_scores(&response.percentages) {
            warn!(%ticket, error = %err, "analysis response rejected");
            self.phase = Phase::Idle;
            return Err(ServiceError::Malformed(err.to_string()).into());
        }
        self.metrics.apply_models(&response.models);

        let (segments, fallback) = match segments_from_analysis(&response.analysis, &self.text) {
            Ok(segments) => (segments, false),
            Err(err) => {
                warn!(%ticket, error = %err, "using sentence segmentation instead of service segments");
                (build_from_sentences(&self.text), true)
            }
        };
        self.segments = segments;
        self.phase = Phase::Annotated;
        info!(%ticket, segments = self.segments.len(), fallback, "analysis applied");

        Ok(Applied::Annotated {
            segments: self.segments.len(),
            fallback,
        })
    }

    fn apply_refinement(
        &mut self,
        ticket: RequestTicket,
        result: Result<RefineResponse, ServiceError>,
    ) -> Result<Applied, WorkflowError> {
        self.expect_in_flight(ticket, Phase::Refining)?;
        self.in_flight = None;

        let enhanced_text = match result {
            Ok(response) if !response.enhanced_text.trim().is_empty() => response.enhanced_text,
            Ok(_) => {
                warn!(%ticket, "refinement returned empty text");
                self.phase = Phase::Annotated;
                return Err(ServiceError::Malformed("refinement returned empty text".into()).into());
            }
            Err(err) => {
                warn!(%ticket, error = %err, "refinement failed; keeping instruction and segments");
                self.phase = Phase::Annotated;
                return Err(err.into());
            }
        };

        let record = HistoryRecord {
            id: Uuid::new_v4(),
            kind: HistoryKind::Analysis,
            title: title_from_text(&enhanced_text),
            content: enhanced_text.clone(),
            original_text: mem::replace(&mut self.text, enhanced_text),
            instruction: Some(mem::take(&mut self.instruction)),
            models: self.metrics.model_assignments(),
            created_at: Utc::now(),
        };
        self.segments.clear();
        self.phase = Phase::Idle;

        self.history.save(record.clone());
        info!(%ticket, record_id = %record.id, "refinement applied; saved to history");

        let outcome = RefinementOutcome { ticket, record };
        self.last_result = Some(outcome.clone());
        Ok(Applied::Refined(outcome))
    }

    fn expect_in_flight(&self, ticket: RequestTicket, phase: Phase) -> Result<(), WorkflowError> {
        if self.in_flight == Some(ticket) && self.phase == phase {
            return Ok(());
        }
        debug!(%ticket, state = ?self.state(), "dropping stale response");
        Err(WorkflowError::Stale {
            ticket,
            state: self.state(),
        })
    }

    fn ensure_not_busy(&self) -> Result<(), ValidationError> {
        let state = self.state();
        if state.is_busy() {
            Err(ValidationError::WorkflowBusy { state })
        } else {
            Ok(())
        }
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
