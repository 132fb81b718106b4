pub mod error;
pub mod history;
pub mod instructions;
pub mod metrics;
pub mod segment;
pub mod services;
pub mod session;
pub mod text;
pub mod workflow;

pub use error::{ServiceError, ValidationError, WorkflowError};
pub use history::{DiscardHistory, HistorySink, RecordingHistory};
pub use metrics::{Metric, MetricRegistry};
pub use segment::Segment;
pub use services::{execute, AnnotationService, HttpServiceClient, RefinementService};
pub use session::SessionContext;
pub use workflow::{
    Applied, Completion, OutgoingRequest, RefinementOutcome, RequestTicket, Submission,
    WorkflowController, WorkflowState,
};
