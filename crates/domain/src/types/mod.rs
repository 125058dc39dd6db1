//! Domain types and models

pub mod fallback;
pub mod report;

pub use fallback::{
    ExpectedType, FallbackParams, FallbackRequest, FallbackResponse, FallbackSource, FieldConfig,
    SearchStrategy,
};
pub use report::{
    ReportGenerationStatus, ReportRecord, ReportState, StepState, WizardSubmission,
    WorkflowOutcome, WorkflowRequest,
};
