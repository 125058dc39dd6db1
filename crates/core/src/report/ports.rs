//! Port interfaces for report generation

use async_trait::async_trait;
use pms_domain::{ReportRecord, Result, WizardSubmission, WorkflowOutcome, WorkflowRequest};
use serde_json::Value;

/// Source of completed intake wizards.
#[async_trait]
pub trait WizardSource: Send + Sync {
    /// Wizard answers plus the owning user's profile.
    async fn load_wizard(&self, wizard_id: &str) -> Result<WizardSubmission>;
}

/// Durable store of report rows.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a new row in the `pending` state.
    async fn create_pending(&self, wizard_id: &str) -> Result<ReportRecord>;

    async fn update_status_text(&self, report_id: &str, status_text: &str) -> Result<()>;

    /// Store the generated payload and move the row to `completed`.
    async fn mark_completed(&self, report_id: &str, report_data: Value) -> Result<ReportRecord>;

    /// Move the row to `failed` with a reason.
    async fn mark_failed(&self, report_id: &str, reason: &str) -> Result<ReportRecord>;

    async fn fetch_report(&self, report_id: &str) -> Result<ReportRecord>;
}

/// External engine producing report content.
///
/// The call is synchronous from the caller's point of view: it returns once
/// the engine has finished or given up.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn run_report(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome>;
}
