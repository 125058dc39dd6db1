//! Report generation trigger and progress queries

use std::sync::Arc;

use pms_domain::{
    PmsError, ReportGenerationStatus, ReportRecord, ReportState, Result, WorkflowRequest,
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::ports::{ReportRepository, WizardSource, WorkflowEngine};
use super::status::{estimate_remaining, parse_status, GENERATION_STEPS};

/// Status text written when a report is handed to the workflow engine.
fn initial_status_text() -> String {
    format!("Step 1 {} - In Progress", GENERATION_STEPS[0])
}

/// Progress snapshot of one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportProgress {
    pub report_id: String,
    pub state: ReportState,
    pub status: ReportGenerationStatus,
    /// Human-readable time left.
    pub estimate: String,
}

/// Creates reports from wizard submissions and drives them through the
/// external workflow engine.
pub struct ReportGenerationService {
    wizards: Arc<dyn WizardSource>,
    reports: Arc<dyn ReportRepository>,
    engine: Arc<dyn WorkflowEngine>,
}

impl ReportGenerationService {
    pub fn new(
        wizards: Arc<dyn WizardSource>,
        reports: Arc<dyn ReportRepository>,
        engine: Arc<dyn WorkflowEngine>,
    ) -> Self {
        Self { wizards, reports, engine }
    }

    /// Generate a report for a wizard.
    ///
    /// Creates a `pending` row, forwards wizard and user data to the workflow
    /// engine and waits for it. On success the row is `completed` and
    /// returned; on failure, including a failure to store the finished
    /// report, it is marked `failed` and that error is returned.
    #[instrument(skip(self))]
    pub async fn trigger_report(&self, wizard_id: &str) -> Result<ReportRecord> {
        if wizard_id.trim().is_empty() {
            return Err(PmsError::InvalidInput("wizard id must not be empty".into()));
        }

        let wizard = self.wizards.load_wizard(wizard_id).await?;
        let record = self.reports.create_pending(wizard_id).await?;
        info!(report_id = %record.id, wizard_id, "Report created, starting workflow");

        if let Err(err) = self.reports.update_status_text(&record.id, &initial_status_text()).await {
            warn!(report_id = %record.id, error = %err, "Failed to write initial generation status");
        }

        let request = WorkflowRequest {
            report_id: record.id.clone(),
            wizard_id: wizard.wizard_id,
            wizard_data: wizard.data,
            user_data: wizard.user,
        };

        let failure = match self.engine.run_report(&request).await {
            Ok(outcome) if outcome.success => {
                let payload = outcome.report_data.unwrap_or(Value::Null);
                match self.reports.mark_completed(&record.id, payload).await {
                    Ok(completed) => {
                        info!(report_id = %completed.id, "Report generation completed");
                        return Ok(completed);
                    }
                    Err(err) => err,
                }
            }
            Ok(outcome) => PmsError::Remote {
                status: 200,
                message: outcome.message.unwrap_or_else(|| "workflow reported failure".to_string()),
            },
            Err(err) => err,
        };

        error!(report_id = %record.id, error = %failure, "Report generation failed");
        if let Err(mark_err) = self.reports.mark_failed(&record.id, &failure.to_string()).await {
            error!(report_id = %record.id, error = %mark_err, "Failed to mark report as failed");
        }
        Err(failure)
    }

    /// Current progress of a report, derived from its state and status text.
    #[instrument(skip(self))]
    pub async fn report_progress(&self, report_id: &str) -> Result<ReportProgress> {
        let record = self.reports.fetch_report(report_id).await?;
        let status = progress_of(&record);

        Ok(ReportProgress {
            report_id: record.id,
            state: record.status,
            estimate: estimate_remaining(&status),
            status,
        })
    }
}

fn progress_of(record: &ReportRecord) -> ReportGenerationStatus {
    match (record.status, record.generation_status.as_deref()) {
        (ReportState::Completed, _) => ReportGenerationStatus::completed(),
        (ReportState::Failed, text) => {
            let parsed = parse_status(text);
            if parsed.has_failed() {
                return parsed;
            }
            // The engine gave up without reporting a step; fail the step that
            // was running, or the first one.
            let step = parsed
                .in_progress
                .unwrap_or_else(|| usize::try_from(parsed.last_completed + 1).unwrap_or(0))
                .min(GENERATION_STEPS.len() - 1);
            ReportGenerationStatus { last_completed: step as i32 - 1, failed: Some(step), in_progress: None }
        }
        (_, text) => parse_status(text),
    }
}
