//! Report records and generation progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{SECONDS_PER_STEP, TOTAL_GENERATION_STEPS};
use crate::impl_wire_enum;

/// Lifecycle state of a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportState {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl_wire_enum!(ReportState {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

impl ReportState {
    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One row of the reports table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: String,
    pub wizard_id: String,
    #[serde(default)]
    pub status: ReportState,
    /// Free-text multi-step status written by the workflow engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ReportRecord {
    /// Fresh record in the `pending` state.
    pub fn pending(id: impl Into<String>, wizard_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            wizard_id: wizard_id.into(),
            status: ReportState::Pending,
            generation_status: None,
            report_data: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Look up a dotted field path inside `report_data`.
    ///
    /// Numeric segments index into arrays (`competitors.0.name`).
    pub fn field(&self, field_path: &str) -> Option<&Value> {
        let mut current = self.report_data.as_ref()?;
        for segment in field_path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Wizard answers plus the submitting user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSubmission {
    pub wizard_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

/// Payload forwarded to the external report workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub report_id: String,
    pub wizard_id: String,
    pub wizard_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
}

/// What the workflow engine answered once it finished.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Display state of one generation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    InProgress,
    Failed,
    Pending,
}

/// Structured progress parsed from a generation status string.
///
/// Indices are 0-based. At most one of `failed` / `in_progress` is set, and
/// `last_completed` is always below the active or failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGenerationStatus {
    /// `-1` when nothing has completed yet.
    pub last_completed: i32,
    pub failed: Option<usize>,
    pub in_progress: Option<usize>,
}

impl ReportGenerationStatus {
    pub const NOT_STARTED: Self = Self { last_completed: -1, failed: None, in_progress: None };

    /// Every step done.
    pub const fn completed() -> Self {
        Self { last_completed: TOTAL_GENERATION_STEPS as i32 - 1, failed: None, in_progress: None }
    }

    pub fn is_complete(&self) -> bool {
        self.last_completed >= TOTAL_GENERATION_STEPS as i32 - 1
    }

    pub fn has_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// Number of steps not yet completed.
    pub fn remaining_steps(&self) -> usize {
        let done = usize::try_from(self.last_completed + 1).unwrap_or(0);
        TOTAL_GENERATION_STEPS.saturating_sub(done)
    }

    /// Completed share of all steps, 0-100.
    pub fn progress_percent(&self) -> u8 {
        let done = TOTAL_GENERATION_STEPS - self.remaining_steps();
        // done <= TOTAL_GENERATION_STEPS so the quotient is at most 100
        u8::try_from(done * 100 / TOTAL_GENERATION_STEPS).unwrap_or(100)
    }

    /// Estimated seconds until completion at a fixed pace per step.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_steps() as u64 * SECONDS_PER_STEP
    }

    /// Per-step display state, one entry per generation step.
    pub fn step_states(&self) -> Vec<StepState> {
        (0..TOTAL_GENERATION_STEPS)
            .map(|index| {
                if self.failed == Some(index) {
                    StepState::Failed
                } else if self.in_progress == Some(index) {
                    StepState::InProgress
                } else if (index as i32) <= self.last_completed {
                    StepState::Completed
                } else {
                    StepState::Pending
                }
            })
            .collect()
    }
}

impl Default for ReportGenerationStatus {
    fn default() -> Self {
        Self::NOT_STARTED
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn step_states_mark_active_step() {
        let status = ReportGenerationStatus { last_completed: 2, failed: None, in_progress: Some(3) };
        let states = status.step_states();

        assert_eq!(states.len(), TOTAL_GENERATION_STEPS);
        assert_eq!(&states[..5], &[
            StepState::Completed,
            StepState::Completed,
            StepState::Completed,
            StepState::InProgress,
            StepState::Pending,
        ]);
    }

    #[test]
    fn remaining_steps_and_progress() {
        assert_eq!(ReportGenerationStatus::NOT_STARTED.remaining_steps(), 11);
        assert_eq!(ReportGenerationStatus::NOT_STARTED.progress_percent(), 0);
        assert_eq!(ReportGenerationStatus::completed().remaining_steps(), 0);
        assert_eq!(ReportGenerationStatus::completed().progress_percent(), 100);
        assert!(ReportGenerationStatus::completed().is_complete());

        let midway = ReportGenerationStatus { last_completed: 4, failed: None, in_progress: Some(5) };
        assert_eq!(midway.remaining_steps(), 6);
        assert_eq!(midway.remaining_seconds(), 90);
        assert_eq!(midway.progress_percent(), 45);
    }

    #[test]
    fn report_state_round_trips_through_serde() {
        let record: ReportRecord = serde_json::from_value(json!({
            "id": "r1",
            "wizard_id": "w1",
            "status": "processing",
            "created_at": "2025-01-01T00:00:00Z"
        }))
        .expect("deserialize");

        assert_eq!(record.status, ReportState::Processing);
        assert!(!record.status.is_terminal());
        assert!(ReportState::Failed.is_terminal());
    }

    #[test]
    fn field_lookup_walks_objects_and_arrays() {
        let mut record = ReportRecord::pending("r1", "w1");
        record.report_data = Some(json!({
            "opportunity_section": { "tam_value": "$4.2B" },
            "competitors": [{ "name": "Acme" }]
        }));

        assert_eq!(record.field("opportunity_section.tam_value"), Some(&json!("$4.2B")));
        assert_eq!(record.field("competitors.0.name"), Some(&json!("Acme")));
        assert_eq!(record.field("competitors.7.name"), None);
        assert_eq!(record.field("opportunity_section.sam_value"), None);
    }
}
