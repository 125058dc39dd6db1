//! Parsing of the free-text generation status written by the workflow engine
//!
//! The engine reports progress as `"Step {N} {Label} - {Completed|In Progress|Fail}"`
//! or the literal `"completed"`. The format is not versioned, so anything the
//! parser does not understand degrades to "not started" (no step number) or to
//! an optimistic in-progress step (step number with an unknown suffix).

use once_cell::sync::Lazy;
use pms_domain::constants::TOTAL_GENERATION_STEPS;
use pms_domain::ReportGenerationStatus;
use regex::Regex;
use tracing::warn;

/// Display names of the generation steps, in execution order.
pub const GENERATION_STEPS: [&str; TOTAL_GENERATION_STEPS] = [
    "Initializing Report",
    "Market Analysis",
    "Target Audience",
    "Competitor Research",
    "Opportunity Sizing",
    "Business Model",
    "Pricing Strategy",
    "Go-To-Market",
    "Financial Projections",
    "Risk Assessment",
    "Final Report",
];

#[allow(clippy::expect_used)]
static STEP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*step\s+(\d{1,3})\b").expect("STEP_REGEX should compile - this is a bug")
});

/// Parse a raw status string into structured progress. Never fails.
pub fn parse_status(raw: Option<&str>) -> ReportGenerationStatus {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return ReportGenerationStatus::NOT_STARTED;
    };

    if raw.eq_ignore_ascii_case("completed") {
        return ReportGenerationStatus::completed();
    }

    let Some(captures) = STEP_REGEX.captures(raw) else {
        return ReportGenerationStatus::NOT_STARTED;
    };
    let step = match captures[1].parse::<usize>() {
        Ok(n) if (1..=TOTAL_GENERATION_STEPS).contains(&n) => n - 1,
        _ => {
            warn!(status = raw, "Generation status names an unknown step");
            return ReportGenerationStatus::NOT_STARTED;
        }
    };

    // step < TOTAL_GENERATION_STEPS, so these casts cannot truncate
    let previous = step as i32 - 1;
    let remainder = raw[captures[0].len()..].to_ascii_lowercase();

    if remainder.contains("fail") {
        ReportGenerationStatus { last_completed: previous, failed: Some(step), in_progress: None }
    } else if remainder.contains("in progress") {
        ReportGenerationStatus { last_completed: previous, failed: None, in_progress: Some(step) }
    } else if remainder.contains("completed") {
        ReportGenerationStatus { last_completed: step as i32, failed: None, in_progress: None }
    } else {
        warn!(status = raw, step = step + 1, "Unrecognized generation status, assuming in progress");
        ReportGenerationStatus { last_completed: previous, failed: None, in_progress: Some(step) }
    }
}

/// Human-readable time left, at a fixed pace per remaining step.
pub fn estimate_remaining(status: &ReportGenerationStatus) -> String {
    if status.remaining_steps() <= 1 {
        return "Almost done...".to_string();
    }

    let seconds = status.remaining_seconds();
    if seconds < 60 {
        return "Less than a minute".to_string();
    }

    let minutes = seconds.div_ceil(60);
    if minutes == 1 {
        "About 1 minute".to_string()
    } else {
        format!("About {minutes} minutes")
    }
}

/// Name of the step at a 0-based index.
pub fn step_name(index: usize) -> Option<&'static str> {
    GENERATION_STEPS.get(index).copied()
}
