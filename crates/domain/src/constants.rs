//! Domain constants
//!
//! Centralized location for the timing and sizing constants shared by the
//! fallback coordinator, the field bindings and the progress view.

use std::time::Duration;

// Fallback cache
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);
pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// Fallback coordinator scheduling
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);
pub const BATCH_CONCURRENCY: usize = 3;

// Report generation progress
pub const TOTAL_GENERATION_STEPS: usize = 11;
pub const SECONDS_PER_STEP: u64 = 15;

// Coordinator outcomes surfaced through `FallbackResponse::reasoning`
pub const REASON_CACHE_HIT: &str = "cache hit";
pub const REASON_IN_PROGRESS: &str = "already in progress";

/// Stored values that carry no information and must be replaced.
pub const PLACEHOLDER_SENTINELS: &[&str] = &[
    "...", "$...", "n/a", "na", "tbd", "-", "--", "null", "undefined", "unknown",
];
