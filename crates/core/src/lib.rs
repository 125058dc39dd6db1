//! # PlanningMySaaS Core
//!
//! Pure report-engine logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Smart-fallback field resolution: quality classifier, field registry,
//!   TTL cache, request coordinator and field bindings
//! - Report generation: status parsing and the trigger service
//! - Port/adapter interfaces (traits) for every remote collaborator
//!
//! ## Architecture Principles
//! - Only depends on `pms-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod fallback;
pub mod report;

// Re-export specific items to avoid ambiguity
pub use fallback::binding::{BindingOptions, BindingState, Formatter, SmartFallbackField, SmartFallbackFields};
pub use fallback::cache::{cache_key, CacheEntry, FallbackCache};
pub use fallback::classifier::{is_placeholder, requires_fallback};
pub use fallback::clock::{Clock, MockClock, SystemClock};
pub use fallback::coordinator::{CoordinatorSettings, FallbackCoordinator};
pub use fallback::ports::{FallbackResolver, ReportRefresher};
pub use fallback::registry::{get_critical_fields, get_field_config};
pub use fallback::sweeper::CacheSweeper;
pub use report::ports::{ReportRepository, WizardSource, WorkflowEngine};
pub use report::service::{ReportGenerationService, ReportProgress};
pub use report::status::{estimate_remaining, parse_status, step_name, GENERATION_STEPS};
