//! # PlanningMySaaS Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP client with retry semantics
//! - Smart-fallback edge function client ([`FallbackResolver`](pms_core::FallbackResolver))
//! - Report workflow webhook client ([`WorkflowEngine`](pms_core::WorkflowEngine))
//! - Supabase REST store for reports and wizards
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `pms-core`
//! - Contains all "impure" code (network, environment, files)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod logging;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::fallback::SmartFallbackClient;
pub use integrations::supabase::{ReportDataHandle, SupabaseStore};
pub use integrations::workflow::N8nWorkflowClient;
pub use logging::init_tracing;
