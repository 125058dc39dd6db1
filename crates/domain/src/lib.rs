//! # PlanningMySaaS Domain
//!
//! Business domain types for the PlanningMySaaS report engine.
//!
//! This crate contains:
//! - Smart-fallback wire types (requests, responses, sources)
//! - Report records, lifecycle states and generation progress types
//! - Domain error type and Result definition
//! - Configuration structures and domain constants
//!
//! ## Architecture
//! - No dependencies on other PlanningMySaaS crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
