//! Smart-fallback field resolution
//!
//! Report fields that are missing or hold placeholder text get a replacement
//! value from a remote resolver. Resolution happens at most once per
//! `(report, field)` at a time, results are cached with a TTL, and bindings
//! re-fetch the report when the resolver persisted the value itself.

pub mod binding;
pub mod cache;
pub mod classifier;
pub mod clock;
pub mod coordinator;
pub mod ports;
pub mod registry;
pub mod sweeper;
