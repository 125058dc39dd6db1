//! External service integrations
//!
//! - `fallback`: smart-fallback edge function (field value resolution)
//! - `workflow`: report generation webhook
//! - `supabase`: report and wizard rows over PostgREST

pub mod fallback;
pub mod supabase;
pub mod workflow;
