//! Supabase (PostgREST) access to report and wizard rows
//!
//! - [`SupabaseStore`] implements the report repository and wizard source
//! - [`ReportDataHandle`] keeps the latest copy of one report and re-fetches
//!   it when a fallback was persisted remotely

mod client;
mod handle;

pub use client::SupabaseStore;
pub use handle::ReportDataHandle;
