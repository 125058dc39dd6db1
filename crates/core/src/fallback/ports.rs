//! Port interfaces for fallback resolution

use async_trait::async_trait;
use pms_domain::{FallbackRequest, FallbackResponse, Result};

/// Remote service producing a replacement value for one report field.
///
/// Implementations return `Err` for transport failures, non-success statuses
/// and malformed payloads; the coordinator folds every error into a failed
/// [`FallbackResponse`].
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    async fn resolve(&self, request: &FallbackRequest) -> Result<FallbackResponse>;
}

/// Re-fetches the owning report after a resolver persisted a value.
///
/// Must be idempotent and safe to call repeatedly.
#[async_trait]
pub trait ReportRefresher: Send + Sync {
    async fn refresh_report_data(&self) -> Result<()>;
}
