use std::sync::Arc;

use async_trait::async_trait;
use pms_core::{ReportRefresher, ReportRepository};
use pms_domain::{ReportRecord, Result};
use tokio::sync::watch;
use tracing::debug;

/// Latest copy of one report, shared with whoever renders it.
///
/// Acts as the [`ReportRefresher`] of that report's field bindings: a
/// refresh re-fetches the whole row and publishes it to subscribers.
pub struct ReportDataHandle {
    repository: Arc<dyn ReportRepository>,
    report_id: String,
    sender: watch::Sender<Option<ReportRecord>>,
}

impl ReportDataHandle {
    pub fn new(repository: Arc<dyn ReportRepository>, report_id: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(None);
        Self { repository, report_id: report_id.into(), sender }
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    /// Most recently fetched record, if any.
    pub fn current(&self) -> Option<ReportRecord> {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every successful refresh.
    pub fn subscribe(&self) -> watch::Receiver<Option<ReportRecord>> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl ReportRefresher for ReportDataHandle {
    async fn refresh_report_data(&self) -> Result<()> {
        let record = self.repository.fetch_report(&self.report_id).await?;
        debug!(report_id = %self.report_id, status = %record.status, "Report data refreshed");
        self.sender.send_replace(Some(record));
        Ok(())
    }
}
