use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pms_core::{ReportRepository, WizardSource};
use pms_domain::config::SupabaseConfig;
use pms_domain::{PmsError, ReportRecord, ReportState, Result, WizardSubmission};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::errors::{error_for_response, InfraError};
use crate::http::HttpClient;

/// Report and wizard rows over the Supabase REST API.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: HttpClient,
    rest_url: String,
    service_key: Option<String>,
    reports_table: String,
    wizards_table: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(3)
            .build()?;
        Ok(Self::with_http(http, config))
    }

    pub fn with_http(http: HttpClient, config: &SupabaseConfig) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            service_key: config.service_key.clone(),
            reports_table: config.reports_table.clone(),
            wizards_table: config.wizards_table.clone(),
        }
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, format!("{}/{}", self.rest_url, table));
        if let Some(key) = &self.service_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        builder
    }

    /// Execute and decode the row array PostgREST answers with.
    async fn rows<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Vec<T>> {
        let response = error_for_response(self.http.send(builder).await?).await?;
        response.json().await.map_err(|e| PmsError::from(InfraError::from(e)))
    }

    async fn single<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        self.rows(builder).await?.into_iter().next().ok_or_else(|| PmsError::NotFound(what.to_string()))
    }

    /// PATCH one report row and return its new state.
    async fn patch_report(&self, report_id: &str, changes: Value) -> Result<ReportRecord> {
        let builder = self
            .table(Method::PATCH, &self.reports_table)
            .query(&[("id", format!("eq.{report_id}"))])
            .header("Prefer", "return=representation")
            .json(&changes);
        self.single(builder, &format!("report {report_id}")).await
    }
}

#[async_trait]
impl ReportRepository for SupabaseStore {
    #[instrument(skip(self))]
    async fn create_pending(&self, wizard_id: &str) -> Result<ReportRecord> {
        let builder = self
            .table(Method::POST, &self.reports_table)
            .header("Prefer", "return=representation")
            .json(&json!({ "wizard_id": wizard_id, "status": ReportState::Pending.as_str() }));
        let record: ReportRecord = self.single(builder, "inserted report").await?;
        debug!(report_id = %record.id, "Report row created");
        Ok(record)
    }

    async fn update_status_text(&self, report_id: &str, status_text: &str) -> Result<()> {
        self.patch_report(
            report_id,
            json!({
                "status": ReportState::Processing.as_str(),
                "generation_status": status_text,
                "updated_at": Utc::now(),
            }),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self, report_data))]
    async fn mark_completed(&self, report_id: &str, report_data: Value) -> Result<ReportRecord> {
        self.patch_report(
            report_id,
            json!({
                "status": ReportState::Completed.as_str(),
                "generation_status": "completed",
                "report_data": report_data,
                "updated_at": Utc::now(),
            }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn mark_failed(&self, report_id: &str, reason: &str) -> Result<ReportRecord> {
        self.patch_report(
            report_id,
            json!({
                "status": ReportState::Failed.as_str(),
                "error_message": reason,
                "updated_at": Utc::now(),
            }),
        )
        .await
    }

    async fn fetch_report(&self, report_id: &str) -> Result<ReportRecord> {
        let builder = self
            .table(Method::GET, &self.reports_table)
            .query(&[("id", format!("eq.{report_id}")), ("select", "*".to_string())]);
        self.single(builder, &format!("report {report_id}")).await
    }
}

#[async_trait]
impl WizardSource for SupabaseStore {
    async fn load_wizard(&self, wizard_id: &str) -> Result<WizardSubmission> {
        let builder = self
            .table(Method::GET, &self.wizards_table)
            .query(&[("id", format!("eq.{wizard_id}")), ("select", "*".to_string())]);
        let row: Value = self.single(builder, &format!("wizard {wizard_id}")).await?;
        Ok(submission_from_row(wizard_id, row))
    }
}

/// Wizard answers live in `wizard_data` when the table has that column;
/// otherwise the whole row is forwarded.
fn submission_from_row(wizard_id: &str, mut row: Value) -> WizardSubmission {
    let user_id = row.get("user_id").and_then(Value::as_str).map(str::to_string);
    let user = row.as_object_mut().and_then(|obj| obj.remove("user")).filter(|u| !u.is_null());
    let data = match row.get_mut("wizard_data").map(Value::take) {
        Some(data) if !data.is_null() => data,
        _ => row,
    };

    WizardSubmission { wizard_id: wizard_id.to_string(), user_id, data, user }
}
