use std::time::Duration;

use async_trait::async_trait;
use pms_core::WorkflowEngine;
use pms_domain::config::WorkflowConfig;
use pms_domain::{PmsError, Result, WorkflowOutcome, WorkflowRequest};
use reqwest::Method;
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::{error_for_response, InfraError};
use crate::http::HttpClient;

/// [`WorkflowEngine`] that posts to an n8n webhook and waits for the run.
///
/// The webhook answers either with an explicit [`WorkflowOutcome`]
/// (`{"success": .., "reportData": .., "message": ..}`) or with the bare
/// report payload, which counts as success.
#[derive(Debug, Clone)]
pub struct N8nWorkflowClient {
    http: HttpClient,
    webhook_url: String,
    auth_token: Option<String>,
}

impl N8nWorkflowClient {
    pub fn new(config: &WorkflowConfig) -> Result<Self> {
        // Generation takes minutes; a retried POST would start a second run.
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(1)
            .build()?;
        Ok(Self::with_http(http, config.webhook_url.clone(), config.auth_token.clone()))
    }

    pub fn with_http(http: HttpClient, webhook_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self { http, webhook_url: webhook_url.into(), auth_token }
    }
}

#[async_trait]
impl WorkflowEngine for N8nWorkflowClient {
    #[instrument(skip(self, request), fields(report_id = %request.report_id, wizard_id = %request.wizard_id))]
    async fn run_report(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome> {
        let mut builder = self.http.request(Method::POST, &self.webhook_url).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = error_for_response(self.http.send(builder).await?).await?;
        let text = response.text().await.map_err(|e| PmsError::from(InfraError::from(e)))?;
        let outcome = parse_outcome(&text)?;

        info!(success = outcome.success, "Workflow finished");
        Ok(outcome)
    }
}

fn parse_outcome(body: &str) -> Result<WorkflowOutcome> {
    if body.trim().is_empty() {
        return Ok(WorkflowOutcome { success: true, ..WorkflowOutcome::default() });
    }

    let value: Value = serde_json::from_str(body)?;
    if value.get("success").is_some_and(Value::is_boolean) {
        return Ok(serde_json::from_value(value)?);
    }

    Ok(WorkflowOutcome { success: true, report_data: Some(value), message: None })
}
