use std::time::Duration;

use async_trait::async_trait;
use pms_core::FallbackResolver;
use pms_domain::config::FallbackConfig;
use pms_domain::{FallbackRequest, FallbackResponse, PmsError, Result};
use reqwest::Method;
use tracing::{debug, instrument};

use crate::errors::{error_for_response, InfraError};
use crate::http::HttpClient;

/// [`FallbackResolver`] backed by the `pms-smart-fallback` edge function.
///
/// Sends the request as camelCase JSON and expects a [`FallbackResponse`]
/// body. Non-2xx answers become [`PmsError::Remote`].
#[derive(Debug, Clone)]
pub struct SmartFallbackClient {
    http: HttpClient,
    endpoint: String,
    api_key: Option<String>,
}

impl SmartFallbackClient {
    pub fn new(config: &FallbackConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .max_attempts(config.max_attempts)
            .base_backoff(Duration::from_millis(500))
            .build()?;
        Ok(Self::with_http(http, config.endpoint_url.clone(), config.api_key.clone()))
    }

    pub fn with_http(http: HttpClient, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self { http, endpoint: endpoint.into(), api_key }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FallbackResolver for SmartFallbackClient {
    #[instrument(skip(self, request), fields(report_id = %request.report_id, field_path = %request.field_path))]
    async fn resolve(&self, request: &FallbackRequest) -> Result<FallbackResponse> {
        let mut builder = self.http.request(Method::POST, &self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key).header("apikey", key);
        }

        let response = error_for_response(self.http.send(builder).await?).await?;
        let body: FallbackResponse = response.json().await.map_err(|e| PmsError::from(InfraError::from(e)))?;

        debug!(success = body.success, source = %body.source, persisted = body.persisted, "Edge function answered");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use pms_domain::{ExpectedType, FallbackParams, FallbackSource};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer, api_key: Option<&str>) -> SmartFallbackClient {
        let http = HttpClient::builder()
            .max_attempts(2)
            .base_backoff(Duration::from_millis(5))
            .build()
            .expect("http client");
        SmartFallbackClient::with_http(
            http,
            format!("{}/functions/v1/pms-smart-fallback", server.uri()),
            api_key.map(str::to_string),
        )
    }

    fn request() -> FallbackRequest {
        let params = FallbackParams::new("r1", "w1", "opportunity_section.tam_value")
            .with_description("Total addressable market")
            .with_expected_type(ExpectedType::String);
        FallbackRequest::from_params(params, None)
    }

    #[tokio::test]
    async fn posts_camel_case_request_with_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/pms-smart-fallback"))
            .and(header("authorization", "Bearer anon-key"))
            .and(header("apikey", "anon-key"))
            .and(body_partial_json(json!({
                "wizardId": "w1",
                "reportId": "r1",
                "fieldPath": "opportunity_section.tam_value",
                "expectedType": "string"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "value": "$4.2B",
                "source": "perplexity",
                "persisted": true,
                "retryCount": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server, Some("anon-key")).resolve(&request()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.value, json!("$4.2B"));
        assert_eq!(response.source, FallbackSource::Perplexity);
        assert!(response.persisted);
        assert_eq!(response.retry_count, 1);
    }

    #[tokio::test]
    async fn resolver_level_failure_is_returned_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "value": null,
                "source": "static",
                "error": "no estimate available"
            })))
            .mount(&server)
            .await;

        let response = client(&server, None).resolve(&request()).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("no estimate available"));
    }

    #[tokio::test]
    async fn non_success_status_becomes_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid JWT"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, None).resolve(&request()).await.unwrap_err();

        assert_eq!(err, PmsError::Remote { status: 401, message: "invalid JWT".into() });
    }

    #[tokio::test]
    async fn malformed_body_becomes_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server, None).resolve(&request()).await.unwrap_err();

        assert!(matches!(err, PmsError::Serialization(_)), "got {err:?}");
    }
}
