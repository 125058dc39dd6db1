//! Smart-fallback types
//!
//! Wire shapes of the `pms-smart-fallback` resolution endpoint plus the static
//! per-field metadata used to build its requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_wire_enum;

/// Where a resolved fallback value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackSource {
    /// Live web search
    Perplexity,
    /// Model estimate without external evidence
    AiEstimation,
    /// Static default; also used for every failure outcome
    #[default]
    Static,
}

impl_wire_enum!(FallbackSource {
    Perplexity => "perplexity",
    AiEstimation => "ai_estimation",
    Static => "static",
});

/// Shape a field's value is expected to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedType {
    String,
    Number,
    Array,
    Object,
}

impl_wire_enum!(ExpectedType {
    String => "string",
    Number => "number",
    Array => "array",
    Object => "object",
});

/// External search flavour the resolver should run for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    MarketSize,
    Competitors,
    Pricing,
    Trends,
    Benchmarks,
    Regulations,
}

impl_wire_enum!(SearchStrategy {
    MarketSize => "market_size",
    Competitors => "competitors",
    Pricing => "pricing",
    Trends => "trends",
    Benchmarks => "benchmarks",
    Regulations => "regulations",
});

/// Static metadata describing one report field.
///
/// Entries live in a process-wide table and are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldConfig {
    pub section_name: &'static str,
    pub field_description: &'static str,
    pub field_purpose: Option<&'static str>,
    pub expected_type: ExpectedType,
    pub expected_format: Option<&'static str>,
    pub validation_rules: &'static [&'static str],
    pub search_strategy: Option<SearchStrategy>,
}

/// Caller-supplied parameters for one fallback resolution.
///
/// Every optional field overrides the registry default when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackParams {
    pub report_id: String,
    pub wizard_id: String,
    pub field_path: String,
    pub section_name: Option<String>,
    pub field_description: Option<String>,
    pub field_purpose: Option<String>,
    pub expected_type: Option<ExpectedType>,
    pub expected_format: Option<String>,
    pub validation_rules: Option<Vec<String>>,
    pub search_strategy: Option<SearchStrategy>,
}

impl FallbackParams {
    pub fn new(
        report_id: impl Into<String>,
        wizard_id: impl Into<String>,
        field_path: impl Into<String>,
    ) -> Self {
        Self {
            report_id: report_id.into(),
            wizard_id: wizard_id.into(),
            field_path: field_path.into(),
            ..Self::default()
        }
    }

    pub fn with_section_name(mut self, section: impl Into<String>) -> Self {
        self.section_name = Some(section.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.field_description = Some(description.into());
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.field_purpose = Some(purpose.into());
        self
    }

    pub fn with_expected_type(mut self, expected: ExpectedType) -> Self {
        self.expected_type = Some(expected);
        self
    }

    pub fn with_expected_format(mut self, format: impl Into<String>) -> Self {
        self.expected_format = Some(format.into());
        self
    }

    pub fn with_validation_rules(mut self, rules: Vec<String>) -> Self {
        self.validation_rules = Some(rules);
        self
    }

    pub fn with_search_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.search_strategy = Some(strategy);
        self
    }

    /// Cache key shared by every caller resolving this field of this report.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.report_id, self.field_path)
    }
}

/// Request body of the resolution endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRequest {
    pub wizard_id: String,
    pub report_id: String,
    pub field_path: String,
    pub section_name: String,
    pub field_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_purpose: Option<String>,
    pub expected_type: ExpectedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perplexity_search_type: Option<SearchStrategy>,
}

impl FallbackRequest {
    /// Merge caller parameters over the field's registry defaults.
    ///
    /// Without a registry entry the section defaults to `"unknown"`, the
    /// description to the field path itself and the type to `string`.
    pub fn from_params(params: FallbackParams, config: Option<&FieldConfig>) -> Self {
        let section_name = params
            .section_name
            .or_else(|| config.map(|c| c.section_name.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        let field_description = params
            .field_description
            .or_else(|| config.map(|c| c.field_description.to_string()))
            .unwrap_or_else(|| params.field_path.clone());
        let field_purpose =
            params.field_purpose.or_else(|| config.and_then(|c| c.field_purpose.map(str::to_string)));
        let expected_type = params
            .expected_type
            .or_else(|| config.map(|c| c.expected_type))
            .unwrap_or(ExpectedType::String);
        let expected_format = params
            .expected_format
            .or_else(|| config.and_then(|c| c.expected_format.map(str::to_string)));
        let validation_rules = params.validation_rules.or_else(|| {
            config
                .filter(|c| !c.validation_rules.is_empty())
                .map(|c| c.validation_rules.iter().map(|r| (*r).to_string()).collect())
        });
        let perplexity_search_type =
            params.search_strategy.or_else(|| config.and_then(|c| c.search_strategy));

        Self {
            wizard_id: params.wizard_id,
            report_id: params.report_id,
            field_path: params.field_path,
            section_name,
            field_description,
            field_purpose,
            expected_type,
            expected_format,
            validation_rules,
            perplexity_search_type,
        }
    }
}

/// Outcome of one resolution, as returned by the endpoint or synthesized by
/// the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackResponse {
    pub success: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub source: FallbackSource,
    /// The resolver wrote `value` to durable storage itself.
    #[serde(default)]
    pub persisted: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackResponse {
    /// Successful answer served from a fresh cache entry.
    pub fn cache_hit(value: Value, source: FallbackSource) -> Self {
        Self {
            success: true,
            value,
            source,
            persisted: false,
            retry_count: 0,
            reasoning: Some(crate::constants::REASON_CACHE_HIT.to_string()),
            error: None,
        }
    }

    /// Another caller is already resolving the same key.
    pub fn in_progress() -> Self {
        Self {
            success: false,
            value: Value::Null,
            source: FallbackSource::Static,
            persisted: false,
            retry_count: 0,
            reasoning: Some(crate::constants::REASON_IN_PROGRESS.to_string()),
            error: None,
        }
    }

    /// Transport or remote failure.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            value: Value::Null,
            source: FallbackSource::Static,
            persisted: false,
            retry_count: 0,
            reasoning: None,
            error: Some(error.into()),
        }
    }

    /// True when the response carries a usable value.
    pub fn has_value(&self) -> bool {
        self.success && !self.value.is_null()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TAM: FieldConfig = FieldConfig {
        section_name: "opportunity_section",
        field_description: "Total addressable market",
        field_purpose: Some("Sizing the opportunity"),
        expected_type: ExpectedType::String,
        expected_format: Some("$X.XB"),
        validation_rules: &["must include currency"],
        search_strategy: Some(SearchStrategy::MarketSize),
    };

    #[test]
    fn caller_values_win_over_registry_defaults() {
        let params = FallbackParams::new("r1", "w1", "opportunity_section.tam_value")
            .with_description("TAM in USD")
            .with_expected_type(ExpectedType::Number);

        let request = FallbackRequest::from_params(params, Some(&TAM));

        assert_eq!(request.field_description, "TAM in USD");
        assert_eq!(request.expected_type, ExpectedType::Number);
        assert_eq!(request.section_name, "opportunity_section");
        assert_eq!(request.expected_format.as_deref(), Some("$X.XB"));
        assert_eq!(request.validation_rules, Some(vec!["must include currency".to_string()]));
        assert_eq!(request.perplexity_search_type, Some(SearchStrategy::MarketSize));
    }

    #[test]
    fn unknown_field_uses_path_as_description() {
        let params = FallbackParams::new("r1", "w1", "misc.unlisted");
        let request = FallbackRequest::from_params(params, None);

        assert_eq!(request.field_description, "misc.unlisted");
        assert_eq!(request.section_name, "unknown");
        assert_eq!(request.expected_type, ExpectedType::String);
        assert!(request.validation_rules.is_none());
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = FallbackRequest::from_params(
            FallbackParams::new("r1", "w1", "opportunity_section.tam_value"),
            Some(&TAM),
        );
        let json = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["wizardId"], "w1");
        assert_eq!(json["fieldPath"], "opportunity_section.tam_value");
        assert_eq!(json["expectedType"], "string");
        assert_eq!(json["perplexitySearchType"], "market_size");
    }

    #[test]
    fn response_tolerates_missing_optional_fields() {
        let response: FallbackResponse = serde_json::from_value(json!({
            "success": true,
            "value": "$4.2B",
            "source": "ai_estimation"
        }))
        .expect("deserialize");

        assert!(response.has_value());
        assert_eq!(response.source, FallbackSource::AiEstimation);
        assert!(!response.persisted);
        assert_eq!(response.retry_count, 0);
    }

    #[test]
    fn failure_body_without_source_keeps_error() {
        let response: FallbackResponse = serde_json::from_value(json!({
            "success": false,
            "error": "Perplexity quota exhausted"
        }))
        .expect("deserialize");

        assert!(!response.success);
        assert_eq!(response.source, FallbackSource::Static);
        assert!(response.value.is_null());
        assert_eq!(response.error.as_deref(), Some("Perplexity quota exhausted"));
    }

    #[test]
    fn cache_key_joins_report_and_field() {
        let params = FallbackParams::new("r9", "w1", "a.b");
        assert_eq!(params.cache_key(), "r9:a.b");
    }

    #[test]
    fn synthesized_outcomes_are_not_successful() {
        assert!(!FallbackResponse::in_progress().success);
        let failed = FallbackResponse::failure("timeout");
        assert_eq!(failed.source, FallbackSource::Static);
        assert_eq!(failed.error.as_deref(), Some("timeout"));
        assert!(!failed.has_value());
    }
}
