//! Field config registry
//!
//! Static metadata for every report field the dashboard can resolve through
//! the smart fallback. Lookup is by dotted field path.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use pms_domain::{ExpectedType, FieldConfig, SearchStrategy};

/// Fields prefetched as soon as a report view opens.
const CRITICAL_FIELDS: &[&str] = &[
    "opportunity_section.tam_value",
    "opportunity_section.sam_value",
    "opportunity_section.som_value",
    "opportunity_section.market_growth_rate",
    "competitive_section.direct_competitors",
    "pricing_section.recommended_price",
    "investment_section.total_investment",
];

static FIELDS: &[(&str, FieldConfig)] = &[
    (
        "opportunity_section.tam_value",
        FieldConfig {
            section_name: "opportunity_section",
            field_description: "Total Addressable Market",
            field_purpose: Some("Size of the entire market the product could serve"),
            expected_type: ExpectedType::String,
            expected_format: Some("$X.XB or $XXXM"),
            validation_rules: &["must include a currency amount", "must be larger than SAM"],
            search_strategy: Some(SearchStrategy::MarketSize),
        },
    ),
    (
        "opportunity_section.sam_value",
        FieldConfig {
            section_name: "opportunity_section",
            field_description: "Serviceable Addressable Market",
            field_purpose: Some("Share of TAM reachable with the current business model"),
            expected_type: ExpectedType::String,
            expected_format: Some("$X.XB or $XXXM"),
            validation_rules: &["must include a currency amount", "must be smaller than TAM"],
            search_strategy: Some(SearchStrategy::MarketSize),
        },
    ),
    (
        "opportunity_section.som_value",
        FieldConfig {
            section_name: "opportunity_section",
            field_description: "Serviceable Obtainable Market",
            field_purpose: Some("Realistic capture within the first three years"),
            expected_type: ExpectedType::String,
            expected_format: Some("$XXM"),
            validation_rules: &["must include a currency amount", "must be smaller than SAM"],
            search_strategy: Some(SearchStrategy::MarketSize),
        },
    ),
    (
        "opportunity_section.market_growth_rate",
        FieldConfig {
            section_name: "opportunity_section",
            field_description: "Annual market growth rate (CAGR)",
            field_purpose: None,
            expected_type: ExpectedType::String,
            expected_format: Some("XX% CAGR"),
            validation_rules: &["must be a percentage"],
            search_strategy: Some(SearchStrategy::Trends),
        },
    ),
    (
        "opportunity_section.market_trends",
        FieldConfig {
            section_name: "opportunity_section",
            field_description: "Key market trends",
            field_purpose: Some("Tailwinds supporting the product"),
            expected_type: ExpectedType::Array,
            expected_format: None,
            validation_rules: &["three to five items"],
            search_strategy: Some(SearchStrategy::Trends),
        },
    ),
    (
        "competitive_section.direct_competitors",
        FieldConfig {
            section_name: "competitive_section",
            field_description: "Direct competitors",
            field_purpose: Some("Products solving the same problem for the same audience"),
            expected_type: ExpectedType::Array,
            expected_format: Some("[{ name, url, pricing, strengths, weaknesses }]"),
            validation_rules: &["at least three competitors", "real companies only"],
            search_strategy: Some(SearchStrategy::Competitors),
        },
    ),
    (
        "competitive_section.competitive_advantage",
        FieldConfig {
            section_name: "competitive_section",
            field_description: "Main competitive advantage",
            field_purpose: None,
            expected_type: ExpectedType::String,
            expected_format: None,
            validation_rules: &[],
            search_strategy: None,
        },
    ),
    (
        "pricing_section.recommended_price",
        FieldConfig {
            section_name: "pricing_section",
            field_description: "Recommended monthly subscription price",
            field_purpose: Some("Entry price point for the core plan"),
            expected_type: ExpectedType::String,
            expected_format: Some("$XX/month"),
            validation_rules: &["must include a currency amount"],
            search_strategy: Some(SearchStrategy::Pricing),
        },
    ),
    (
        "pricing_section.pricing_tiers",
        FieldConfig {
            section_name: "pricing_section",
            field_description: "Suggested pricing tiers",
            field_purpose: None,
            expected_type: ExpectedType::Array,
            expected_format: Some("[{ name, price, features }]"),
            validation_rules: &["two to four tiers"],
            search_strategy: Some(SearchStrategy::Pricing),
        },
    ),
    (
        "investment_section.total_investment",
        FieldConfig {
            section_name: "investment_section",
            field_description: "Total MVP investment",
            field_purpose: Some("Budget required to ship the first version"),
            expected_type: ExpectedType::String,
            expected_format: Some("$XX,XXX"),
            validation_rules: &["must include a currency amount"],
            search_strategy: Some(SearchStrategy::Benchmarks),
        },
    ),
    (
        "investment_section.break_even_months",
        FieldConfig {
            section_name: "investment_section",
            field_description: "Months until break-even",
            field_purpose: None,
            expected_type: ExpectedType::Number,
            expected_format: None,
            validation_rules: &["positive integer"],
            search_strategy: Some(SearchStrategy::Benchmarks),
        },
    ),
    (
        "metrics_section.target_cac",
        FieldConfig {
            section_name: "metrics_section",
            field_description: "Target customer acquisition cost",
            field_purpose: None,
            expected_type: ExpectedType::String,
            expected_format: Some("$XXX"),
            validation_rules: &["must include a currency amount"],
            search_strategy: Some(SearchStrategy::Benchmarks),
        },
    ),
    (
        "metrics_section.target_ltv",
        FieldConfig {
            section_name: "metrics_section",
            field_description: "Target customer lifetime value",
            field_purpose: None,
            expected_type: ExpectedType::String,
            expected_format: Some("$X,XXX"),
            validation_rules: &["must include a currency amount"],
            search_strategy: Some(SearchStrategy::Benchmarks),
        },
    ),
    (
        "metrics_section.churn_rate",
        FieldConfig {
            section_name: "metrics_section",
            field_description: "Expected monthly churn rate",
            field_purpose: None,
            expected_type: ExpectedType::String,
            expected_format: Some("X.X%"),
            validation_rules: &["must be a percentage"],
            search_strategy: Some(SearchStrategy::Benchmarks),
        },
    ),
    (
        "risk_section.regulatory_risks",
        FieldConfig {
            section_name: "risk_section",
            field_description: "Regulatory and compliance risks",
            field_purpose: None,
            expected_type: ExpectedType::Array,
            expected_format: None,
            validation_rules: &[],
            search_strategy: Some(SearchStrategy::Regulations),
        },
    ),
    (
        "summary_section.verdict",
        FieldConfig {
            section_name: "summary_section",
            field_description: "Overall viability verdict",
            field_purpose: Some("One-paragraph go/no-go recommendation"),
            expected_type: ExpectedType::String,
            expected_format: None,
            validation_rules: &[],
            search_strategy: None,
        },
    ),
];

static REGISTRY: Lazy<HashMap<&'static str, &'static FieldConfig>> =
    Lazy::new(|| FIELDS.iter().map(|(path, config)| (*path, config)).collect());

/// Metadata for `field_path`, or `None` for fields outside the registry.
pub fn get_field_config(field_path: &str) -> Option<&'static FieldConfig> {
    REGISTRY.get(field_path).copied()
}

/// Field paths worth resolving eagerly when a report opens.
pub fn get_critical_fields() -> &'static [&'static str] {
    CRITICAL_FIELDS
}
