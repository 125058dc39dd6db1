//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{BATCH_CONCURRENCY, CACHE_SWEEP_INTERVAL, CACHE_TTL, DEBOUNCE_DELAY};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Smart-fallback endpoint and coordinator tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub endpoint_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub debounce_ms: u64,
    pub batch_concurrency: usize,
}

impl FallbackConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:54321/functions/v1/pms-smart-fallback".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_attempts: 2,
            cache_ttl_secs: CACHE_TTL.as_secs(),
            sweep_interval_secs: CACHE_SWEEP_INTERVAL.as_secs(),
            debounce_ms: DEBOUNCE_DELAY.as_millis() as u64,
            batch_concurrency: BATCH_CONCURRENCY,
        }
    }
}

/// External report workflow (n8n webhook)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub webhook_url: String,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    /// Report generation runs synchronously and can take minutes.
    pub timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            webhook_url: "http://localhost:5678/webhook/pms-report".to_string(),
            auth_token: None,
            timeout_secs: 600,
        }
    }
}

/// Supabase REST access for report and wizard rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub service_key: Option<String>,
    pub reports_table: String,
    pub wizards_table: String,
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            service_key: None,
            reports_table: "tb_pms_reports".to_string(),
            wizards_table: "tb_pms_wizard".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Tracing output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
