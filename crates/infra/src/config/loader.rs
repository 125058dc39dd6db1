//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Seed the process environment from `.env` when one exists
//! 2. Load from `PMS_*` environment variables
//! 3. If a required variable is missing, load from a config file instead
//!
//! ## Environment Variables
//! Required:
//! - `PMS_FALLBACK_URL`: smart-fallback edge function endpoint
//! - `PMS_SUPABASE_URL`: Supabase project URL
//! - `PMS_WORKFLOW_WEBHOOK_URL`: report workflow webhook
//!
//! Optional (defaults in [`pms_domain::config`]):
//! - `PMS_FALLBACK_API_KEY`, `PMS_FALLBACK_TIMEOUT_SECS`, `PMS_FALLBACK_MAX_ATTEMPTS`
//! - `PMS_CACHE_TTL_SECS`, `PMS_CACHE_SWEEP_SECS`, `PMS_DEBOUNCE_MS`, `PMS_BATCH_CONCURRENCY`
//! - `PMS_SUPABASE_SERVICE_KEY`, `PMS_SUPABASE_REPORTS_TABLE`, `PMS_SUPABASE_WIZARDS_TABLE`,
//!   `PMS_SUPABASE_TIMEOUT_SECS`
//! - `PMS_WORKFLOW_AUTH_TOKEN`, `PMS_WORKFLOW_TIMEOUT_SECS`
//! - `PMS_LOG_LEVEL`, `PMS_LOG_JSON`
//!
//! ## File Locations
//! `config.{json,toml}` or `pms.{json,toml}` in the working directory, its two
//! parents, then the same names next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use pms_domain::config::{Config, FallbackConfig, LoggingConfig, SupabaseConfig, WorkflowConfig};
use pms_domain::{PmsError, Result};

const FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "pms.json", "pms.toml"];

/// Load configuration from the environment, falling back to a file.
///
/// # Errors
/// Returns `PmsError::Config` when neither source yields a valid config.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `PMS_*` environment variables.
///
/// # Errors
/// Returns `PmsError::Config` if a required variable is missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();

    let fallback = FallbackConfig {
        endpoint_url: env_var("PMS_FALLBACK_URL")?,
        api_key: env_opt("PMS_FALLBACK_API_KEY"),
        timeout_secs: env_parse("PMS_FALLBACK_TIMEOUT_SECS", defaults.fallback.timeout_secs)?,
        max_attempts: env_parse("PMS_FALLBACK_MAX_ATTEMPTS", defaults.fallback.max_attempts)?,
        cache_ttl_secs: env_parse("PMS_CACHE_TTL_SECS", defaults.fallback.cache_ttl_secs)?,
        sweep_interval_secs: env_parse("PMS_CACHE_SWEEP_SECS", defaults.fallback.sweep_interval_secs)?,
        debounce_ms: env_parse("PMS_DEBOUNCE_MS", defaults.fallback.debounce_ms)?,
        batch_concurrency: env_parse("PMS_BATCH_CONCURRENCY", defaults.fallback.batch_concurrency)?,
    };

    let supabase = SupabaseConfig {
        url: env_var("PMS_SUPABASE_URL")?,
        service_key: env_opt("PMS_SUPABASE_SERVICE_KEY"),
        reports_table: env_opt("PMS_SUPABASE_REPORTS_TABLE").unwrap_or(defaults.supabase.reports_table),
        wizards_table: env_opt("PMS_SUPABASE_WIZARDS_TABLE").unwrap_or(defaults.supabase.wizards_table),
        timeout_secs: env_parse("PMS_SUPABASE_TIMEOUT_SECS", defaults.supabase.timeout_secs)?,
    };

    let workflow = WorkflowConfig {
        webhook_url: env_var("PMS_WORKFLOW_WEBHOOK_URL")?,
        auth_token: env_opt("PMS_WORKFLOW_AUTH_TOKEN"),
        timeout_secs: env_parse("PMS_WORKFLOW_TIMEOUT_SECS", defaults.workflow.timeout_secs)?,
    };

    let logging = LoggingConfig {
        level: env_opt("PMS_LOG_LEVEL").unwrap_or(defaults.logging.level),
        json: env_bool("PMS_LOG_JSON", defaults.logging.json),
    };

    Ok(Config { fallback, workflow, supabase, logging })
}

/// Load configuration from a file, probing standard locations when `path`
/// is `None`. Format follows the extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `PmsError::Config` if the file is missing, unreadable or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) if p.exists() => p,
        Some(p) => {
            return Err(PmsError::Config(format!("Config file not found: {}", p.display())));
        }
        None => probe_config_paths().ok_or_else(|| {
            PmsError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PmsError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("json") {
        "toml" => toml::from_str(contents).map_err(|e| PmsError::Config(format!("Invalid TOML format: {e}"))),
        "json" => {
            serde_json::from_str(contents).map_err(|e| PmsError::Config(format!("Invalid JSON format: {e}")))
        }
        other => Err(PmsError::Config(format!("Unsupported config format: {other}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.extend([exe_dir.clone(), exe_dir.join("..")]);
    }

    dirs.iter().flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name))).find(|p| p.is_file())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| PmsError::Config(format!("Missing required environment variable: {key}")))
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw.trim().parse().map_err(|e| PmsError::Config(format!("Invalid value for {key}: {e}"))),
        None => Ok(default),
    }
}

/// Accepts `1`/`true`/`yes`/`on` (case-insensitive); anything else set is false.
fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
