//! Fallback request coordinator
//!
//! One coordinator is shared (by clone) between every field binding of a
//! view. It owns the cache, the in-flight key set, per-field loading/error
//! state and the debounce timer table; nothing else mutates them.
//!
//! The in-flight check and insertion happen under a single lock acquisition,
//! before the resolver is awaited, so two callers can never both dispatch a
//! remote call for the same cache key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use pms_domain::constants::{BATCH_CONCURRENCY, CACHE_SWEEP_INTERVAL, CACHE_TTL, DEBOUNCE_DELAY};
use pms_domain::{FallbackConfig, FallbackParams, FallbackRequest, FallbackResponse};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::cache::{cache_key, FallbackCache};
use super::ports::FallbackResolver;
use super::registry::{get_critical_fields, get_field_config};
use super::sweeper::CacheSweeper;

/// Timing and concurrency knobs of a [`FallbackCoordinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    pub debounce: Duration,
    pub batch_concurrency: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            cache_ttl: CACHE_TTL,
            sweep_interval: CACHE_SWEEP_INTERVAL,
            debounce: DEBOUNCE_DELAY,
            batch_concurrency: BATCH_CONCURRENCY,
        }
    }
}

impl From<&FallbackConfig> for CoordinatorSettings {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl(),
            sweep_interval: config.sweep_interval(),
            debounce: config.debounce(),
            batch_concurrency: config.batch_concurrency.max(1),
        }
    }
}

#[derive(Default)]
struct CoordinatorState {
    in_flight: HashSet<String>,
    /// Outstanding resolutions per field path, across reports.
    loading: HashMap<String, usize>,
    errors: HashMap<String, String>,
    debounce_timers: HashMap<String, (u64, JoinHandle<()>)>,
    next_timer_id: u64,
}

struct Inner {
    resolver: Arc<dyn FallbackResolver>,
    cache: FallbackCache,
    settings: CoordinatorSettings,
    state: Mutex<CoordinatorState>,
}

/// Releases the in-flight key and loading flag however the call ends,
/// including panics in the resolver and a dropped future.
struct InFlightGuard<'a> {
    inner: &'a Inner,
    key: String,
    field_path: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.in_flight.remove(&self.key);
        if let Some(count) = state.loading.get_mut(&self.field_path) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.loading.remove(&self.field_path);
            }
        }
    }
}

/// Deduplicating, caching front for a [`FallbackResolver`].
#[derive(Clone)]
pub struct FallbackCoordinator {
    inner: Arc<Inner>,
}

impl FallbackCoordinator {
    pub fn new(resolver: Arc<dyn FallbackResolver>) -> Self {
        Self::with_settings(resolver, CoordinatorSettings::default())
    }

    pub fn with_settings(resolver: Arc<dyn FallbackResolver>, settings: CoordinatorSettings) -> Self {
        let cache = FallbackCache::new(settings.cache_ttl);
        Self::with_cache(resolver, cache, settings)
    }

    /// Use an existing cache (e.g. one driven by a mock clock).
    pub fn with_cache(
        resolver: Arc<dyn FallbackResolver>,
        cache: FallbackCache,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                cache,
                settings,
                state: Mutex::new(CoordinatorState::default()),
            }),
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.inner.settings
    }

    pub fn cache(&self) -> &FallbackCache {
        &self.inner.cache
    }

    /// Resolve one field, at most once concurrently per cache key.
    ///
    /// Never fails: cache hits, duplicate requests and remote errors are all
    /// reported through the returned [`FallbackResponse`].
    #[instrument(skip(self, params), fields(report_id = %params.report_id, field_path = %params.field_path))]
    pub async fn request_fallback(&self, params: FallbackParams) -> FallbackResponse {
        let key = params.cache_key();
        let field_path = params.field_path.clone();

        let guard = {
            let mut state = self.inner.state.lock();

            if let Some(entry) = self.inner.cache.get(&key) {
                debug!(cache_key = %key, source = %entry.source, "Fallback cache hit");
                return FallbackResponse::cache_hit(entry.value, entry.source);
            }

            if !state.in_flight.insert(key.clone()) {
                debug!(cache_key = %key, "Fallback already in progress");
                return FallbackResponse::in_progress();
            }

            *state.loading.entry(field_path.clone()).or_default() += 1;
            state.errors.remove(&field_path);
            InFlightGuard { inner: &self.inner, key: key.clone(), field_path: field_path.clone() }
        };

        let request = FallbackRequest::from_params(params, get_field_config(&field_path));
        let response = match self.inner.resolver.resolve(&request).await {
            Ok(response) => {
                if response.has_value() {
                    self.inner.cache.insert(key.as_str(), response.value.clone(), response.source);
                    info!(
                        source = %response.source,
                        persisted = response.persisted,
                        retry_count = response.retry_count,
                        "Fallback resolved"
                    );
                } else if !response.success {
                    let message = response
                        .error
                        .clone()
                        .or_else(|| response.reasoning.clone())
                        .unwrap_or_else(|| "fallback resolution failed".to_string());
                    warn!(error = %message, "Resolver reported failure");
                    self.record_error(&field_path, message);
                }
                response
            }
            Err(err) => {
                warn!(error = %err, kind = err.label(), "Fallback resolution failed");
                let message = err.to_string();
                self.record_error(&field_path, message.clone());
                FallbackResponse::failure(message)
            }
        };

        drop(guard);
        response
    }

    /// Schedule a resolution after the debounce delay, replacing any call for
    /// the same field path that has not fired yet.
    ///
    /// Fire-and-forget; must be called from within a tokio runtime. A call
    /// that already started is never cancelled.
    pub fn request_fallback_debounced(&self, params: FallbackParams) {
        let field_path = params.field_path.clone();
        let delay = self.inner.settings.debounce;
        let coordinator = self.clone();

        let mut state = self.inner.state.lock();
        let timer_id = state.next_timer_id;
        state.next_timer_id = state.next_timer_id.wrapping_add(1);

        let timer_field = field_path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut state = coordinator.inner.state.lock();
                let is_current = matches!(
                    state.debounce_timers.get(&timer_field),
                    Some((id, _)) if *id == timer_id
                );
                if !is_current {
                    return;
                }
                state.debounce_timers.remove(&timer_field);
            }

            let response = coordinator.request_fallback(params).await;
            debug!(
                field_path = %timer_field,
                success = response.success,
                "Debounced fallback finished"
            );
        });

        if let Some((_, previous)) = state.debounce_timers.insert(field_path, (timer_id, handle)) {
            previous.abort();
        }
    }

    /// Resolve many fields with bounded concurrency.
    ///
    /// Responses come back in input order.
    pub async fn batch_request(&self, params: Vec<FallbackParams>) -> Vec<FallbackResponse> {
        let limit = self.inner.settings.batch_concurrency.max(1);
        debug!(count = params.len(), limit, "Starting fallback batch");

        stream::iter(params)
            .map(|p| self.request_fallback(p))
            .buffered(limit)
            .collect()
            .await
    }

    /// Resolve every critical field in the background.
    ///
    /// Failures are logged, never returned. The handle may be ignored.
    pub fn prefetch_critical_fields(
        &self,
        report_id: impl Into<String>,
        wizard_id: impl Into<String>,
    ) -> JoinHandle<()> {
        let report_id = report_id.into();
        let wizard_id = wizard_id.into();
        let params: Vec<FallbackParams> = get_critical_fields()
            .iter()
            .map(|path| FallbackParams::new(report_id.as_str(), wizard_id.as_str(), *path))
            .collect();
        let coordinator = self.clone();

        tokio::spawn(async move {
            let paths: Vec<String> = params.iter().map(|p| p.field_path.clone()).collect();
            let responses = coordinator.batch_request(params).await;

            let mut resolved = 0_usize;
            for (path, response) in paths.iter().zip(&responses) {
                if response.success {
                    resolved += 1;
                } else if let Some(error) = &response.error {
                    warn!(report_id = %report_id, field_path = %path, error = %error, "Prefetch failed");
                }
            }
            info!(report_id = %report_id, resolved, total = responses.len(), "Critical field prefetch finished");
        })
    }

    /// True while any resolution for `field_path` is outstanding.
    pub fn is_loading(&self, field_path: &str) -> bool {
        self.inner.state.lock().loading.contains_key(field_path)
    }

    /// Last error recorded for `field_path`, cleared when a new attempt starts.
    pub fn error(&self, field_path: &str) -> Option<String> {
        self.inner.state.lock().errors.get(field_path).cloned()
    }

    /// Fresh cached value for one field of one report.
    pub fn cached_value(&self, report_id: &str, field_path: &str) -> Option<Value> {
        self.inner.cache.get(&cache_key(report_id, field_path)).map(|entry| entry.value)
    }

    /// Drop cached values of `field_path` under every report.
    pub fn invalidate_cache(&self, field_path: &str) -> usize {
        let removed = self.inner.cache.invalidate_field(field_path);
        debug!(field_path, removed, "Invalidated fallback cache");
        removed
    }

    pub fn invalidate_all_cache(&self) {
        self.inner.cache.invalidate_all();
        debug!("Invalidated entire fallback cache");
    }

    /// Start the periodic expiry sweep over this coordinator's cache.
    pub fn spawn_sweeper(&self) -> Result<CacheSweeper, String> {
        let mut sweeper =
            CacheSweeper::new(self.inner.cache.clone(), self.inner.settings.sweep_interval);
        sweeper.start()?;
        Ok(sweeper)
    }

    fn record_error(&self, field_path: &str, message: String) {
        self.inner.state.lock().errors.insert(field_path.to_string(), message);
    }
}

impl std::fmt::Debug for FallbackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCoordinator")
            .field("settings", &self.inner.settings)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pms_domain::{FallbackSource, PmsError, Result};
    use serde_json::json;

    use super::*;

    struct EchoResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FallbackResolver for EchoResolver {
        async fn resolve(&self, request: &FallbackRequest) -> Result<FallbackResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.field_path.starts_with("broken") {
                return Err(PmsError::Network("connection reset".into()));
            }
            Ok(FallbackResponse {
                success: true,
                value: json!(format!("resolved {}", request.field_description)),
                source: FallbackSource::AiEstimation,
                persisted: false,
                retry_count: 0,
                reasoning: None,
                error: None,
            })
        }
    }

    fn coordinator() -> (FallbackCoordinator, Arc<EchoResolver>) {
        let resolver = Arc::new(EchoResolver { calls: AtomicUsize::new(0) });
        (FallbackCoordinator::new(resolver.clone()), resolver)
    }

    #[tokio::test]
    async fn merges_registry_defaults_into_request() {
        let (coordinator, _) = coordinator();
        let response = coordinator
            .request_fallback(FallbackParams::new("r1", "w1", "opportunity_section.tam_value"))
            .await;

        assert_eq!(response.value, json!("resolved Total Addressable Market"));
    }

    #[tokio::test]
    async fn transport_error_becomes_failed_response() {
        let (coordinator, _) = coordinator();
        let response = coordinator.request_fallback(FallbackParams::new("r1", "w1", "broken.field")).await;

        assert!(!response.success);
        assert_eq!(response.source, FallbackSource::Static);
        assert!(response.value.is_null());
        assert!(response.error.as_deref().is_some_and(|e| e.contains("connection reset")));
        assert!(coordinator.error("broken.field").is_some());
        assert!(!coordinator.is_loading("broken.field"));
        assert!(coordinator.cached_value("r1", "broken.field").is_none());
    }

    #[tokio::test]
    async fn failed_field_can_be_retried_by_caller() {
        let (coordinator, resolver) = coordinator();
        coordinator.request_fallback(FallbackParams::new("r1", "w1", "broken.field")).await;
        coordinator.request_fallback(FallbackParams::new("r1", "w1", "broken.field")).await;

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn settings_follow_config() {
        let config = FallbackConfig { cache_ttl_secs: 30, batch_concurrency: 0, ..Default::default() };
        let settings = CoordinatorSettings::from(&config);

        assert_eq!(settings.cache_ttl, Duration::from_secs(30));
        assert_eq!(settings.batch_concurrency, 1);
    }

    #[tokio::test]
    async fn spawned_sweeper_runs_until_stopped() {
        let (coordinator, _) = coordinator();
        let mut sweeper = coordinator.spawn_sweeper().expect("sweeper");
        assert!(sweeper.is_running());
        sweeper.stop().await.expect("stop");
    }
}
