//! Fallback value cache with TTL expiry
//!
//! Entries are keyed by `"{report_id}:{field_path}"`. Reads never delete:
//! an expired entry is simply reported as absent and stays in the map until
//! [`FallbackCache::cleanup_expired`] (driven by the sweeper) or an explicit
//! invalidation removes it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pms_domain::FallbackSource;
use serde_json::Value;

use super::clock::{Clock, SystemClock};

/// Build the cache key for one field of one report.
pub fn cache_key(report_id: &str, field_path: &str) -> String {
    format!("{report_id}:{field_path}")
}

/// A resolved value and when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub source: FallbackSource,
    pub cached_at: Instant,
    pub cached_at_utc: DateTime<Utc>,
}

/// Shared TTL cache of resolved fallback values.
///
/// Clones share storage.
#[derive(Clone)]
pub struct FallbackCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FallbackCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), ttl, clock }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, or `None` when absent or older than the TTL.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries.get(key).filter(|entry| !self.is_expired(entry, now)).cloned()
    }

    /// Store (or overwrite) the value for `key`.
    pub fn insert(&self, key: impl Into<String>, value: Value, source: FallbackSource) {
        let entry =
            CacheEntry { value, source, cached_at: self.clock.now(), cached_at_utc: Utc::now() };
        self.entries.write().insert(key.into(), entry);
    }

    /// Remove the entry for `field_path` under every report.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_field(&self, field_path: &str) -> usize {
        let suffix = format!(":{field_path}");
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.ends_with(&suffix));
        before - entries.len()
    }

    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    /// Remove expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    /// Stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.cached_at) >= self.ttl
    }
}

impl std::fmt::Debug for FallbackCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCache").field("ttl", &self.ttl).field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fallback::clock::MockClock;

    fn cache_with_clock() -> (FallbackCache, MockClock) {
        let clock = MockClock::new();
        let cache = FallbackCache::with_clock(Duration::from_secs(600), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn returns_fresh_entries() {
        let (cache, clock) = cache_with_clock();
        cache.insert("r1:a.b", json!("$4.2B"), FallbackSource::Perplexity);

        clock.advance(Duration::from_secs(599));
        let entry = cache.get("r1:a.b").expect("fresh");
        assert_eq!(entry.value, json!("$4.2B"));
        assert_eq!(entry.source, FallbackSource::Perplexity);
    }

    #[test]
    fn expired_entry_is_hidden_but_not_deleted_on_read() {
        let (cache, clock) = cache_with_clock();
        cache.insert("r1:a.b", json!("x"), FallbackSource::Static);

        clock.advance(Duration::from_secs(601));
        assert!(cache.get("r1:a.b").is_none());
        assert_eq!(cache.len(), 1, "reads must not delete");

        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_refreshes_timestamp() {
        let (cache, clock) = cache_with_clock();
        cache.insert("r1:a.b", json!("old"), FallbackSource::Static);
        clock.advance(Duration::from_secs(500));
        cache.insert("r1:a.b", json!("new"), FallbackSource::AiEstimation);
        clock.advance(Duration::from_secs(500));

        assert_eq!(cache.get("r1:a.b").map(|e| e.value), Some(json!("new")));
    }

    #[test]
    fn invalidate_field_spans_reports() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(cache_key("r1", "opportunity_section.tam_value"), json!(1), FallbackSource::Static);
        cache.insert(cache_key("r2", "opportunity_section.tam_value"), json!(2), FallbackSource::Static);
        cache.insert(cache_key("r1", "pricing_section.recommended_price"), json!(3), FallbackSource::Static);

        assert_eq!(cache.invalidate_field("opportunity_section.tam_value"), 2);
        assert!(cache.get("r1:opportunity_section.tam_value").is_none());
        assert!(cache.get("r2:opportunity_section.tam_value").is_none());
        assert!(cache.get("r1:pricing_section.recommended_price").is_some());
    }

    #[test]
    fn invalidate_field_does_not_match_partial_segments() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(cache_key("r1", "section.value"), json!(1), FallbackSource::Static);
        cache.insert(cache_key("r1", "other_section.value"), json!(2), FallbackSource::Static);

        assert_eq!(cache.invalidate_field("section.value"), 1);
        assert!(cache.get("r1:other_section.value").is_some());
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let (cache, _clock) = cache_with_clock();
        cache.insert("r1:a", json!(1), FallbackSource::Static);
        cache.insert("r2:b", json!(2), FallbackSource::Static);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
