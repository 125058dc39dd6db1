//! Shared test helpers for `pms-core` integration tests.
//!
//! `ScriptedResolver` answers every field with a deterministic value, can hold
//! calls at a gate until the test releases them, and records call counts and
//! peak concurrency.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pms_core::{FallbackResolver, ReportRefresher};
use pms_domain::{FallbackRequest, FallbackResponse, FallbackSource, PmsError, Result};
use serde_json::{json, Value};
use tokio::sync::Notify;

#[derive(Default)]
pub struct ScriptedResolver {
    calls: AtomicUsize,
    calls_by_path: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    gated: AtomicBool,
    gate: Notify,
    delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<Vec<String>>,
    persisting: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold every call until [`ScriptedResolver::release`].
    pub fn gated() -> Arc<Self> {
        let resolver = Self::default();
        resolver.gated.store(true, Ordering::SeqCst);
        Arc::new(resolver)
    }

    /// Close the gate again after a release.
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    pub fn delay(&self, field_path: &str, delay: Duration) {
        self.delays.lock().insert(field_path.to_string(), delay);
    }

    pub fn fail(&self, field_path: &str) {
        self.failing.lock().push(field_path.to_string());
    }

    /// Answer `field_path` as already written to the report row.
    pub fn persist(&self, field_path: &str) {
        self.persisting.lock().push(field_path.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, field_path: &str) -> usize {
        self.calls_by_path.lock().get(field_path).copied().unwrap_or(0)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        loop {
            let notified = self.gate.notified();
            if !self.gated.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// Value the resolver produces for a field.
pub fn value_for(field_path: &str) -> Value {
    json!(format!("value of {field_path}"))
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FallbackResolver for ScriptedResolver {
    async fn resolve(&self, request: &FallbackRequest) -> Result<FallbackResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_path.lock().entry(request.field_path.clone()).or_default() += 1;

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveGuard(&self.active);
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        self.wait_for_gate().await;
        let delay = self.delays.lock().get(&request.field_path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&request.field_path) {
            return Err(PmsError::Remote { status: 503, message: "resolver unavailable".into() });
        }

        Ok(FallbackResponse {
            success: true,
            value: value_for(&request.field_path),
            source: FallbackSource::Perplexity,
            persisted: self.persisting.lock().contains(&request.field_path),
            retry_count: 0,
            reasoning: None,
            error: None,
        })
    }
}

/// Refresher that records calls and always fails.
#[derive(Default)]
pub struct FailingRefresher {
    calls: AtomicUsize,
}

impl FailingRefresher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportRefresher for FailingRefresher {
    async fn refresh_report_data(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PmsError::Network("report refetch timed out".into()))
    }
}

/// Yield until `condition` holds, giving up after a second.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
