//! Smart fallback field bindings
//!
//! A binding ties one displayed report field to the shared
//! [`FallbackCoordinator`]. Each time the view hands it the field's current
//! stored value it decides whether a fallback is needed, requests one at most
//! once, and exposes the value to display:
//!
//! 1. the stored value when it is usable (formatted),
//! 2. otherwise the resolved fallback,
//! 3. otherwise the raw stored value, placeholder or not,
//! 4. otherwise nothing.
//!
//! When the resolver reports that it persisted the value, the owning report is
//! re-fetched through the [`ReportRefresher`] so sibling bindings see the
//! canonical value without their own round-trip.

use std::collections::HashMap;
use std::sync::Arc;

use pms_domain::constants::REASON_IN_PROGRESS;
use pms_domain::{ExpectedType, FallbackParams, FallbackResponse, FallbackSource};
use serde_json::Value;
use tracing::{debug, warn};

use super::classifier::requires_fallback;
use super::coordinator::FallbackCoordinator;
use super::ports::ReportRefresher;

/// Display transform applied to usable and resolved values.
pub type Formatter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Resolution state of one bound field.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingState {
    Idle,
    Requesting,
    Resolved { value: Value, source: FallbackSource, persisted: bool },
    Failed { error: String },
}

/// What to bind and how.
#[derive(Clone)]
pub struct BindingOptions {
    params: FallbackParams,
    skip_fallback: bool,
    formatter: Option<Formatter>,
}

impl BindingOptions {
    pub fn new(
        report_id: impl Into<String>,
        wizard_id: impl Into<String>,
        field_path: impl Into<String>,
    ) -> Self {
        Self {
            params: FallbackParams::new(report_id, wizard_id, field_path),
            skip_fallback: false,
            formatter: None,
        }
    }

    /// Never request a fallback; only format and display the stored value.
    pub fn skip_fallback(mut self, skip: bool) -> Self {
        self.skip_fallback = skip;
        self
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.params.field_description = Some(description.into());
        self
    }

    pub fn with_section_name(mut self, section: impl Into<String>) -> Self {
        self.params.section_name = Some(section.into());
        self
    }

    pub fn with_expected_type(mut self, expected: ExpectedType) -> Self {
        self.params.expected_type = Some(expected);
        self
    }

    pub fn field_path(&self) -> &str {
        &self.params.field_path
    }
}

/// Per-field bookkeeping shared by the single and batched bindings.
struct FieldSlot {
    options: BindingOptions,
    current: Option<Value>,
    state: BindingState,
    requested: bool,
}

impl FieldSlot {
    fn new(options: BindingOptions) -> Self {
        Self { options, current: None, state: BindingState::Idle, requested: false }
    }

    fn needs_request(&self) -> bool {
        !self.options.skip_fallback && !self.requested && requires_fallback(self.current.as_ref())
    }

    fn begin(&mut self) {
        self.requested = true;
        self.state = BindingState::Requesting;
    }

    /// Still lacking a value with no answer of its own yet.
    fn awaiting_value(&self) -> bool {
        !self.options.skip_fallback
            && matches!(self.state, BindingState::Idle)
            && requires_fallback(self.current.as_ref())
    }

    /// Own request running, or a sibling's request for the same field is.
    fn is_loading(&self, coordinator: &FallbackCoordinator) -> bool {
        matches!(self.state, BindingState::Requesting)
            || (self.awaiting_value() && coordinator.is_loading(self.options.field_path()))
    }

    /// Record a coordinator answer. Returns true when the value was persisted
    /// remotely and the report should be refreshed.
    fn apply(&mut self, response: FallbackResponse) -> bool {
        let field_path = self.options.field_path();

        if response.has_value() {
            let value = self.format(&response.value);
            debug!(field_path, source = %response.source, "Bound field resolved");
            self.state = BindingState::Resolved {
                value,
                source: response.source,
                persisted: response.persisted,
            };
            return response.persisted;
        }

        if response.reasoning.as_deref() == Some(REASON_IN_PROGRESS) {
            // Another binding owns the request; pick its cached result up on
            // the next update.
            self.state = BindingState::Idle;
            self.requested = false;
            return false;
        }

        let error = response
            .error
            .or(response.reasoning)
            .unwrap_or_else(|| "no fallback value available".to_string());
        debug!(field_path, error = %error, "Bound field fallback failed");
        self.state = BindingState::Failed { error };
        false
    }

    fn format(&self, value: &Value) -> Value {
        match &self.options.formatter {
            Some(formatter) => formatter(value),
            None => value.clone(),
        }
    }

    fn value(&self) -> Option<Value> {
        if !requires_fallback(self.current.as_ref()) {
            return self.current.as_ref().map(|v| self.format(v));
        }
        if let BindingState::Resolved { value, .. } = &self.state {
            return Some(value.clone());
        }
        self.current.clone().filter(|v| !v.is_null())
    }

    fn is_fallback(&self) -> bool {
        requires_fallback(self.current.as_ref()) && matches!(self.state, BindingState::Resolved { .. })
    }

    fn error(&self) -> Option<&str> {
        match &self.state {
            BindingState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Slots with a request in flight. Dropping the request future before the
/// answers are applied puts them back to `Idle` so a later update asks again.
struct InFlightSlots<'a> {
    slots: Vec<&'a mut FieldSlot>,
}

impl<'a> InFlightSlots<'a> {
    fn begin(mut slots: Vec<&'a mut FieldSlot>) -> Self {
        for slot in &mut slots {
            slot.begin();
        }
        Self { slots }
    }

    fn params(&self) -> Vec<FallbackParams> {
        self.slots.iter().map(|slot| slot.options.params.clone()).collect()
    }

    /// Apply answers in slot order. Returns true if any was persisted.
    fn settle(&mut self, responses: Vec<FallbackResponse>) -> bool {
        let mut persisted = false;
        for (slot, response) in self.slots.iter_mut().zip(responses) {
            persisted |= slot.apply(response);
        }
        persisted
    }
}

impl Drop for InFlightSlots<'_> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if matches!(slot.state, BindingState::Requesting) {
                debug!(field_path = slot.options.field_path(), "Bound field request dropped before an answer");
                slot.state = BindingState::Idle;
                slot.requested = false;
            }
        }
    }
}

async fn refresh(refresher: Option<&Arc<dyn ReportRefresher>>, report_id: &str) -> Option<String> {
    let refresher = refresher?;
    match refresher.refresh_report_data().await {
        Ok(()) => {
            debug!(report_id, "Report refreshed after persisted fallback");
            None
        }
        Err(err) => {
            warn!(report_id, error = %err, "Report refresh after persisted fallback failed");
            Some(err.to_string())
        }
    }
}

/// One report field bound to the shared coordinator.
pub struct SmartFallbackField {
    coordinator: FallbackCoordinator,
    refresher: Option<Arc<dyn ReportRefresher>>,
    slot: FieldSlot,
    refresh_error: Option<String>,
}

impl SmartFallbackField {
    pub fn new(coordinator: FallbackCoordinator, options: BindingOptions) -> Self {
        Self { coordinator, refresher: None, slot: FieldSlot::new(options), refresh_error: None }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn ReportRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Feed the field's current stored value (one view update).
    ///
    /// Requests a fallback the first time the value is found lacking; later
    /// updates never re-issue the request.
    pub async fn update(&mut self, current: Option<Value>) {
        self.slot.current = current;
        if self.slot.needs_request() {
            self.run_request().await;
        }
    }

    /// Explicit retry from the view, regardless of earlier attempts.
    pub async fn request_fallback(&mut self) {
        self.run_request().await;
    }

    /// Point the binding at a different field, starting over from `Idle`.
    pub fn rebind(&mut self, field_path: impl Into<String>) {
        let mut options = self.slot.options.clone();
        options.params.field_path = field_path.into();
        self.slot = FieldSlot::new(options);
        self.refresh_error = None;
    }

    pub fn value(&self) -> Option<Value> {
        self.slot.value()
    }

    pub fn is_fallback(&self) -> bool {
        self.slot.is_fallback()
    }

    /// True while this field waits on a remote answer, whether its own
    /// request or a sibling binding's request for the same field.
    pub fn is_loading(&self) -> bool {
        self.slot.is_loading(&self.coordinator)
    }

    /// Resolution error, or the error of the report refresh that followed a
    /// persisted fallback.
    pub fn error(&self) -> Option<&str> {
        self.slot.error().or(self.refresh_error.as_deref())
    }

    pub fn state(&self) -> &BindingState {
        &self.slot.state
    }

    pub fn field_path(&self) -> &str {
        self.slot.options.field_path()
    }

    async fn run_request(&mut self) {
        let params = self.slot.options.params.clone();
        let persisted = {
            let mut in_flight = InFlightSlots::begin(vec![&mut self.slot]);
            let response = self.coordinator.request_fallback(params).await;
            in_flight.settle(vec![response])
        };

        self.refresh_error = if persisted {
            let report_id = self.slot.options.params.report_id.clone();
            refresh(self.refresher.as_ref(), &report_id).await
        } else {
            None
        };
    }
}

/// Many fields of one report resolved through a single batch.
pub struct SmartFallbackFields {
    coordinator: FallbackCoordinator,
    refresher: Option<Arc<dyn ReportRefresher>>,
    report_id: String,
    slots: Vec<FieldSlot>,
    index: HashMap<String, usize>,
    refresh_error: Option<String>,
}

impl SmartFallbackFields {
    pub fn new<I, S>(
        coordinator: FallbackCoordinator,
        report_id: impl Into<String>,
        wizard_id: impl Into<String>,
        field_paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let report_id = report_id.into();
        let wizard_id = wizard_id.into();
        let options: Vec<BindingOptions> = field_paths
            .into_iter()
            .map(|path| BindingOptions::new(report_id.as_str(), wizard_id.as_str(), path))
            .collect();
        Self::from_options(coordinator, report_id, options)
    }

    /// Bind fields with individual options (formatters, overrides).
    pub fn from_options(
        coordinator: FallbackCoordinator,
        report_id: impl Into<String>,
        options: impl IntoIterator<Item = BindingOptions>,
    ) -> Self {
        let mut slots = Vec::new();
        let mut index = HashMap::new();
        for option in options {
            if index.contains_key(option.field_path()) {
                continue;
            }
            index.insert(option.field_path().to_string(), slots.len());
            slots.push(FieldSlot::new(option));
        }

        Self {
            coordinator,
            refresher: None,
            report_id: report_id.into(),
            slots,
            index,
            refresh_error: None,
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn ReportRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Feed current stored values, looked up per field path, and resolve the
    /// fields that need it and were not requested yet in one batch.
    pub async fn update<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<Value>,
    {
        for slot in &mut self.slots {
            slot.current = lookup(slot.options.field_path());
        }

        let pending: Vec<&mut FieldSlot> = self.slots.iter_mut().filter(|slot| slot.needs_request()).collect();
        if pending.is_empty() {
            return;
        }

        let persisted = {
            let mut in_flight = InFlightSlots::begin(pending);
            let params = in_flight.params();
            debug!(report_id = %self.report_id, count = params.len(), "Requesting batched fallbacks");
            let responses = self.coordinator.batch_request(params).await;
            in_flight.settle(responses)
        };

        self.refresh_error = if persisted {
            refresh(self.refresher.as_ref(), &self.report_id).await
        } else {
            None
        };
    }

    pub fn value(&self, field_path: &str) -> Option<Value> {
        self.slot(field_path).and_then(FieldSlot::value)
    }

    pub fn is_fallback(&self, field_path: &str) -> bool {
        self.slot(field_path).is_some_and(FieldSlot::is_fallback)
    }

    pub fn is_loading(&self, field_path: &str) -> bool {
        self.slot(field_path).is_some_and(|s| s.is_loading(&self.coordinator))
    }

    pub fn error(&self, field_path: &str) -> Option<&str> {
        self.slot(field_path).and_then(FieldSlot::error)
    }

    pub fn state(&self, field_path: &str) -> Option<&BindingState> {
        self.slot(field_path).map(|s| &s.state)
    }

    /// Error of the last report refresh, if it failed.
    pub fn refresh_error(&self) -> Option<&str> {
        self.refresh_error.as_deref()
    }

    /// Number of fields currently displaying a fallback value.
    pub fn fallback_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_fallback()).count()
    }

    fn slot(&self, field_path: &str) -> Option<&FieldSlot> {
        self.index.get(field_path).map(|&i| &self.slots[i])
    }
}
