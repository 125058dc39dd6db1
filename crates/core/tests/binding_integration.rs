//! Integration tests for field bindings sharing one coordinator

mod support;

use std::sync::Arc;
use std::time::Duration;

use pms_core::{BindingOptions, BindingState, FallbackCoordinator, SmartFallbackField, SmartFallbackFields};
use pms_domain::ReportRecord;
use serde_json::json;
use support::{value_for, wait_until, FailingRefresher, ScriptedResolver};

const TAM: &str = "opportunity_section.tam_value";

#[tokio::test]
async fn placeholder_shows_fallback_and_valid_value_shows_itself() {
    let resolver = ScriptedResolver::new();
    let coordinator = FallbackCoordinator::new(resolver.clone());

    let mut placeholder = SmartFallbackField::new(coordinator.clone(), BindingOptions::new("r1", "w1", TAM));
    placeholder.update(Some(json!("..."))).await;
    assert_eq!(placeholder.value(), Some(value_for(TAM)));
    assert!(placeholder.is_fallback());

    let mut valid = SmartFallbackField::new(coordinator, BindingOptions::new("r2", "w1", TAM));
    valid.update(Some(json!("$4.2B"))).await;
    assert_eq!(valid.value(), Some(json!("$4.2B")));
    assert!(!valid.is_fallback());

    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn sibling_binding_picks_up_result_of_in_flight_request() {
    let resolver = ScriptedResolver::gated();
    let coordinator = FallbackCoordinator::new(resolver.clone());

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            let mut field = SmartFallbackField::new(coordinator, BindingOptions::new("r1", "w1", TAM));
            field.update(None).await;
            field
        }
    });
    wait_until(|| resolver.calls() == 1).await;

    let mut sibling = SmartFallbackField::new(coordinator.clone(), BindingOptions::new("r1", "w1", TAM));
    sibling.update(None).await;
    assert_eq!(*sibling.state(), BindingState::Idle);
    assert_eq!(sibling.value(), None);
    assert!(sibling.is_loading());

    resolver.release();
    let first = first.await.unwrap();
    assert_eq!(first.value(), Some(value_for(TAM)));
    assert!(!sibling.is_loading());

    sibling.update(None).await;
    assert_eq!(sibling.value(), Some(value_for(TAM)));
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn batched_fields_show_loading_while_another_binding_resolves() {
    let resolver = ScriptedResolver::gated();
    let coordinator = FallbackCoordinator::new(resolver.clone());

    let owner = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            let mut field = SmartFallbackField::new(coordinator, BindingOptions::new("r1", "w1", TAM));
            field.update(None).await;
        }
    });
    wait_until(|| resolver.calls() == 1).await;

    let mut fields = SmartFallbackFields::new(coordinator.clone(), "r1", "w1", [TAM]);
    fields.update(|_| Some(json!("..."))).await;
    assert!(fields.is_loading(TAM));
    assert_eq!(fields.state(TAM), Some(&BindingState::Idle));

    resolver.release();
    owner.await.unwrap();
    assert!(!fields.is_loading(TAM));

    fields.update(|_| Some(json!("..."))).await;
    assert_eq!(fields.value(TAM), Some(value_for(TAM)));
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn cancelled_update_requests_again_on_next_update() {
    let resolver = ScriptedResolver::gated();
    let coordinator = FallbackCoordinator::new(resolver.clone());
    let mut field = SmartFallbackField::new(coordinator.clone(), BindingOptions::new("r1", "w1", TAM));

    let timed_out = tokio::time::timeout(Duration::from_millis(50), field.update(None)).await;
    assert!(timed_out.is_err());
    assert_eq!(*field.state(), BindingState::Idle);
    assert!(!field.is_loading());
    assert!(!coordinator.is_loading(TAM));

    resolver.release();
    field.update(None).await;

    assert_eq!(field.value(), Some(value_for(TAM)));
    assert!(!field.is_loading());
    assert_eq!(resolver.calls(), 2);
}

#[tokio::test]
async fn cancelled_batch_requests_again_on_next_update() {
    let resolver = ScriptedResolver::gated();
    let coordinator = FallbackCoordinator::new(resolver.clone());
    let sam = "opportunity_section.sam_value";
    let mut fields = SmartFallbackFields::new(coordinator, "r1", "w1", [TAM, sam]);

    let timed_out = tokio::time::timeout(Duration::from_millis(50), fields.update(|_| None)).await;
    assert!(timed_out.is_err());
    assert_eq!(fields.state(TAM), Some(&BindingState::Idle));
    assert_eq!(fields.state(sam), Some(&BindingState::Idle));

    resolver.release();
    fields.update(|_| None).await;

    assert_eq!(fields.value(TAM), Some(value_for(TAM)));
    assert_eq!(fields.value(sam), Some(value_for(sam)));
    assert_eq!(resolver.calls_for(TAM), 2);
}

#[tokio::test]
async fn refresh_error_does_not_outlive_the_next_answer() {
    let resolver = ScriptedResolver::new();
    resolver.persist(TAM);
    let coordinator = FallbackCoordinator::new(resolver.clone());
    let refresher = Arc::new(FailingRefresher::default());
    let mut field = SmartFallbackField::new(coordinator.clone(), BindingOptions::new("r1", "w1", TAM))
        .with_refresher(refresher.clone());

    field.update(None).await;
    assert_eq!(field.value(), Some(value_for(TAM)));
    assert!(field.error().is_some_and(|e| e.contains("refetch timed out")));
    assert_eq!(refresher.calls(), 1);

    // A sibling now owns a fresh request for the same field.
    coordinator.invalidate_all_cache();
    resolver.hold();
    let sibling = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            let mut field = SmartFallbackField::new(coordinator, BindingOptions::new("r1", "w1", TAM));
            field.update(None).await;
        }
    });
    wait_until(|| resolver.calls() == 2).await;

    field.request_fallback().await;
    assert_eq!(*field.state(), BindingState::Idle);
    assert!(field.error().is_none());
    assert!(field.is_loading());

    resolver.release();
    sibling.await.unwrap();
}

#[tokio::test]
async fn batched_fields_read_from_report_record() {
    let resolver = ScriptedResolver::new();
    let coordinator = FallbackCoordinator::new(resolver.clone());
    let mut record = ReportRecord::pending("r1", "w1");
    record.report_data = Some(json!({
        "opportunity_section": {
            "tam_value": "$12B",
            "sam_value": "N/A",
            "som_value": ""
        },
        "competitive_section": { "direct_competitors": ["...", "-"] }
    }));

    let mut fields = SmartFallbackFields::new(
        coordinator,
        "r1",
        "w1",
        [
            TAM,
            "opportunity_section.sam_value",
            "opportunity_section.som_value",
            "competitive_section.direct_competitors",
        ],
    );
    fields.update(|path| record.field(path).cloned()).await;

    assert_eq!(resolver.calls(), 3);
    assert_eq!(resolver.calls_for(TAM), 0);
    assert_eq!(fields.value(TAM), Some(json!("$12B")));
    assert_eq!(fields.value("competitive_section.direct_competitors"), Some(value_for("competitive_section.direct_competitors")));
    assert_eq!(fields.fallback_count(), 3);
}
