mod common;

use chrono::Duration;
use common::*;
use serde_json::json;
use tauri_plugin_drag_as_window::{CursorPosition, DragError, OutcomeKind, OutcomeMode};

#[tokio::test]
async fn dropped_card_hands_back_once_with_cursor_position() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let outcomes = Outcomes::default();

    let id = controller
        .start_drag("#card-1", json!({ "id": 7 }), Some(outcomes.handler()))
        .await
        .unwrap();

    let started = bridge.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].data, json!({ "id": 7 }));
    assert_eq!(started[0].image_len, PNG.len());
    assert_eq!(started[0].mode, OutcomeMode::HandBack);
    assert!(harness.sessions.get(id).is_some());

    let token = bridge.last_notify().unwrap();
    assert!(publish_outcome(&harness.registry, token, dropped_at(120.0, 340.0)));

    let seen = outcomes.all();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].result, OutcomeKind::Dropped);
    assert_eq!(seen[0].cursor_pos, CursorPosition::new(120.0, 340.0));
    assert!(harness.sessions.get(id).is_none());
    assert!(harness.registry.is_empty());
}

#[tokio::test]
async fn drop_outside_reports_create_window() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::CreateWindow,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let outcomes = Outcomes::default();

    controller
        .start_drag("#card-1", json!(null), Some(outcomes.handler()))
        .await
        .unwrap();
    publish_outcome(&harness.registry, bridge.last_notify().unwrap(), dropped_at(120.0, 340.0));

    let seen = outcomes.all();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].result, OutcomeKind::CreateWindow);
    assert_eq!(seen[0].cursor_pos, CursorPosition::new(120.0, 340.0));
}

#[tokio::test]
async fn cancelled_drag_is_never_reported_as_dropped() {
    for mode in [OutcomeMode::HandBack, OutcomeMode::CreateWindow] {
        let harness = Harness::new();
        let bridge = RecordingBridge::new();
        let controller = harness.controller(
            "main",
            mode,
            FakeDocument::with(&["#card-1"]),
            FakeSnapshot::Png,
            bridge.clone(),
        );
        let outcomes = Outcomes::default();

        controller
            .start_drag("#card-1", json!({ "id": 7 }), Some(outcomes.handler()))
            .await
            .unwrap();
        publish_outcome(&harness.registry, bridge.last_notify().unwrap(), cancelled_at(5.0, 6.0));

        let seen = outcomes.all();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_cancelled());
        assert_eq!(seen[0].cursor_pos, CursorPosition::new(5.0, 6.0));
    }
}

#[tokio::test]
async fn second_outcome_for_the_same_session_is_ignored() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let outcomes = Outcomes::default();

    controller
        .start_drag("#card-1", json!({}), Some(outcomes.handler()))
        .await
        .unwrap();
    let token = bridge.last_notify().unwrap();

    assert!(publish_outcome(&harness.registry, token, dropped_at(1.0, 2.0)));
    assert!(!publish_outcome(&harness.registry, token, cancelled_at(3.0, 4.0)));

    let seen = outcomes.all();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].result, OutcomeKind::Dropped);
}

#[tokio::test]
async fn missing_element_fails_before_any_native_call() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let outcomes = Outcomes::default();

    let err = controller
        .start_drag("#card-404", json!({}), Some(outcomes.handler()))
        .await
        .unwrap_err();

    assert!(matches!(err, DragError::ElementNotFound(ref selector) if selector == "#card-404"));
    assert!(bridge.started().is_empty());
    assert!(harness.registry.is_empty());
    assert!(harness.sessions.is_empty());
    assert!(outcomes.all().is_empty());
}

#[tokio::test]
async fn capture_failure_leaves_nothing_behind() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Broken("tainted canvas"),
        bridge.clone(),
    );

    let err = controller
        .start_drag("#card-1", json!({}), Some(Outcomes::default().handler()))
        .await
        .unwrap_err();

    assert!(matches!(err, DragError::CaptureFailed(ref reason) if reason == "tainted canvas"));
    assert!(bridge.started().is_empty());
    assert!(harness.registry.is_empty());
}

#[tokio::test]
async fn refused_drag_releases_its_token() {
    let harness = Harness::new();
    let bridge = RecordingBridge::refusing_start("no display");
    let controller = harness.controller(
        "main",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge,
    );
    let outcomes = Outcomes::default();

    let err = controller
        .start_drag("#card-1", json!({}), Some(outcomes.handler()))
        .await
        .unwrap_err();

    assert!(matches!(err, DragError::StartFailed(ref reason) if reason == "no display"));
    assert!(harness.registry.is_empty());
    assert!(harness.sessions.is_empty());
    assert!(outcomes.all().is_empty());
}

#[tokio::test]
async fn drag_without_handler_registers_nothing() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );

    controller.start_drag("#card-1", json!({ "id": 7 }), None).await.unwrap();

    assert_eq!(bridge.started().len(), 1);
    assert_eq!(bridge.last_notify(), None);
    assert!(harness.registry.is_empty());
    assert!(harness.sessions.is_empty());
}

#[tokio::test]
async fn concurrent_sessions_only_see_their_own_outcome() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let document = FakeDocument::with(&["#card-1", "#card-2"]);
    let first = harness.controller(
        "main",
        OutcomeMode::HandBack,
        document.clone(),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let second = harness.controller(
        "main",
        OutcomeMode::HandBack,
        document,
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let first_outcomes = Outcomes::default();
    let second_outcomes = Outcomes::default();

    let (a, b) = tokio::join!(
        first.start_drag("#card-1", json!({ "id": 1 }), Some(first_outcomes.handler())),
        second.start_drag("#card-2", json!({ "id": 2 }), Some(second_outcomes.handler())),
    );
    a.unwrap();
    b.unwrap();

    let started = bridge.started();
    assert_eq!(started.len(), 2);
    let token_of = |id: i64| {
        started
            .iter()
            .find(|drag| drag.data == json!({ "id": id }))
            .and_then(|drag| drag.notify)
            .unwrap()
    };
    let (first_token, second_token) = (token_of(1), token_of(2));
    assert_ne!(first_token, second_token);

    // Resolve in reverse order of start
    publish_outcome(&harness.registry, second_token, cancelled_at(2.0, 2.0));
    publish_outcome(&harness.registry, first_token, dropped_at(1.0, 1.0));

    let first_seen = first_outcomes.all();
    let second_seen = second_outcomes.all();
    assert_eq!(first_seen.len(), 1);
    assert_eq!(second_seen.len(), 1);
    assert_eq!(first_seen[0].result, OutcomeKind::Dropped);
    assert_eq!(first_seen[0].cursor_pos, CursorPosition::new(1.0, 1.0));
    assert_eq!(second_seen[0].result, OutcomeKind::Cancelled);
    assert_eq!(second_seen[0].cursor_pos, CursorPosition::new(2.0, 2.0));
}

#[tokio::test]
async fn undecodable_outcome_counts_as_cancelled() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "main",
        OutcomeMode::CreateWindow,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let outcomes = Outcomes::default();

    controller
        .start_drag("#card-1", json!(null), Some(outcomes.handler()))
        .await
        .unwrap();
    publish_outcome(&harness.registry, bridge.last_notify().unwrap(), json!("garbage"));

    let seen = outcomes.all();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_cancelled());
}

#[tokio::test]
async fn closing_the_window_drops_pending_sessions_silently() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness.controller(
        "editor",
        OutcomeMode::HandBack,
        FakeDocument::with(&["#card-1"]),
        FakeSnapshot::Png,
        bridge.clone(),
    );
    let outcomes = Outcomes::default();

    controller
        .start_drag("#card-1", json!({}), Some(outcomes.handler()))
        .await
        .unwrap();
    let token = bridge.last_notify().unwrap();

    assert_eq!(harness.sessions.evict_owner("editor", &harness.registry), 1);
    assert!(!publish_outcome(&harness.registry, token, dropped_at(0.0, 0.0)));
    assert!(outcomes.all().is_empty());
}

#[tokio::test]
async fn stale_sessions_are_released_on_next_start() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness
        .controller(
            "main",
            OutcomeMode::HandBack,
            FakeDocument::with(&["#card-1"]),
            FakeSnapshot::Png,
            bridge.clone(),
        )
        .with_stale_after(Some(Duration::zero()));
    let outcomes = Outcomes::default();

    controller
        .start_drag("#card-1", json!({}), Some(outcomes.handler()))
        .await
        .unwrap();
    let stale = bridge.last_notify().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    controller
        .start_drag("#card-1", json!({}), Some(Outcomes::default().handler()))
        .await
        .unwrap();

    assert!(!harness.registry.contains(stale));
    assert_eq!(harness.sessions.len(), 1);
    assert!(!publish_outcome(&harness.registry, stale, dropped_at(0.0, 0.0)));
    assert!(outcomes.all().is_empty());
}

#[tokio::test]
async fn oversized_stale_ttl_does_not_break_drags() {
    let harness = Harness::new();
    let bridge = RecordingBridge::new();
    let controller = harness
        .controller(
            "main",
            OutcomeMode::HandBack,
            FakeDocument::with(&["#card-1"]),
            FakeSnapshot::Png,
            bridge.clone(),
        )
        .with_stale_after(Duration::try_seconds(10_000_000_000_000));
    let outcomes = Outcomes::default();

    controller
        .start_drag("#card-1", json!({}), Some(outcomes.handler()))
        .await
        .unwrap();
    controller
        .start_drag("#card-1", json!({}), Some(outcomes.handler()))
        .await
        .unwrap();

    assert_eq!(harness.sessions.len(), 2);
    assert_eq!(bridge.started().len(), 2);
}
