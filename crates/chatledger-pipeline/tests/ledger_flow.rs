// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end dispatch scenarios over a real SQLite store.

use chatledger_core::events::{TOPIC_LEDGER, TOPIC_SYNC_USER, TOPIC_UPDATE_PROCESSED};
use chatledger_core::{EntityStore, MembershipStatus};
use chatledger_pipeline::{Dispatcher, PipelineContext, StepOutcome};
use chatledger_test_utils::fixtures::{self, envelope, update};
use chatledger_test_utils::TestHarness;
use chrono::DateTime;
use serde_json::json;

fn dispatcher(h: &TestHarness) -> Dispatcher {
    Dispatcher::new(PipelineContext::new(
        h.store.clone(),
        h.bus.clone(),
        h.platform.clone(),
        h.assets.clone(),
    ))
}

#[tokio::test]
async fn join_then_leave_stamps_both_transitions() {
    let h = TestHarness::new().await;
    let d = dispatcher(&h);
    let t1 = fixtures::DATE;
    let t2 = fixtures::DATE + 3_600;

    d.dispatch(&envelope(
        "e1",
        update("chat_member", fixtures::member_update(-100, 42, 7, "left", "member", t1)),
    ))
    .await;
    d.dispatch(&envelope(
        "e2",
        update("chat_member", fixtures::member_update(-100, 42, 8, "member", "left", t2)),
    ))
    .await;

    let row = h.store.get_membership(42, -100).await.unwrap().unwrap();
    assert_eq!(row.status, MembershipStatus::Left);
    assert_eq!(row.joined_at, DateTime::from_timestamp(t1, 0));
    assert_eq!(row.added_by, Some(7));
    assert_eq!(row.left_at, DateTime::from_timestamp(t2, 0));
    assert_eq!(row.removed_by, Some(8));
    assert_eq!(h.bus.count(TOPIC_UPDATE_PROCESSED), 2);
}

#[tokio::test]
async fn later_update_merges_user_fields() {
    let h = TestHarness::new().await;
    let d = dispatcher(&h);
    let first = fixtures::message(
        fixtures::group_json(-100),
        1,
        1,
        json!({"text": "hi", "from": {"id": 1, "first_name": "Ana", "username": "ana1"}}),
    );
    let second = fixtures::message(
        fixtures::group_json(-100),
        1,
        2,
        json!({"text": "again", "from": {"id": 1, "first_name": ""}}),
    );

    d.dispatch(&envelope("e1", update("message", first))).await;
    d.dispatch(&envelope("e2", update("message", second))).await;

    let user = h.store.get_user(1).await.unwrap().unwrap();
    assert_eq!(user.first_name, "Ana");
    assert_eq!(user.username, None);
    assert_eq!(h.bus.count(TOPIC_SYNC_USER), 1);
}

#[tokio::test]
async fn forwards_are_stored_without_ledger_events() {
    let h = TestHarness::new().await;
    let d = dispatcher(&h);
    let own = fixtures::message(
        fixtures::group_json(-100),
        42,
        1,
        json!({"text": "mine", "forward_origin": {"type": "user", "sender_user": {"id": 42}}}),
    );
    let foreign = fixtures::message(
        fixtures::group_json(-100),
        42,
        2,
        json!({"text": "theirs", "forward_origin": {"type": "user", "sender_user": {"id": 99}}}),
    );

    d.dispatch(&envelope("e1", update("message", own))).await;
    d.dispatch(&envelope("e2", update("message", foreign))).await;

    assert!(!h.store.get_message(-100, 1).await.unwrap().unwrap().is_external_forward);
    assert!(h.store.get_message(-100, 2).await.unwrap().unwrap().is_external_forward);
    assert_eq!(h.bus.count(TOPIC_LEDGER), 1);
}

#[tokio::test]
async fn message_and_reaction_in_one_update() {
    let h = TestHarness::new().await;
    h.seed_user(43).await;
    let d = dispatcher(&h);
    let env = envelope(
        "e1",
        json!({
            "update_id": 1,
            "message": fixtures::text_message(-100, 42, 7, "hi"),
            "message_reaction": fixtures::reaction(-100, 43, 7, Some("👍")),
        }),
    );

    let report = d.dispatch(&env).await;

    assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::Completed));
    let types: Vec<_> = h
        .bus
        .on(TOPIC_LEDGER)
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, ["text", "reaction"]);
}

#[tokio::test]
async fn reaction_on_unknown_message_writes_nothing() {
    let h = TestHarness::new().await;
    let report = dispatcher(&h)
        .dispatch(&envelope(
            "e1",
            update("message_reaction", fixtures::reaction(-100, 43, 999, Some("🔥"))),
        ))
        .await;

    assert!(report.is_success());
    assert_eq!(h.bus.count(TOPIC_LEDGER), 0);
    assert!(h.store.get_user(43).await.unwrap().is_none());
    assert!(h.store.get_message(-100, 999).await.unwrap().is_none());
    assert!(h.store.get_reaction(-100, 999, 43).await.unwrap().is_none());
}
