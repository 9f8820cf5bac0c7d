// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus consumers.
//!
//! One loop per consumed topic. Each delivered message is handled on its own
//! task, so envelopes and sync requests run concurrently with no ordering
//! between them. Loops stop when the cancellation token fires; tasks already
//! spawned are tracked so the caller can wait for them.

use std::future::Future;
use std::sync::Arc;

use chatledger_core::events::{
    SyncChat, SyncChatMember, SyncUser, TOPIC_SYNC_CHAT, TOPIC_SYNC_CHATMEMBER, TOPIC_SYNC_USER,
    TOPIC_UPDATE, TOPIC_UPDATE_FAILED, TOPIC_UPDATE_PROCESSED, UpdateFailed, UpdateProcessed,
};
use chatledger_core::EventBus;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::context::PipelineContext;
use crate::dispatcher::Dispatcher;
use crate::feedback::{apply_failed, apply_processed};
use crate::sync::SyncWorker;

/// Subscribe every pipeline consumer and spawn its loop onto `tracker`.
///
/// Subscriptions are taken before this returns, so nothing published
/// afterwards is missed.
pub fn spawn_consumers(ctx: &PipelineContext, tracker: &TaskTracker, cancel: &CancellationToken) {
    let dispatcher = Dispatcher::new(ctx.clone());
    consume(ctx.bus.as_ref(), tracker, cancel, TOPIC_UPDATE, move |payload| {
        let dispatcher = dispatcher.clone();
        async move {
            dispatcher.handle_payload(payload).await;
        }
    });

    let store = ctx.store.clone();
    consume(ctx.bus.as_ref(), tracker, cancel, TOPIC_UPDATE_PROCESSED, move |payload| {
        let store = Arc::clone(&store);
        async move {
            if let Some(event) = decode::<UpdateProcessed>(TOPIC_UPDATE_PROCESSED, payload)
                && let Err(e) = apply_processed(store.as_ref(), &event).await
            {
                warn!(event_id = %event.event_id, error = %e, "failed to record processed outcome");
            }
        }
    });

    let store = ctx.store.clone();
    consume(ctx.bus.as_ref(), tracker, cancel, TOPIC_UPDATE_FAILED, move |payload| {
        let store = Arc::clone(&store);
        async move {
            if let Some(event) = decode::<UpdateFailed>(TOPIC_UPDATE_FAILED, payload)
                && let Err(e) = apply_failed(store.as_ref(), &event).await
            {
                warn!(event_id = %event.event_id, error = %e, "failed to record failed outcome");
            }
        }
    });

    let sync = SyncWorker::new(ctx.clone());
    let worker = sync.clone();
    consume(ctx.bus.as_ref(), tracker, cancel, TOPIC_SYNC_USER, move |payload| {
        let worker = worker.clone();
        async move {
            if let Some(request) = decode::<SyncUser>(TOPIC_SYNC_USER, payload) {
                worker.sync_user(request.user_id).await;
            }
        }
    });

    let worker = sync.clone();
    consume(ctx.bus.as_ref(), tracker, cancel, TOPIC_SYNC_CHAT, move |payload| {
        let worker = worker.clone();
        async move {
            if let Some(request) = decode::<SyncChat>(TOPIC_SYNC_CHAT, payload) {
                worker.sync_chat(request.chat_id).await;
            }
        }
    });

    consume(ctx.bus.as_ref(), tracker, cancel, TOPIC_SYNC_CHATMEMBER, move |payload| {
        let worker = sync.clone();
        async move {
            if let Some(request) = decode::<SyncChatMember>(TOPIC_SYNC_CHATMEMBER, payload) {
                worker.sync_chat_member(&request).await;
            }
        }
    });

    info!("pipeline consumers started");
}

fn decode<T: DeserializeOwned>(topic: &str, payload: Value) -> Option<T> {
    serde_json::from_value(payload)
        .inspect_err(|e| warn!(topic, error = %e, "dropping undecodable bus message"))
        .ok()
}

fn consume<F, Fut>(
    bus: &dyn EventBus,
    tracker: &TaskTracker,
    cancel: &CancellationToken,
    topic: &'static str,
    handler: F,
) where
    F: Fn(Value) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut rx = bus.subscribe(topic);
    let cancel = cancel.clone();
    let tasks = tracker.clone();
    tracker.spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Ok(message) => {
                        tasks.spawn(handler(message.payload));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(topic, skipped, "consumer lagged; messages dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!(topic, "consumer stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chatledger_core::events::TOPIC_LEDGER;
    use chatledger_core::types::TELEGRAM_SOURCE;
    use chatledger_core::{EntityStore, RawEvent, RawEventStatus};
    use chatledger_test_utils::{TestHarness, fixtures};
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn envelope_flows_to_processed_raw_event() {
        let h = TestHarness::new().await;
        let update = fixtures::update("message", fixtures::text_message(-100, 42, 7, "hi"));
        h.store
            .insert_raw_event(&RawEvent {
                id: "tg-1".into(),
                source: TELEGRAM_SOURCE.into(),
                payload: update.to_string(),
                processed: false,
                processed_at: None,
                status: RawEventStatus::Pending,
                error_message: None,
                retry_count: 0,
                locked_until: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        spawn_consumers(&testing::context(&h), &tracker, &cancel);

        h.bus
            .publish(TOPIC_UPDATE, json!({"event_id": "tg-1", "update": update}))
            .unwrap();

        let store = h.store.clone();
        wait_for(|| {
            let store = store.clone();
            async move {
                store
                    .get_raw_event("tg-1")
                    .await
                    .unwrap()
                    .is_some_and(|row| row.status == RawEventStatus::Done)
            }
        })
        .await;
        assert_eq!(h.bus.count(TOPIC_LEDGER), 1);

        cancel.cancel();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sync_request_reaches_worker() {
        let h = TestHarness::new().await;
        h.seed_user(42).await;

        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        spawn_consumers(&testing::context(&h), &tracker, &cancel);
        h.bus.publish(TOPIC_SYNC_USER, json!({"user_id": 42})).unwrap();

        let platform = h.platform.clone();
        wait_for(|| {
            let platform = platform.clone();
            async move { platform.calls("getUserProfilePhotos") == 1 }
        })
        .await;

        cancel.cancel();
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test]
    async fn undecodable_message_is_dropped() {
        let h = TestHarness::new().await;
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        spawn_consumers(&testing::context(&h), &tracker, &cancel);

        h.bus.publish(TOPIC_SYNC_CHAT, json!({"chat": "nope"})).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.platform.total_calls(), 0);

        cancel.cancel();
        tracker.close();
        tracker.wait().await;
    }
}
