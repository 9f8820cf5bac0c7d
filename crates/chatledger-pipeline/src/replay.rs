// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Republishes unprocessed raw events onto the update topic.
//!
//! Rows are leased while in flight, so overlapping sweeps never publish the
//! same row twice within one lease. Failed rows come back until they reach
//! `max_retries`; after that they stay as dead letters.

use std::sync::Arc;
use std::time::Duration;

use chatledger_config::model::ReplayConfig;
use chatledger_core::update::Update;
use chatledger_core::{BusEvent, EntityStore, Envelope, EventBus, LedgerError};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::metrics;

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub claimed: usize,
    pub published: usize,
    /// Rows whose payload was not an update; marked failed.
    pub malformed: usize,
    /// Ids of the published rows, in claim order.
    pub event_ids: Vec<String>,
}

pub struct ReplaySweep {
    store: Arc<dyn EntityStore>,
    bus: Arc<dyn EventBus>,
    batch_size: usize,
    max_retries: u32,
    lease: Duration,
}

impl ReplaySweep {
    pub fn new(
        store: Arc<dyn EntityStore>,
        bus: Arc<dyn EventBus>,
        batch_size: usize,
        max_retries: u32,
        lease: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            batch_size,
            max_retries,
            lease,
        }
    }

    pub fn from_config(
        config: &ReplayConfig,
        store: Arc<dyn EntityStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self::new(
            store,
            bus,
            config.batch_size,
            config.max_retries,
            Duration::from_secs(config.lease_secs),
        )
    }

    /// Claim one batch and publish it. A bus failure stops the sweep; rows
    /// already claimed are retried once their lease expires.
    pub async fn run_once(&self) -> Result<ReplayReport, LedgerError> {
        let claimed = self
            .store
            .claim_raw_events(self.batch_size, self.max_retries, self.lease)
            .await?;
        let mut report = ReplayReport {
            claimed: claimed.len(),
            ..ReplayReport::default()
        };

        for event in claimed {
            let update: Update = match serde_json::from_str(&event.payload) {
                Ok(update) => update,
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "raw event payload is not an update");
                    self.store
                        .mark_raw_event_failed(&event.id, Utc::now(), &format!("malformed payload: {e}"))
                        .await?;
                    report.malformed += 1;
                    continue;
                }
            };
            debug!(event_id = %event.id, retry_count = event.retry_count, "replaying raw event");
            self.bus.emit(BusEvent::Update(Envelope {
                event_id: event.id.clone(),
                update,
            }))?;
            report.published += 1;
            report.event_ids.push(event.id);
        }

        metrics::record_replayed(report.published);
        if report.claimed > 0 {
            info!(
                claimed = report.claimed,
                published = report.published,
                malformed = report.malformed,
                "replay sweep finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatledger_core::events::TOPIC_UPDATE;
    use chatledger_core::types::TELEGRAM_SOURCE;
    use chatledger_core::{RawEvent, RawEventStatus};
    use chatledger_test_utils::TestHarness;
    use chrono::DateTime;

    fn raw(id: &str, payload: &str) -> RawEvent {
        RawEvent {
            id: id.into(),
            source: TELEGRAM_SOURCE.into(),
            payload: payload.into(),
            processed: false,
            processed_at: None,
            status: RawEventStatus::Pending,
            error_message: None,
            retry_count: 0,
            locked_until: None,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn sweep(h: &TestHarness, max_retries: u32) -> ReplaySweep {
        ReplaySweep::new(
            h.store.clone(),
            h.bus.clone(),
            10,
            max_retries,
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn pending_rows_are_published_once_per_lease() {
        let h = TestHarness::new().await;
        h.store
            .insert_raw_event(&raw("tg-1", r#"{"update_id":1,"message":{"message_id":1}}"#))
            .await
            .unwrap();

        let first = sweep(&h, 3).run_once().await.unwrap();
        assert_eq!(first.published, 1);
        assert_eq!(first.event_ids, ["tg-1"]);
        let published = h.bus.on(TOPIC_UPDATE);
        assert_eq!(published[0]["event_id"], "tg-1");
        assert_eq!(published[0]["update"]["update_id"], 1);

        let second = sweep(&h, 3).run_once().await.unwrap();
        assert_eq!(second, ReplayReport::default());
    }

    #[tokio::test]
    async fn malformed_payload_is_marked_failed() {
        let h = TestHarness::new().await;
        h.store.insert_raw_event(&raw("tg-2", "not json")).await.unwrap();

        let report = sweep(&h, 3).run_once().await.unwrap();

        assert_eq!(report.malformed, 1);
        assert_eq!(h.bus.count(TOPIC_UPDATE), 0);
        let row = h.store.get_raw_event("tg-2").await.unwrap().unwrap();
        assert_eq!(row.status, RawEventStatus::Failed);
        assert_eq!(row.retry_count, 1);
    }

    #[tokio::test]
    async fn exhausted_rows_are_left_alone() {
        let h = TestHarness::new().await;
        let mut dead = raw("tg-3", r#"{"update_id":3}"#);
        dead.status = RawEventStatus::Failed;
        dead.retry_count = 3;
        h.store.insert_raw_event(&dead).await.unwrap();

        let report = sweep(&h, 3).run_once().await.unwrap();
        assert_eq!(report.claimed, 0);
    }

    #[tokio::test]
    async fn bus_failure_is_reported() {
        let h = TestHarness::new().await;
        h.bus.fail_topic(TOPIC_UPDATE);
        h.store
            .insert_raw_event(&raw("tg-4", r#"{"update_id":4}"#))
            .await
            .unwrap();

        let err = sweep(&h, 3).run_once().await.unwrap_err();
        assert!(err.is_infrastructure());
    }
}
