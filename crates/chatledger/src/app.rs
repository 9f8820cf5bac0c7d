// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the concrete collaborators from configuration.

use std::sync::Arc;
use std::time::Duration;

use chatledger_bus::LocalBus;
use chatledger_config::LedgerConfig;
use chatledger_core::LedgerError;
use chatledger_media::FsAssetStore;
use chatledger_pipeline::{PipelineContext, ReplaySweep, worker};
use chatledger_storage::SqliteStore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// How long shutdown waits for in-flight handlers.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a command needs, opened from one config.
pub struct App {
    pub config: LedgerConfig,
    pub store: Arc<SqliteStore>,
    pub ctx: PipelineContext,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl App {
    /// Open the store and build the bus, platform client and asset store.
    pub async fn open(config: LedgerConfig) -> Result<Self, LedgerError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);
        let bus = Arc::new(LocalBus::new(config.bus.capacity));
        let platform = chatledger_telegram::platform_from_config(&config.telegram)?;
        let assets = Arc::new(FsAssetStore::new(&config.media.root));
        info!(
            database = %config.storage.database_path,
            media_root = %config.media.root,
            "components ready"
        );

        let ctx = PipelineContext::new(store.clone(), bus, platform, assets);
        Ok(Self {
            config,
            store,
            ctx,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the internal cancellation token, e.g. with a signal-driven one.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Subscribe the pipeline consumers to the bus.
    pub fn start_consumers(&self) {
        worker::spawn_consumers(&self.ctx, &self.tracker, &self.cancel);
    }

    pub fn replay_sweep(&self) -> ReplaySweep {
        ReplaySweep::from_config(
            &self.config.replay,
            self.ctx.store.clone(),
            self.ctx.bus.clone(),
        )
    }

    /// Stop consumers, wait for in-flight handlers, checkpoint the database.
    pub async fn shutdown(self) -> Result<(), LedgerError> {
        self.cancel.cancel();
        self.tracker.close();
        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.tracker.len(),
                "timeout reached, some handlers interrupted"
            );
        }
        self.store.close().await
    }
}
