// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatledger serve` command implementation.
//!
//! Subscribes the dispatcher, feedback handler and sync workers to the bus,
//! then runs the replay sweep on an interval until SIGINT or SIGTERM.

use std::time::Duration;

use chatledger_config::LedgerConfig;
use chatledger_core::LedgerError;
use chatledger_pipeline::metrics::describe_metrics;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::shutdown;

/// Runs the `chatledger serve` command.
pub async fn run_serve(config: LedgerConfig) -> Result<(), LedgerError> {
    info!(name = %config.service.name, "starting chatledger serve");
    describe_metrics();

    let app = App::open(config)
        .await?
        .with_cancel(shutdown::install_signal_handler());
    app.start_consumers();

    if app.config.replay.enabled {
        spawn_replay_ticker(&app);
    } else {
        info!("replay sweep disabled");
    }

    app.cancel_token().cancelled().await;
    info!("draining in-flight work");
    app.shutdown().await?;

    info!("chatledger serve shutdown complete");
    Ok(())
}

fn spawn_replay_ticker(app: &App) {
    let sweep = app.replay_sweep();
    let cancel = app.cancel_token().clone();
    let interval_secs = app.config.replay.interval_secs;

    app.tracker().spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match sweep.run_once().await {
                        Ok(report) if report.claimed == 0 => debug!("replay sweep found nothing"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "replay sweep failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("replay ticker shutting down");
                    break;
                }
            }
        }
    });
    info!(interval_secs, "replay sweep scheduled");
}
