// crates/app/src/sync_loop.rs
//! The background sync loop: runs `SyncEngine` on a periodic ticker or
//! on-demand (the `S` hotkey, via `sync_trigger`), and refreshes the
//! coordinator's in-memory mirror once a run commits (spec.md §2 "Refresh
//! flows C8 → C4 → C3 → C2").
//!
//! Per spec.md §5 "a second refresh while one is running is ignored": the
//! loop is strictly sequential (one `SyncEngine::run` at a time), and any
//! trigger/tick that arrives mid-run is coalesced into at most one
//! follow-up pass rather than queuing a burst of immediate re-runs.

use std::sync::Arc;
use std::time::Duration;

use taskboard_core::Config;
use taskboard_coordinator::EditCoordinator;
use taskboard_db::Database;
use taskboard_remote::GraphQlClient;
use taskboard_sync::SyncEngine;
use taskboard_ui::sync_progress::{SyncProgress, SyncProgressSender};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Spawns the loop and returns the `watch::Receiver` the UI subscribes to
/// for progress. `trigger_rx` carries manual refresh requests from the UI.
pub fn spawn(
    client: Arc<GraphQlClient>,
    db: Arc<Database>,
    config: Arc<Config>,
    coordinator: EditCoordinator,
    mut trigger_rx: mpsc::UnboundedReceiver<()>,
    interval: Duration,
) -> watch::Receiver<SyncProgress> {
    let (sender, rx) = SyncProgressSender::channel();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Run once immediately on startup so the UI isn't empty for a
        // full interval before the first pass completes.
        run_once(&client, &db, &config, &coordinator, &sender).await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                got = trigger_rx.recv() => {
                    if got.is_none() {
                        return;
                    }
                    // Drain any further triggers that piled up; they all
                    // collapse into the one pass we're about to run.
                    while trigger_rx.try_recv().is_ok() {}
                }
            }
            run_once(&client, &db, &config, &coordinator, &sender).await;
        }
    });

    rx
}

async fn run_once(
    client: &Arc<GraphQlClient>,
    db: &Arc<Database>,
    config: &Arc<Config>,
    coordinator: &EditCoordinator,
    sender: &SyncProgressSender,
) {
    let engine = SyncEngine::new(client, db, config);
    match engine.run(false, |done, total, status| sender.report(done, total, status)).await {
        Ok(result) => {
            let summary = if result.partial {
                result.message.unwrap_or_else(|| "partial sync".to_string())
            } else {
                format!(
                    "synced {} rows ({} new, {} updated)",
                    result.rows.len(),
                    result.inserted,
                    result.updated
                )
            };
            info!(rows = result.rows.len(), partial = result.partial, "sync run finished");
            match db.load().await {
                Ok(tasks) => coordinator.set_tasks(tasks).await,
                Err(e) => warn!(error = %e, "failed to reload tasks after sync"),
            }
            sender.finish(summary);
        }
        Err(e) => {
            warn!(error = %e, "sync run failed");
            sender.finish(format!("sync failed: {e}"));
        }
    }
}
