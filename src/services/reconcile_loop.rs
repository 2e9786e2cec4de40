use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use crate::application::usecases::reconcile_sweeper::ReconcileSweeperUseCase;

/// Sweeps once, then every `interval` when one is configured. Failures only end the
/// current attempt.
pub async fn run(sweeper: Arc<ReconcileSweeperUseCase>, interval: Option<Duration>) -> Result<()> {
    loop {
        sweep_once(&sweeper).await;

        let Some(interval) = interval else {
            info!("reconcile_loop: no interval configured, startup sweep only");
            return Ok(());
        };
        tokio::time::sleep(interval).await;
    }
}

async fn sweep_once(sweeper: &ReconcileSweeperUseCase) {
    match sweeper.sweep(Utc::now()).await {
        Ok(report) => info!(
            fetched = report.fetched,
            applied = report.applied,
            already_applied = report.already_applied,
            skipped = report.skipped,
            failed = report.failed,
            "reconcile_loop: sweep finished"
        ),
        Err(err) => error!(error = %err, "reconcile_loop: sweep aborted"),
    }
}
