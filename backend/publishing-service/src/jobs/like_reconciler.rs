//! Like Counter Reconciler
//!
//! Periodically rewrites every post's cached `total_likes` from the like
//! ledger. This heals counters left behind when a process stopped between
//! the ledger write and the counter write of a like or unlike.
//!
//! A sweep that lands between the two writes of a concurrent like or unlike
//! is off by one for that post; the next sweep corrects it.

use std::time::{Duration, Instant};

use tokio::time::interval;

use crate::metrics;
use crate::services::EngagementService;

pub async fn start_like_reconciler(
    engagement: EngagementService,
    check_interval: Duration,
    batch_size: i64,
) {
    tracing::info!(
        "Starting like reconciler background job (interval={}s, batch_size={})",
        check_interval.as_secs(),
        batch_size
    );

    let mut ticker = interval(check_interval);
    // The first tick completes immediately; skip it so startup is not a sweep.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        run_once(&engagement, batch_size).await;
    }
}

async fn run_once(engagement: &EngagementService, batch_size: i64) {
    let cycle_start = Instant::now();

    match engagement.reconcile_all(batch_size).await {
        Ok(report) => {
            metrics::record_reconcile_run("success");
            tracing::info!(
                scanned = report.scanned,
                corrected = report.corrected,
                failed = report.failed,
                duration_ms = cycle_start.elapsed().as_millis() as u64,
                "Like reconciliation cycle completed"
            );
        }
        Err(e) => {
            metrics::record_reconcile_run("error");
            tracing::error!(
                error = %e,
                duration_ms = cycle_start.elapsed().as_millis() as u64,
                "Like reconciliation failed"
            );
        }
    }
}
