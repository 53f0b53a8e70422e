use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use tokio::time::{sleep, Instant};

use crate::error::AppResult;
use crate::services::owner_payouts::{run_owner_payout_sweep, PayoutSweepResult};
use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(15);
const MONTHLY_RUN_HOUR: u32 = 5;
const FAILED_SWEEP_RETRY: Duration = Duration::from_secs(15 * 60);

/// Run the background scheduler loop.
///
/// The monthly sweep is awaited inline. A month counts as done only when
/// every property was processed; otherwise the sweep is retried after
/// `FAILED_SWEEP_RETRY`.
pub async fn run_background_scheduler(state: AppState) {
    let store = match state.store() {
        Ok(store) => store,
        Err(_) => {
            tracing::warn!("Scheduler: no database pool configured, exiting");
            return;
        }
    };
    tracing::info!(
        timezone = %state.config.business_timezone,
        "Background scheduler started"
    );

    let mut last_monthly_run: Option<(i32, u32)> = None;
    let mut last_failed_sweep: Option<Instant> = None;

    loop {
        sleep(POLL_INTERVAL).await;

        let now_local = Utc::now().with_timezone(&state.config.business_timezone);
        if !monthly_run_due(&now_local, last_monthly_run) {
            continue;
        }
        if !retry_allowed(last_failed_sweep.map(|failed_at| failed_at.elapsed())) {
            continue;
        }

        let today = now_local.date_naive();
        tracing::info!("Scheduler: running monthly owner payout sweep for {today}");

        let outcome = run_owner_payout_sweep(&store, today).await;
        match &outcome {
            Ok(summary) => tracing::info!(
                properties = summary.properties_scanned,
                created = summary.created,
                skipped = summary.skipped_existing,
                failed = summary.failed,
                "Scheduler: owner payout sweep completed"
            ),
            Err(error) => {
                tracing::error!(error = %error, "Scheduler: owner payout sweep failed")
            }
        }

        if sweep_completed(&outcome) {
            last_monthly_run = Some((now_local.year(), now_local.month()));
            last_failed_sweep = None;
        } else {
            tracing::warn!(
                retry_in_secs = FAILED_SWEEP_RETRY.as_secs(),
                "Scheduler: owner payout sweep incomplete, will retry"
            );
            last_failed_sweep = Some(Instant::now());
        }
    }
}

fn sweep_completed(outcome: &AppResult<PayoutSweepResult>) -> bool {
    matches!(outcome, Ok(summary) if summary.failed == 0)
}

fn retry_allowed(since_last_failure: Option<Duration>) -> bool {
    since_last_failure.map_or(true, |elapsed| elapsed >= FAILED_SWEEP_RETRY)
}

/// The sweep runs once per calendar month, from 05:00 on the 1st onward.
/// A process started later in the month still catches up on its first poll.
fn monthly_run_due(now_local: &DateTime<Tz>, last_run: Option<(i32, u32)>) -> bool {
    if last_run == Some((now_local.year(), now_local.month())) {
        return false;
    }
    now_local.day() > 1 || now_local.hour() >= MONTHLY_RUN_HOUR
}
