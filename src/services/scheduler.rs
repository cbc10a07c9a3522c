//! Periodic driver of announcement state.
//!
//! Each cycle runs four steps in order: send due announcements, close ended
//! ones, refresh any dashboards left stale by a state change, and purge
//! anything past retention. A failing announcement never stops the rest of
//! its step, and a failing step never stops the steps after it.

use std::fmt;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::announcement::Announcement,
    services::{
        announcements::AnnouncementService, clock, dashboard::DashboardService, lifecycle,
        metrics,
    },
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Send,
    Close,
    Refresh,
    Purge,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Send => "send",
            Step::Close => "close",
            Step::Refresh => "refresh",
            Step::Purge => "purge",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one announcement within one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Succeeded,
    /// Nothing to do; another actor got there first.
    Skipped,
    /// External service unavailable; retried next cycle.
    Transient,
    Failed,
}

impl RowOutcome {
    fn from_result(result: &Result<bool, AppError>) -> Self {
        match result {
            Ok(true) => RowOutcome::Succeeded,
            Ok(false) => RowOutcome::Skipped,
            Err(e) if e.is_transient() => RowOutcome::Transient,
            Err(_) => RowOutcome::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowOutcome::Succeeded => "succeeded",
            RowOutcome::Skipped => "skipped",
            RowOutcome::Transient => "transient",
            RowOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub transient: usize,
    pub failed: usize,
    /// The step's own query failed, so no rows were attempted.
    pub aborted: bool,
}

impl StepReport {
    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Succeeded => self.succeeded += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Transient => self.transient += 1,
            RowOutcome::Failed => self.failed += 1,
        }
    }

    fn is_idle(&self) -> bool {
        *self == StepReport::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    pub sent: StepReport,
    pub closed: StepReport,
    pub refreshed: StepReport,
    pub purged: StepReport,
}

/// Spawn the background loop. It runs one cycle immediately, then one per interval.
pub fn start(state: AppState) -> JoinHandle<()> {
    let interval = state.config.scheduler_interval();
    info!("Scheduler started (interval {:?})", interval);
    tokio::spawn(async move {
        loop {
            let report = run_cycle(&state).await;
            debug!("Scheduler cycle: {:?}", report);
            if let Err(e) = metrics::collect(&state.db).await {
                warn!("Scheduler: failed to refresh gauges: {}", e);
            }
            tokio::time::sleep(interval).await;
        }
    })
}

/// One pass over all four steps.
pub async fn run_cycle(state: &AppState) -> CycleReport {
    metrics::SCHEDULER_CYCLES_COUNTER.inc();
    let now = state.now();
    let mut report = CycleReport::default();

    match AnnouncementService::due_for_send(&state.db, now).await {
        Ok(due) => {
            for a in due {
                let result = lifecycle::publish(state, &a).await;
                record(Step::Send, a.id, result, &mut report.sent);
            }
        }
        Err(e) => abort(Step::Send, e, &mut report.sent),
    }

    match AnnouncementService::due_for_close(&state.db, now).await {
        Ok(due) => {
            for a in due {
                let result = lifecycle::close(state, &a).await;
                record(Step::Close, a.id, result, &mut report.closed);
            }
        }
        Err(e) => abort(Step::Close, e, &mut report.closed),
    }

    // Rows stay stale until a refresh lands, so a failed one is retried next cycle.
    match AnnouncementService::stale_dashboards(&state.db).await {
        Ok(stale) => {
            for id in stale {
                let result = refresh_stale(state, id).await;
                record(Step::Refresh, id, result, &mut report.refreshed);
            }
        }
        Err(e) => abort(Step::Refresh, e, &mut report.refreshed),
    }

    let cutoff = clock::cutoff(now, state.config.retention());
    match AnnouncementService::expired(&state.db, cutoff).await {
        Ok(expired) => {
            for a in expired {
                let result = purge_one(state, &a).await;
                record(Step::Purge, a.id, result, &mut report.purged);
            }
        }
        Err(e) => abort(Step::Purge, e, &mut report.purged),
    }

    for (step, r) in [
        (Step::Send, &report.sent),
        (Step::Close, &report.closed),
        (Step::Purge, &report.purged),
    ] {
        if !r.is_idle() {
            info!(
                "Scheduler: {} step done ({} ok, {} skipped, {} deferred, {} failed)",
                step, r.succeeded, r.skipped, r.transient, r.failed
            );
        }
    }
    report
}

fn record(step: Step, id: Uuid, result: Result<bool, AppError>, report: &mut StepReport) {
    let outcome = RowOutcome::from_result(&result);
    match result {
        Err(e) if outcome == RowOutcome::Transient => {
            info!("Scheduler: {} {} deferred: {}", step, id, e)
        }
        Err(e) => warn!("Scheduler: {} {} failed: {}", step, id, e),
        Ok(_) => {}
    }
    metrics::SCHEDULER_ROWS_COUNTER
        .with_label_values(&[step.as_str(), outcome.as_str()])
        .inc();
    report.record(outcome);
}

fn abort(step: Step, e: AppError, report: &mut StepReport) {
    warn!("Scheduler: {} step skipped, query failed: {}", step, e);
    metrics::SCHEDULER_STEP_FAILURES_COUNTER
        .with_label_values(&[step.as_str()])
        .inc();
    report.aborted = true;
}

async fn refresh_stale(state: &AppState, id: Uuid) -> Result<bool, AppError> {
    let refreshed = DashboardService::refresh(state, id).await?;
    AnnouncementService::mark_dashboard_fresh(&state.db, id).await?;
    Ok(refreshed)
}

async fn purge_one(state: &AppState, a: &Announcement) -> Result<bool, AppError> {
    lifecycle::remove(state, a).await?;
    info!("Purged announcement {} (ended {})", a.id, a.end_at);
    Ok(true)
}
