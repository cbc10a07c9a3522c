use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, Counter, CounterVec, GaugeVec,
};
use sqlx::SqlitePool;

use crate::models::announcement::AnnouncementState;

lazy_static! {
    // ── Scheduler ───────────────────────────────────────────────────────────
    pub static ref SCHEDULER_CYCLES_COUNTER: Counter = register_counter!(
        "scheduler_cycles_total",
        "Scheduling cycles run"
    ).unwrap();

    pub static ref SCHEDULER_ROWS_COUNTER: CounterVec = register_counter_vec!(
        "scheduler_row_outcomes_total",
        "Per-announcement outcomes by scheduler step",
        &["step", "outcome"]
    ).unwrap();

    pub static ref SCHEDULER_STEP_FAILURES_COUNTER: CounterVec = register_counter_vec!(
        "scheduler_step_failures_total",
        "Scheduler steps skipped because their query failed",
        &["step"]
    ).unwrap();

    // ── Participant events ──────────────────────────────────────────────────
    pub static ref REGISTRATIONS_COUNTER: CounterVec = register_counter_vec!(
        "registrations_total",
        "Registrations by role",
        &["role"]
    ).unwrap();

    pub static ref WITHDRAWALS_COUNTER: Counter = register_counter!(
        "withdrawals_total",
        "Withdrawn registrations"
    ).unwrap();

    // ── Stored state ────────────────────────────────────────────────────────
    pub static ref ANNOUNCEMENTS_GAUGE: GaugeVec = register_gauge_vec!(
        "announcements",
        "Stored announcements by state",
        &["state"]
    ).unwrap();
}

/// Refresh the stored-state gauges.
pub async fn collect(pool: &SqlitePool) -> anyhow::Result<()> {
    let counts =
        crate::services::announcements::AnnouncementService::count_by_state(pool).await?;

    for s in [
        AnnouncementState::Scheduled,
        AnnouncementState::Sent,
        AnnouncementState::Closed,
    ] {
        let n = counts
            .iter()
            .find(|(state, _)| *state == s)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        ANNOUNCEMENTS_GAUGE
            .with_label_values(&[&s.to_string()])
            .set(n as f64);
    }
    Ok(())
}
