//! Announcement state transitions and their external side effects.
//!
//! `scheduled -> sent -> closed`, with deletion from any published state.
//! Every transition is safe to re-attempt: references to views that were
//! already created are stored immediately and reused on retry, and state
//! updates are conditional on the state they leave.

use tracing::{info, warn};

use crate::{
    error::AppError,
    models::announcement::{Announcement, AnnouncementState},
    services::{dashboard::DashboardService, render, transport::TransportError},
    AppState,
};

/// `scheduled -> sent`. Returns `false` if the row had already left `scheduled`.
pub async fn publish(state: &AppState, a: &Announcement) -> Result<bool, AppError> {
    if a.state != AnnouncementState::Scheduled {
        return Ok(false);
    }
    let now = state.now();

    if a.public_ref.is_none() {
        let view = render::public_view(a, a.reactable && now < a.end_at, now);
        let public_ref = state
            .outbound()
            .publish(&state.config.public_channel_id, &view)
            .await?;
        record_ref(state, a, "public_ref", &public_ref).await?;
    }

    if a.reactable && a.dashboard_ref.is_none() {
        let dashboard_ref = DashboardService::publish(state, a).await?;
        record_ref(state, a, "dashboard_ref", &dashboard_ref).await?;
    }

    let result = sqlx::query(
        "UPDATE announcements SET state = 'sent', dashboard_page = 0, dashboard_stale = reactable
         WHERE id = $1 AND state = 'scheduled'",
    )
    .bind(a.id)
    .execute(&state.db)
    .await?;

    let applied = result.rows_affected() > 0;
    if applied {
        info!("Announcement {} sent", a.id);
    }
    Ok(applied)
}

async fn record_ref(
    state: &AppState,
    a: &Announcement,
    column: &'static str,
    value: &str,
) -> Result<(), AppError> {
    // `column` is one of two fixed names, never user input.
    sqlx::query(&format!(
        "UPDATE announcements SET {column} = $1 WHERE id = $2 AND {column} IS NULL"
    ))
    .bind(value)
    .bind(a.id)
    .execute(&state.db)
    .await?;
    Ok(())
}

/// `sent -> closed`. The public view is marked closed before the state changes,
/// so an unreachable platform leaves the row `sent` for the next cycle.
pub async fn close(state: &AppState, a: &Announcement) -> Result<bool, AppError> {
    if a.state != AnnouncementState::Sent {
        return Ok(false);
    }

    if a.reactable {
        if let Some(public_ref) = a.public_ref.as_deref() {
            let view = render::public_view(a, false, state.now());
            match state.outbound().edit(public_ref, &view).await {
                Ok(()) => {}
                Err(TransportError::NotFound) => {
                    warn!("Public view for {} is gone; closing anyway", a.id)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    let result = sqlx::query(
        "UPDATE announcements SET state = 'closed', dashboard_stale = reactable
         WHERE id = $1 AND state = 'sent'",
    )
    .bind(a.id)
    .execute(&state.db)
    .await?;

    let applied = result.rows_affected() > 0;
    if applied {
        info!("Announcement {} closed", a.id);
    }
    Ok(applied)
}

/// Delete the announcement, its registrations, and (best-effort) its views.
pub async fn remove(state: &AppState, a: &Announcement) -> Result<(), AppError> {
    let outbound = state.outbound();
    for message_ref in [a.public_ref.as_deref(), a.dashboard_ref.as_deref()]
        .into_iter()
        .flatten()
    {
        match outbound.delete(message_ref).await {
            Ok(()) | Err(TransportError::NotFound) => {}
            Err(e) => warn!("Could not remove view {} of {}: {}", message_ref, a.id, e),
        }
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM registrations WHERE announcement_id = $1")
        .bind(a.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM announcements WHERE id = $1")
        .bind(a.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
