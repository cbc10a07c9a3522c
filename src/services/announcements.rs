use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::announcement::{
        validate_text, Announcement, AnnouncementState, EditAnnouncementRequest, NewAnnouncement,
    },
    services::{clock, dashboard::DashboardService, lifecycle, render, transport::TransportError},
    AppState,
};

pub struct AnnouncementService;

impl AnnouncementService {
    pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<Announcement>, AppError> {
        let row = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Announcement, AppError> {
        Self::find(pool, id).await?.ok_or(AppError::NotFound(id))
    }

    /// Scheduled first, then sent, then closed; each by send time.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements
             ORDER BY
               CASE state
                 WHEN 'scheduled' THEN 1
                 WHEN 'sent' THEN 2
                 WHEN 'closed' THEN 3
                 ELSE 4
               END,
               send_at ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(state: &AppState, new: NewAnnouncement) -> Result<Announcement, AppError> {
        new.validate()?;
        let announcement = sqlx::query_as::<_, Announcement>(
            "INSERT INTO announcements
                (id, title, content, send_at, end_at, reactable, state, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'scheduled', $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.content)
        .bind(clock::truncate(new.send_at))
        .bind(clock::truncate(new.end_at))
        .bind(new.reactable)
        .bind(state.now())
        .fetch_one(&state.db)
        .await?;

        info!(
            "Announcement {} scheduled for {} (reactable: {})",
            announcement.id, announcement.send_at, announcement.reactable
        );
        Ok(announcement)
    }

    /// Rewrite a published announcement. The public view is updated first; if the
    /// platform is unreachable nothing is stored and the caller may retry.
    pub async fn edit(
        state: &AppState,
        id: Uuid,
        req: EditAnnouncementRequest,
    ) -> Result<Announcement, AppError> {
        validate_text(&req.title, &req.content)?;
        let current = Self::get(&state.db, id).await?;
        if current.state != AnnouncementState::Sent {
            return Err(AppError::invalid_state(
                "Only announcements that are currently published can be edited.",
            ));
        }

        let mut updated = current.clone();
        updated.title = req.title;
        updated.content = req.content;

        if let Some(public_ref) = current.public_ref.as_deref() {
            let now = state.now();
            let view = render::public_view(&updated, updated.is_open(now), now);
            match state.outbound().edit(public_ref, &view).await {
                Ok(()) => {}
                Err(TransportError::NotFound) => {
                    warn!("Public view for {} is gone; storing the edit anyway", id)
                }
                Err(e) => return Err(e.into()),
            }
        }

        let result = sqlx::query(
            "UPDATE announcements SET title = $1, content = $2 WHERE id = $3 AND state = 'sent'",
        )
        .bind(&updated.title)
        .bind(&updated.content)
        .bind(id)
        .execute(&state.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::invalid_state(
                "The announcement closed while it was being edited.",
            ));
        }
        info!("Announcement {} edited", id);

        if updated.reactable {
            if let Err(e) = DashboardService::refresh(state, id).await {
                warn!("Dashboard refresh after edit failed for {}: {}", id, e);
            }
        }
        Ok(updated)
    }

    /// Remove a published (or closed) announcement and everything attached to it.
    pub async fn delete(state: &AppState, id: Uuid) -> Result<(), AppError> {
        let announcement = Self::get(&state.db, id).await?;
        if announcement.state == AnnouncementState::Scheduled {
            return Err(AppError::invalid_state(
                "Only already-sent announcements can be deleted; unschedule it instead.",
            ));
        }
        lifecycle::remove(state, &announcement).await?;
        info!("Announcement {} deleted", id);
        Ok(())
    }

    /// Drop an announcement that has not been published yet.
    pub async fn unschedule(state: &AppState, id: Uuid) -> Result<(), AppError> {
        let announcement = Self::get(&state.db, id).await?;
        if announcement.state != AnnouncementState::Scheduled {
            return Err(AppError::invalid_state(
                "Only scheduled announcements can be unscheduled.",
            ));
        }

        let result = sqlx::query("DELETE FROM announcements WHERE id = $1 AND state = 'scheduled'")
            .bind(id)
            .execute(&state.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::invalid_state(
                "The announcement was published before it could be unscheduled.",
            ));
        }
        info!("Announcement {} unscheduled", id);
        Ok(())
    }

    pub async fn due_for_send(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements
             WHERE state = 'scheduled' AND send_at <= $1
             ORDER BY send_at",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn due_for_close(
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements
             WHERE state = 'sent' AND end_at <= $1
             ORDER BY end_at",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Announcements in any state that ended at or before `cutoff`.
    pub async fn expired(
        pool: &SqlitePool,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements WHERE end_at <= $1 ORDER BY end_at",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Ids of published reactable announcements that have a dashboard.
    pub async fn with_dashboards(pool: &SqlitePool) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM announcements
             WHERE state IN ('sent', 'closed') AND reactable = TRUE AND dashboard_ref IS NOT NULL",
        )
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    /// Ids whose dashboard has not been re-rendered since their last state change.
    pub async fn stale_dashboards(pool: &SqlitePool) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM announcements WHERE dashboard_stale = TRUE ORDER BY send_at",
        )
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    pub async fn mark_dashboard_fresh(pool: &SqlitePool, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE announcements SET dashboard_stale = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_dashboard_page(
        pool: &SqlitePool,
        id: Uuid,
        page: i64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE announcements SET dashboard_page = $1 WHERE id = $2")
            .bind(page)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count_by_state(
        pool: &SqlitePool,
    ) -> Result<Vec<(AnnouncementState, i64)>, AppError> {
        let counts: Vec<(AnnouncementState, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM announcements GROUP BY state")
                .fetch_all(pool)
                .await?;
        Ok(counts)
    }
}
