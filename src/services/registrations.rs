use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::registration::{NewRegistration, RegistrationEntry},
    services::{dashboard::DashboardService, metrics},
    AppState,
};

pub struct RegistrationService;

impl RegistrationService {
    pub async fn list(
        pool: &SqlitePool,
        announcement_id: Uuid,
    ) -> Result<Vec<RegistrationEntry>, AppError> {
        let entries = sqlx::query_as::<_, RegistrationEntry>(
            "SELECT * FROM registrations WHERE announcement_id = $1 ORDER BY id",
        )
        .bind(announcement_id)
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }

    pub async fn is_registered(
        pool: &SqlitePool,
        announcement_id: Uuid,
        participant_id: &str,
    ) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM registrations WHERE announcement_id = $1 AND participant_id = $2",
        )
        .bind(announcement_id)
        .bind(participant_id)
        .fetch_optional(pool)
        .await?;
        Ok(found.is_some())
    }

    /// Insert-or-fail on the `(announcement_id, participant_id)` unique key.
    /// There is no existence pre-check, so concurrent attempts cannot both succeed.
    pub async fn insert(
        pool: &SqlitePool,
        announcement_id: Uuid,
        reg: &NewRegistration,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<RegistrationEntry, AppError> {
        reg.validate()?;

        let result = sqlx::query_as::<_, RegistrationEntry>(
            "INSERT INTO registrations
                (announcement_id, participant_id, cohort, role, capacity, contact, note, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(announcement_id)
        .bind(&reg.participant_id)
        .bind(&reg.cohort)
        .bind(reg.role)
        .bind(reg.capacity)
        .bind(&reg.contact)
        .bind(&reg.note)
        .bind(now)
        .fetch_one(pool)
        .await;

        match result {
            Ok(entry) => Ok(entry),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::AlreadyRegistered)
            }
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(AppError::NotFound(announcement_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(
        pool: &SqlitePool,
        announcement_id: Uuid,
        participant_id: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM registrations WHERE announcement_id = $1 AND participant_id = $2",
        )
        .bind(announcement_id)
        .bind(participant_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotRegistered);
        }
        Ok(())
    }

    /// Register and refresh the dashboard. A failed refresh does not undo the registration.
    pub async fn register(
        state: &AppState,
        announcement_id: Uuid,
        reg: NewRegistration,
    ) -> Result<RegistrationEntry, AppError> {
        let entry = Self::insert(&state.db, announcement_id, &reg, state.now()).await?;
        metrics::REGISTRATIONS_COUNTER
            .with_label_values(&[&entry.role.to_string()])
            .inc();
        info!(
            "Registered {} as {} ({}) for announcement {}",
            entry.participant_id, entry.role, entry.cohort, announcement_id
        );

        if let Err(e) = DashboardService::refresh(state, announcement_id).await {
            warn!(
                "Dashboard refresh after registration failed for {}: {}",
                announcement_id, e
            );
        }
        Ok(entry)
    }

    pub async fn withdraw(
        state: &AppState,
        announcement_id: Uuid,
        participant_id: &str,
    ) -> Result<(), AppError> {
        Self::delete(&state.db, announcement_id, participant_id).await?;
        metrics::WITHDRAWALS_COUNTER.inc();
        info!("Withdrew {} from announcement {}", participant_id, announcement_id);

        if let Err(e) = DashboardService::refresh(state, announcement_id).await {
            warn!(
                "Dashboard refresh after withdrawal failed for {}: {}",
                announcement_id, e
            );
        }
        Ok(())
    }
}
