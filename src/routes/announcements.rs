use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::announcement::{
        Announcement, AnnouncementSummary, CreateAnnouncementRequest, EditAnnouncementRequest,
    },
    services::announcements::AnnouncementService,
    AppState,
};

/// GET /announcements
pub async fn list_announcements(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnnouncementSummary>>, AppError> {
    let rows = AnnouncementService::list(&state.db).await?;
    Ok(Json(rows.into_iter().map(AnnouncementSummary::from).collect()))
}

/// POST /announcements — schedule a new announcement. Times are local `YYYY-MM-DD HH:MM`.
pub async fn create_announcement(
    State(state): State<AppState>,
    Json(body): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let new = body.parse()?;
    let announcement = AnnouncementService::create(&state, new).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

/// PUT /announcements/{id}
pub async fn edit_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<EditAnnouncementRequest>,
) -> Result<Json<Announcement>, AppError> {
    let announcement = AnnouncementService::edit(&state, id, body).await?;
    Ok(Json(announcement))
}

/// DELETE /announcements/{id} — removes a sent or closed announcement and its views.
pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    AnnouncementService::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /announcements/{id}/unschedule
pub async fn unschedule_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    AnnouncementService::unschedule(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
