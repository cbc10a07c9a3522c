use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::interaction::{InteractionOutcome, InteractionRequest},
    services::interactions,
    AppState,
};

/// POST /announcements/{id}/interactions — a control press or form submission
/// relayed by the platform bridge.
pub async fn handle_interaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<InteractionRequest>,
) -> Result<Json<InteractionOutcome>, AppError> {
    let outcome = interactions::dispatch(&state, id, &body.participant_id, body.command).await?;
    Ok(Json(outcome))
}
