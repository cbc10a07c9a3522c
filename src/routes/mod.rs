pub mod announcements;
pub mod health;
pub mod interactions;
pub mod metrics;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Operator
        .route(
            "/announcements",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route(
            "/announcements/{id}",
            put(announcements::edit_announcement).delete(announcements::delete_announcement),
        )
        .route("/announcements/{id}/unschedule", post(announcements::unschedule_announcement))
        // Platform bridge
        .route("/announcements/{id}/interactions", post(interactions::handle_interaction))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
