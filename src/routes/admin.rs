use axum::{
    Router,
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
};

use crate::routes::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/notices", get(list_notices))
        .route("/schedule", get(schedule_status))
}

/// Returns and clears the transient operator notices.
async fn list_notices(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"notices": state.notices.drain()}))
}

async fn schedule_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"pending": state.queue.pending_count()}))
}
