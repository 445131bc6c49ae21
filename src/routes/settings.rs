use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::catalog;
use crate::models::Settings;
use crate::routes::{AppState, internal_error};
use crate::scheduler;
use crate::settings;

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let config = settings::load(&state.pool).await.map_err(internal_error)?;
    Ok(Json(config))
}

/// Persists the configuration, drops every pending scheduled job, and (when
/// auto generation is allowed) immediately schedules a fresh batch. Clearing
/// first keeps repeated saves from stacking schedules.
async fn update_settings(
    State(state): State<AppState>,
    Json(input): Json<Settings>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if input.daily_rate == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Daily rate must be at least 1"})),
        ));
    }

    let config = Settings {
        review_prompts: settings::normalize_prompts(input.review_prompts),
        ..input
    };
    settings::save(&state.pool, &config).await.map_err(internal_error)?;

    state.queue.clear_scheduled();

    let mut outcome = scheduler::ScheduleOutcome {
        requested: 0,
        scheduled: 0,
    };
    if config.scheduling_enabled() {
        let products = catalog::published_products(&state.pool)
            .await
            .map_err(internal_error)?;
        outcome = scheduler::schedule_batch(&config, &products, state.queue.as_ref());
        scheduler::report_outcome(&state.notices, outcome);
        tracing::info!(
            requested = outcome.requested,
            scheduled = outcome.scheduled,
            interval_minutes = config.interval_minutes,
            "rescheduled review generation after settings save"
        );
    }

    Ok(Json(serde_json::json!({
        "message": "Settings saved",
        "requested": outcome.requested,
        "scheduled": outcome.scheduled,
    })))
}
