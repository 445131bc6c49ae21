pub mod admin;
pub mod products;
pub mod reviews;
pub mod settings;

pub use admin::admin_routes;
pub use products::products_routes;
pub use reviews::reviews_routes;
pub use settings::settings_routes;

use std::sync::Arc;

use axum::{Json, http::StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::ai_reviews::CompletionClient;
use crate::notices::NoticeBoard;
use crate::scheduler::DeferredQueue;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub queue: Arc<dyn DeferredQueue>,
    pub completions: CompletionClient,
    pub notices: NoticeBoard,
}

pub(crate) fn internal_error(error: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"detail": error.to_string()})),
    )
}
