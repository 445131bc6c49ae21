mod ai_reviews;
mod catalog;
mod db;
mod models;
mod notices;
mod publish;
mod routes;
mod scheduler;
mod settings;

use axum::{Router, response::IntoResponse, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routes::{AppState, admin_routes, products_routes, reviews_routes, settings_routes};
use scheduler::{DAILY_TRIGGER_PERIOD, DeferredQueue, JobContext, TokioReviewQueue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_reviews=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Database setup
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://storefront_reviews.db?mode=rwc".to_string());

    let pool = db::init_db(&database_url).await?;
    tracing::info!("Database initialized");

    let notices = notices::NoticeBoard::new();
    let completions = ai_reviews::CompletionClient::new();

    // Deferred review queue plus the recurring daily generation trigger
    let queue = TokioReviewQueue::new(JobContext {
        pool: pool.clone(),
        completions: completions.clone(),
        notices: notices.clone(),
    });
    queue.schedule_recurring(DAILY_TRIGGER_PERIOD);

    let state = AppState {
        pool,
        queue: queue.clone(),
        completions,
        notices,
    };

    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let app = Router::new()
        .nest("/api/settings", settings_routes())
        .nest("/api/products", products_routes())
        .nest("/api/reviews", reviews_routes())
        .nest("/api/admin", admin_routes())
        .route("/api/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Run the server
    let addr = "0.0.0.0:8000";
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "healthy"}))
}
