use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ai_reviews::{self, DEFAULT_REVIEW_LENGTH, SynthesisError, SynthesisOverrides};
use crate::models::{GeneratedReview, PublishReviewRequest, ReviewPreviewResponse, TestReviewRequest};
use crate::publish::{self, PublishError};
use crate::routes::{AppState, internal_error};
use crate::settings;

pub fn reviews_routes() -> Router<AppState> {
    Router::new()
        .route("/test", post(test_review))
        .route("/publish", post(publish_review))
}

/// Synthesizes a review with operator-supplied overrides and returns it as a
/// preview. Nothing is persisted; the operator confirms through the publish
/// endpoint.
async fn test_review(
    State(state): State<AppState>,
    Json(input): Json<TestReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(rating) = input.rating {
        validate_rating(rating)?;
    }

    let config = settings::load(&state.pool).await.map_err(internal_error)?;
    let overrides = SynthesisOverrides {
        prompt: input.prompt,
        name_prompt: input.name_prompt,
        rating: input.rating,
    };

    let mut rng = StdRng::from_os_rng();
    let review = ai_reviews::synthesize_for_product(
        &state.completions,
        &state.pool,
        &config,
        input.product_id,
        DEFAULT_REVIEW_LENGTH,
        &overrides,
        &mut rng,
    )
    .await
    .map_err(synthesis_error_response)?;

    Ok(Json(ReviewPreviewResponse {
        product_id: input.product_id,
        author_name: review.author_name,
        body_text: review.body_text,
        rating: review.rating,
    }))
}

async fn publish_review(
    State(state): State<AppState>,
    Json(input): Json<PublishReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    validate_rating(input.rating)?;
    if input.author_name.trim().is_empty() || input.body_text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Author name and review text are required"})),
        ));
    }

    let review = GeneratedReview {
        author_name: input.author_name.trim().to_string(),
        body_text: input.body_text.trim().to_string(),
        rating: input.rating,
    };

    let comment_id = publish::publish_review(&state.pool, input.product_id, &review, None)
        .await
        .map_err(|PublishError::InsertFailed(detail)| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"detail": detail})),
            )
        })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": comment_id,
            "message": "Review published"
        })),
    ))
}

fn validate_rating(rating: u8) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    if !(1..=5).contains(&rating) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Rating must be between 1 and 5"})),
        ));
    }
    Ok(())
}

fn synthesis_error_response(error: SynthesisError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &error {
        SynthesisError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        SynthesisError::BodyGenerationFailed(_) => StatusCode::BAD_GATEWAY,
        SynthesisError::EmptyProductFields
        | SynthesisError::NoPromptsConfigured
        | SynthesisError::MissingApiKey => StatusCode::BAD_REQUEST,
    };
    (status, Json(serde_json::json!({"detail": error.to_string()})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_reviews::CompletionClient;
    use crate::catalog;
    use crate::db;
    use crate::models::{PRODUCT_STATUS_PUBLISHED, Settings};
    use crate::notices::NoticeBoard;
    use crate::scheduler::RecordingQueue;
    use std::sync::Arc;

    async fn state_with_endpoint(endpoint: &str) -> AppState {
        AppState {
            pool: db::memory_pool().await,
            queue: Arc::new(RecordingQueue::default()),
            completions: CompletionClient::with_endpoint(endpoint),
            notices: NoticeBoard::new(),
        }
    }

    async fn seed_config(state: &AppState) {
        let config = Settings {
            api_key: "sk-test".to_string(),
            review_prompts: vec!["Review {{product_title}}".to_string()],
            ..Settings::default()
        };
        settings::save(&state.pool, &config).await.unwrap();
    }

    #[tokio::test]
    async fn test_endpoint_returns_preview_without_persisting() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"choices": [{"message": {"role": "assistant", "content": "Lovely desk."}}]}"#,
            )
            .expect_at_least(1)
            .create_async()
            .await;

        let state = state_with_endpoint(&server.url()).await;
        seed_config(&state).await;
        let product =
            catalog::insert_product(&state.pool, "Desk", "Sturdy", PRODUCT_STATUS_PUBLISHED)
                .await
                .unwrap();

        let request = TestReviewRequest {
            product_id: product.id,
            prompt: None,
            name_prompt: None,
            rating: Some(4),
        };
        test_review(State(state.clone()), Json(request)).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM review_comments")
            .fetch_one(&state.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_endpoint_maps_unknown_product_to_not_found() {
        let state = state_with_endpoint("http://127.0.0.1:9").await;
        seed_config(&state).await;

        let request = TestReviewRequest {
            product_id: 999,
            prompt: None,
            name_prompt: None,
            rating: None,
        };
        let error = test_review(State(state), Json(request))
            .await
            .err()
            .expect("unknown product must fail");
        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_endpoint_maps_body_failure_to_bad_gateway() {
        let state = state_with_endpoint("http://127.0.0.1:9").await;
        seed_config(&state).await;
        let product =
            catalog::insert_product(&state.pool, "Desk", "Sturdy", PRODUCT_STATUS_PUBLISHED)
                .await
                .unwrap();

        let request = TestReviewRequest {
            product_id: product.id,
            prompt: None,
            name_prompt: None,
            rating: None,
        };
        let error = test_review(State(state), Json(request))
            .await
            .err()
            .expect("unreachable API must fail body generation");
        assert_eq!(error.0, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn publish_endpoint_round_trips_the_rating() {
        let state = state_with_endpoint("http://127.0.0.1:9").await;
        let product =
            catalog::insert_product(&state.pool, "Desk", "Sturdy", PRODUCT_STATUS_PUBLISHED)
                .await
                .unwrap();

        let request = PublishReviewRequest {
            product_id: product.id,
            author_name: "Dana Whitfield".to_string(),
            body_text: "Holds up well.".to_string(),
            rating: 3,
        };
        publish_review(State(state.clone()), Json(request)).await.unwrap();

        let (comment_id,): (i64,) =
            sqlx::query_as("SELECT id FROM review_comments WHERE product_id = ?")
                .bind(product.id)
                .fetch_one(&state.pool)
                .await
                .unwrap();
        assert_eq!(
            publish::stored_rating(&state.pool, comment_id).await.unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn publish_endpoint_rejects_out_of_range_rating() {
        let state = state_with_endpoint("http://127.0.0.1:9").await;

        let request = PublishReviewRequest {
            product_id: 1,
            author_name: "Dana".to_string(),
            body_text: "Fine.".to_string(),
            rating: 6,
        };
        let error = publish_review(State(state), Json(request))
            .await
            .err()
            .expect("out-of-range rating must be rejected");
        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }
}
