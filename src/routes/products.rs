use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::catalog;
use crate::models::{
    CreateProduct, PRODUCT_STATUS_DRAFT, PRODUCT_STATUS_PUBLISHED, ProductSearchQuery,
    ReviewComment, ReviewCommentResponse,
};
use crate::publish::{self, REVIEW_KIND};
use crate::routes::{AppState, internal_error};

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/{product_id}/reviews", get(list_product_reviews))
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let products = catalog::published_products(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(products))
}

async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProduct>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if input.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Product title is required"})),
        ));
    }

    let status = input
        .status
        .unwrap_or_else(|| PRODUCT_STATUS_PUBLISHED.to_string());
    if status != PRODUCT_STATUS_PUBLISHED && status != PRODUCT_STATUS_DRAFT {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"detail": "Unknown product status"})),
        ));
    }

    let product = catalog::insert_product(
        &state.pool,
        input.title.trim(),
        input.description.trim(),
        &status,
    )
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let product = catalog::fetch_product(&state.pool, product_id)
        .await
        .map_err(internal_error)?;
    if product.is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"detail": "Product not found"})),
        ));
    }

    let comments = sqlx::query_as::<_, ReviewComment>(
        r#"
        SELECT * FROM review_comments
        WHERE product_id = ? AND kind = ? AND approved = TRUE
        ORDER BY created_at DESC
        "#,
    )
    .bind(product_id)
    .bind(REVIEW_KIND)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut responses = Vec::new();
    for comment in comments {
        let rating = publish::stored_rating(&state.pool, comment.id)
            .await
            .map_err(internal_error)?;
        responses.push(ReviewCommentResponse {
            id: comment.id,
            product_id: comment.product_id,
            author_name: comment.author_name,
            content: comment.content,
            rating,
            created_at: comment.created_at,
        });
    }

    Ok(Json(responses))
}

/// Autocomplete source for the operator product picker on the test page.
async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<ProductSearchQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let suggestions = catalog::search_published(&state.pool, query.term.trim())
        .await
        .map_err(internal_error)?;
    Ok(Json(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_reviews::CompletionClient;
    use crate::db;
    use crate::notices::NoticeBoard;
    use crate::scheduler::RecordingQueue;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        AppState {
            pool: db::memory_pool().await,
            queue: Arc::new(RecordingQueue::default()),
            completions: CompletionClient::with_endpoint("http://127.0.0.1:9"),
            notices: NoticeBoard::new(),
        }
    }

    #[tokio::test]
    async fn create_defaults_to_published_status() {
        let state = test_state().await;

        let input = CreateProduct {
            title: "  Walnut Desk  ".to_string(),
            description: "A sturdy desk".to_string(),
            status: None,
        };
        create_product(State(state.clone()), Json(input)).await.unwrap();

        let products = catalog::published_products(&state.pool).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Walnut Desk");
    }

    #[tokio::test]
    async fn product_reviews_include_their_rating() {
        let state = test_state().await;
        let product = catalog::insert_product(
            &state.pool,
            "Walnut Desk",
            "A sturdy desk",
            PRODUCT_STATUS_PUBLISHED,
        )
        .await
        .unwrap();

        let review = crate::models::GeneratedReview {
            author_name: "Dana Whitfield".to_string(),
            body_text: "Holds up well.".to_string(),
            rating: 5,
        };
        publish::publish_review(&state.pool, product.id, &review, None)
            .await
            .unwrap();

        assert!(
            list_product_reviews(State(state.clone()), Path(product.id))
                .await
                .is_ok()
        );

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comment_meta WHERE meta_key = 'rating' AND meta_value = '5'",
        )
        .fetch_one(&state.pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_product_reviews_listing_is_not_found() {
        let state = test_state().await;
        let error = list_product_reviews(State(state), Path(77))
            .await
            .err()
            .expect("missing product must be a 404");
        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let state = test_state().await;

        let input = CreateProduct {
            title: "   ".to_string(),
            description: "desc".to_string(),
            status: None,
        };
        let error = create_product(State(state), Json(input))
            .await
            .err()
            .expect("blank title must be rejected");
        assert_eq!(error.0, StatusCode::BAD_REQUEST);
    }
}
