use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::GeneratedReview;

pub const REVIEW_KIND: &str = "review";
pub const RATING_META_KEY: &str = "rating";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to insert review: {0}")]
    InsertFailed(String),
}

/// Persists a synthesized review as an approved comment on the product and
/// attaches the rating as comment meta. Used by both the deferred jobs
/// (`user_id` unset) and the operator publish confirmation.
pub async fn publish_review(
    pool: &SqlitePool,
    product_id: i64,
    review: &GeneratedReview,
    user_id: Option<i64>,
) -> Result<i64, PublishError> {
    let product: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(pool)
        .await
        .map_err(|error| PublishError::InsertFailed(error.to_string()))?;

    if product.is_none() {
        return Err(PublishError::InsertFailed(format!(
            "unknown product id {product_id}"
        )));
    }

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO review_comments (product_id, author_name, content, kind, approved, user_id, created_at)
        VALUES (?, ?, ?, ?, TRUE, ?, ?)
        "#,
    )
    .bind(product_id)
    .bind(&review.author_name)
    .bind(&review.body_text)
    .bind(REVIEW_KIND)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|error| PublishError::InsertFailed(error.to_string()))?;

    let comment_id = result.last_insert_rowid();

    sqlx::query("INSERT INTO comment_meta (comment_id, meta_key, meta_value) VALUES (?, ?, ?)")
        .bind(comment_id)
        .bind(RATING_META_KEY)
        .bind(review.rating.to_string())
        .execute(pool)
        .await
        .map_err(|error| PublishError::InsertFailed(error.to_string()))?;

    Ok(comment_id)
}

/// Reads back the rating meta attached to a published review.
pub async fn stored_rating(
    pool: &SqlitePool,
    comment_id: i64,
) -> Result<Option<u8>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT meta_value FROM comment_meta WHERE comment_id = ? AND meta_key = ?",
    )
    .bind(comment_id)
    .bind(RATING_META_KEY)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(value,)| value.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::db;
    use crate::models::{PRODUCT_STATUS_PUBLISHED, ReviewComment};

    fn review(rating: u8) -> GeneratedReview {
        GeneratedReview {
            author_name: "Dana Whitfield".to_string(),
            body_text: "Solid build, fair price.".to_string(),
            rating,
        }
    }

    #[tokio::test]
    async fn published_review_round_trips_rating() {
        let pool = db::memory_pool().await;
        let product = catalog::insert_product(
            &pool,
            "Walnut Desk",
            "A sturdy desk",
            PRODUCT_STATUS_PUBLISHED,
        )
        .await
        .unwrap();

        let comment_id = publish_review(&pool, product.id, &review(4), None)
            .await
            .unwrap();

        let stored = sqlx::query_as::<_, ReviewComment>(
            "SELECT * FROM review_comments WHERE id = ?",
        )
        .bind(comment_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(stored.product_id, product.id);
        assert_eq!(stored.author_name, "Dana Whitfield");
        assert_eq!(stored.kind, REVIEW_KIND);
        assert!(stored.approved);
        assert_eq!(stored.user_id, None);

        assert_eq!(stored_rating(&pool, comment_id).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn unknown_product_is_refused() {
        let pool = db::memory_pool().await;

        let error = publish_review(&pool, 404, &review(5), None).await.unwrap_err();

        let PublishError::InsertFailed(detail) = error;
        assert!(detail.contains("404"));
    }

    #[tokio::test]
    async fn manual_path_records_operator_identity() {
        let pool = db::memory_pool().await;
        let product = catalog::insert_product(
            &pool,
            "Office Chair",
            "Adjustable height",
            PRODUCT_STATUS_PUBLISHED,
        )
        .await
        .unwrap();

        let comment_id = publish_review(&pool, product.id, &review(5), Some(3))
            .await
            .unwrap();

        let (user_id,): (Option<i64>,) =
            sqlx::query_as("SELECT user_id FROM review_comments WHERE id = ?")
                .bind(comment_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(user_id, Some(3));
    }
}
