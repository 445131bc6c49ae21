use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{PRODUCT_STATUS_PUBLISHED, Product, ProductSuggestion};

pub const SEARCH_RESULT_LIMIT: i64 = 10;

pub async fn fetch_product(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(pool)
        .await
}

/// The full candidate set for scheduled review generation.
pub async fn published_products(pool: &SqlitePool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = ? ORDER BY created_at DESC",
    )
    .bind(PRODUCT_STATUS_PUBLISHED)
    .fetch_all(pool)
    .await
}

/// Title/description substring match over published products, shaped for the
/// operator autocomplete widget.
pub async fn search_published(
    pool: &SqlitePool,
    term: &str,
) -> Result<Vec<ProductSuggestion>, sqlx::Error> {
    let pattern = format!("%{}%", term);
    let rows: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT id, title FROM products
        WHERE status = ? AND (title LIKE ? OR description LIKE ?)
        ORDER BY title ASC
        LIMIT ?
        "#,
    )
    .bind(PRODUCT_STATUS_PUBLISHED)
    .bind(&pattern)
    .bind(&pattern)
    .bind(SEARCH_RESULT_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, title)| ProductSuggestion {
            id,
            label: title.clone(),
            value: title,
        })
        .collect())
}

pub async fn insert_product(
    pool: &SqlitePool,
    title: &str,
    description: &str,
    status: &str,
) -> Result<Product, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO products (title, description, status, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(description)
    .bind(status)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await
}
