use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const PRODUCT_STATUS_PUBLISHED: &str = "published";
pub const PRODUCT_STATUS_DRAFT: &str = "draft";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Autocomplete entry for the operator product picker.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub id: i64,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub title: String,
    pub description: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProductSearchQuery {
    pub term: String,
}
