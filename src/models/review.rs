use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Output of the review synthesizer. Nothing is persisted until the review
/// goes through the publish adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedReview {
    pub author_name: String,
    pub body_text: String,
    pub rating: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewComment {
    pub id: i64,
    pub product_id: i64,
    pub author_name: String,
    pub content: String,
    pub kind: String,
    pub approved: bool,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Review comment plus its rating meta, as served to storefront readers.
#[derive(Debug, Serialize)]
pub struct ReviewCommentResponse {
    pub id: i64,
    pub product_id: i64,
    pub author_name: String,
    pub content: String,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TestReviewRequest {
    pub product_id: i64,
    pub prompt: Option<String>,
    pub name_prompt: Option<String>,
    pub rating: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct ReviewPreviewResponse {
    pub product_id: i64,
    pub author_name: String,
    pub body_text: String,
    pub rating: u8,
}

#[derive(Debug, Deserialize)]
pub struct PublishReviewRequest {
    pub product_id: i64,
    pub author_name: String,
    pub body_text: String,
    pub rating: u8,
}
