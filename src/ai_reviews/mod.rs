use async_trait::async_trait;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::{DEFAULT_NAME_PROMPT, GeneratedReview, Product, Settings};

pub const COMPLETION_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const COMPLETION_MODEL: &str = "gpt-4o";

/// Output budget for reviewer-name completions.
pub const NAME_MAX_TOKENS: u32 = 20;
/// Review length used by the scheduled generation path.
pub const DEFAULT_REVIEW_LENGTH: u32 = 100;
/// Author used when name generation fails.
pub const FALLBACK_AUTHOR: &str = "Anonymous";

pub const TITLE_TOKEN: &str = "{{product_title}}";
pub const DESCRIPTION_TOKEN: &str = "{{product_description}}";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion response contained no content: {0}")]
    EmptyResponse(String),
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("product not found: {0}")]
    ProductNotFound(i64),
    #[error("product title or description is empty")]
    EmptyProductFields,
    #[error("no review prompts configured")]
    NoPromptsConfigured,
    #[error("API key is not configured")]
    MissingApiKey,
    #[error("review body generation failed: {0}")]
    BodyGenerationFailed(#[source] CompletionError),
}

/// Substitutes the product title/description tokens. Tokens that do not
/// appear are left verbatim; nothing else is interpolated.
pub fn render_template(template: &str, title: &str, description: &str) -> String {
    template
        .replace(TITLE_TOKEN, title)
        .replace(DESCRIPTION_TOKEN, description)
}

/// Single-turn chat completion capability. The one production
/// implementation talks to the OpenAI API; tests substitute their own.
#[async_trait]
pub trait Completions: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        api_key: &str,
    ) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CompletionClient {
    pub fn new() -> Self {
        Self::with_endpoint(COMPLETION_ENDPOINT)
    }

    /// Endpoint override used by tests; production callers use `new`.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for CompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Completions for CompletionClient {
    /// One user-role message, no retries. Callers decide what a failure
    /// means; this client only classifies it.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        api_key: &str,
    ) -> Result<String, CompletionError> {
        let payload = json!({
            "model": COMPLETION_MODEL,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| CompletionError::Transport(error.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|error| CompletionError::Transport(error.to_string()))?;

        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let content = parsed
            .get("choices")
            .and_then(|choices| choices.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .unwrap_or("");

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(CompletionError::EmptyResponse(body));
        }

        Ok(trimmed.to_string())
    }
}

/// Operator-supplied values from the manual test page. Empty strings count
/// as absent.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOverrides {
    pub prompt: Option<String>,
    pub name_prompt: Option<String>,
    pub rating: Option<u8>,
}

/// Resolves the product and synthesizes a review for it.
pub async fn synthesize_for_product<C, R>(
    client: &C,
    pool: &SqlitePool,
    settings: &Settings,
    product_id: i64,
    review_length: u32,
    overrides: &SynthesisOverrides,
    rng: &mut R,
) -> Result<GeneratedReview, SynthesisError>
where
    C: Completions + ?Sized,
    R: Rng + Send,
{
    let product = crate::catalog::fetch_product(pool, product_id)
        .await
        .map_err(|error| {
            tracing::error!("product lookup failed for {}: {}", product_id, error);
            SynthesisError::ProductNotFound(product_id)
        })?
        .ok_or(SynthesisError::ProductNotFound(product_id))?;

    synthesize_review(client, settings, &product, review_length, overrides, rng).await
}

/// Produces review body, author name, and rating for one product. Up to two
/// completion calls; nothing is persisted here.
///
/// A body failure aborts the synthesis. A name failure does not: the author
/// falls back to [`FALLBACK_AUTHOR`] so a usable review is never discarded
/// over its byline.
pub async fn synthesize_review<C, R>(
    client: &C,
    settings: &Settings,
    product: &Product,
    review_length: u32,
    overrides: &SynthesisOverrides,
    rng: &mut R,
) -> Result<GeneratedReview, SynthesisError>
where
    C: Completions + ?Sized,
    R: Rng + Send,
{
    if product.title.trim().is_empty() || product.description.trim().is_empty() {
        return Err(SynthesisError::EmptyProductFields);
    }

    let template = select_body_prompt(settings, overrides, rng)?;
    let prompt = render_template(&template, &product.title, &product.description);

    if settings.api_key.trim().is_empty() {
        return Err(SynthesisError::MissingApiKey);
    }

    let body_text = client
        .complete(&prompt, review_length * 2, &settings.api_key)
        .await
        .map_err(SynthesisError::BodyGenerationFailed)?;

    let rating = match overrides.rating {
        Some(rating) => rating,
        None => rng.random_range(4..=5),
    };

    let name_template = select_name_prompt(settings, overrides);
    let name_prompt = render_template(&name_template, &product.title, &product.description);
    let author_name = match client
        .complete(&name_prompt, NAME_MAX_TOKENS, &settings.api_key)
        .await
    {
        Ok(name) => name,
        Err(error) => {
            tracing::debug!(
                "author name generation failed for product {}, using fallback: {}",
                product.id,
                error
            );
            FALLBACK_AUTHOR.to_string()
        }
    };

    Ok(GeneratedReview {
        author_name,
        body_text,
        rating,
    })
}

fn select_body_prompt<R: Rng>(
    settings: &Settings,
    overrides: &SynthesisOverrides,
    rng: &mut R,
) -> Result<String, SynthesisError> {
    if let Some(prompt) = non_empty(overrides.prompt.as_deref()) {
        return Ok(prompt.to_string());
    }

    let candidates: Vec<&String> = settings
        .review_prompts
        .iter()
        .filter(|prompt| !prompt.trim().is_empty())
        .collect();

    candidates
        .choose(rng)
        .map(|prompt| (*prompt).clone())
        .ok_or(SynthesisError::NoPromptsConfigured)
}

fn select_name_prompt(settings: &Settings, overrides: &SynthesisOverrides) -> String {
    if let Some(prompt) = non_empty(overrides.name_prompt.as_deref()) {
        return prompt.to_string();
    }
    if let Some(prompt) = non_empty(Some(settings.name_prompt.as_str())) {
        return prompt.to_string();
    }
    DEFAULT_NAME_PROMPT.to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
