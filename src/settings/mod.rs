use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{PROMPT_SLOTS, Settings};

const KEY_API_KEY: &str = "api_key";
const KEY_REVIEW_PROMPTS: &str = "review_prompts";
const KEY_NAME_PROMPT: &str = "name_prompt";
const KEY_AUTO_GENERATE: &str = "auto_generate";
const KEY_DAILY_RATE: &str = "daily_rate";
const KEY_INTERVAL_MINUTES: &str = "interval_minutes";

/// Loads the operator configuration, falling back to defaults for any key
/// that is missing or fails to parse.
pub async fn load(pool: &SqlitePool) -> Result<Settings, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT name, value FROM settings")
        .fetch_all(pool)
        .await?;

    let mut settings = Settings::default();
    for (name, value) in rows {
        match name.as_str() {
            KEY_API_KEY => settings.api_key = value,
            KEY_REVIEW_PROMPTS => {
                if let Ok(prompts) = serde_json::from_str::<Vec<String>>(&value) {
                    settings.review_prompts = normalize_prompts(prompts);
                }
            }
            KEY_NAME_PROMPT => settings.name_prompt = value,
            KEY_AUTO_GENERATE => settings.auto_generate = value == "true",
            KEY_DAILY_RATE => {
                if let Ok(rate) = value.parse::<u32>() {
                    settings.daily_rate = rate;
                }
            }
            KEY_INTERVAL_MINUTES => {
                if let Ok(minutes) = value.parse::<u32>() {
                    settings.interval_minutes = minutes;
                }
            }
            _ => {}
        }
    }

    Ok(settings)
}

pub async fn save(pool: &SqlitePool, settings: &Settings) -> Result<(), sqlx::Error> {
    let prompts = normalize_prompts(settings.review_prompts.clone());
    let prompts_json =
        serde_json::to_string(&prompts).unwrap_or_else(|_| "[]".to_string());

    upsert(pool, KEY_API_KEY, &settings.api_key).await?;
    upsert(pool, KEY_REVIEW_PROMPTS, &prompts_json).await?;
    upsert(pool, KEY_NAME_PROMPT, &settings.name_prompt).await?;
    upsert(
        pool,
        KEY_AUTO_GENERATE,
        if settings.auto_generate { "true" } else { "false" },
    )
    .await?;
    upsert(pool, KEY_DAILY_RATE, &settings.daily_rate.to_string()).await?;
    upsert(
        pool,
        KEY_INTERVAL_MINUTES,
        &settings.interval_minutes.to_string(),
    )
    .await?;

    Ok(())
}

/// Pads or truncates the prompt list to the fixed slot capacity.
pub fn normalize_prompts(mut prompts: Vec<String>) -> Vec<String> {
    prompts.truncate(PROMPT_SLOTS);
    prompts.resize(PROMPT_SLOTS, String::new());
    prompts
}

async fn upsert(pool: &SqlitePool, name: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO settings (name, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(name)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{DEFAULT_DAILY_RATE, DEFAULT_NAME_PROMPT};

    #[tokio::test]
    async fn load_returns_defaults_on_empty_store() {
        let pool = db::memory_pool().await;

        let settings = load(&pool).await.unwrap();

        assert_eq!(settings.api_key, "");
        assert_eq!(settings.review_prompts, vec![String::new(); PROMPT_SLOTS]);
        assert_eq!(settings.name_prompt, DEFAULT_NAME_PROMPT);
        assert!(!settings.auto_generate);
        assert_eq!(settings.daily_rate, DEFAULT_DAILY_RATE);
        assert_eq!(settings.interval_minutes, 0);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let pool = db::memory_pool().await;

        let settings = Settings {
            api_key: "sk-test".to_string(),
            review_prompts: vec![
                "Write a review of {{product_title}}".to_string(),
                String::new(),
                "Short take on {{product_description}}".to_string(),
            ],
            name_prompt: "Invent a reviewer name".to_string(),
            auto_generate: true,
            daily_rate: 7,
            interval_minutes: 30,
        };
        save(&pool, &settings).await.unwrap();

        let loaded = load(&pool).await.unwrap();
        assert_eq!(loaded.api_key, "sk-test");
        assert_eq!(loaded.review_prompts.len(), PROMPT_SLOTS);
        assert_eq!(loaded.review_prompts[0], "Write a review of {{product_title}}");
        assert_eq!(loaded.review_prompts[2], "Short take on {{product_description}}");
        assert!(loaded.auto_generate);
        assert_eq!(loaded.daily_rate, 7);
        assert_eq!(loaded.interval_minutes, 30);
    }

    #[tokio::test]
    async fn resave_overwrites_previous_values() {
        let pool = db::memory_pool().await;

        let mut settings = Settings::default();
        settings.daily_rate = 5;
        save(&pool, &settings).await.unwrap();

        settings.daily_rate = 3;
        settings.auto_generate = true;
        save(&pool, &settings).await.unwrap();

        let loaded = load(&pool).await.unwrap();
        assert_eq!(loaded.daily_rate, 3);
        assert!(loaded.auto_generate);
    }

    #[test]
    fn normalize_prompts_pads_and_truncates() {
        let padded = normalize_prompts(vec!["a".to_string()]);
        assert_eq!(padded.len(), PROMPT_SLOTS);
        assert_eq!(padded[0], "a");
        assert_eq!(padded[4], "");

        let truncated = normalize_prompts(vec!["x".to_string(); PROMPT_SLOTS + 3]);
        assert_eq!(truncated.len(), PROMPT_SLOTS);
    }
}
