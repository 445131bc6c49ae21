use serde::{Deserialize, Serialize};

/// Fixed number of review prompt slots offered to the operator.
pub const PROMPT_SLOTS: usize = 5;

pub const DEFAULT_NAME_PROMPT: &str = "Give me a random name for a product reviewer.";
pub const DEFAULT_DAILY_RATE: u32 = 10;

/// Operator-editable configuration, persisted row-per-key in the `settings`
/// table. Components receive this struct by value and never read the store
/// themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub review_prompts: Vec<String>,
    pub name_prompt: String,
    pub auto_generate: bool,
    pub daily_rate: u32,
    pub interval_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            review_prompts: vec![String::new(); PROMPT_SLOTS],
            name_prompt: DEFAULT_NAME_PROMPT.to_string(),
            auto_generate: false,
            daily_rate: DEFAULT_DAILY_RATE,
            interval_minutes: 0,
        }
    }
}

impl Settings {
    /// Scheduling is allowed only when auto generation is on and the spacing
    /// interval is non-zero.
    pub fn scheduling_enabled(&self) -> bool {
        self.auto_generate && self.interval_minutes > 0
    }
}
