//! Gemini client configuration.

use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Keys tried in order on every call
    pub api_keys: Vec<String>,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Pause before trying the next key
    pub fallback_delay: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            fallback_delay: Duration::from_millis(500),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    ///
    /// `GEMINI_API_KEYS` (comma separated) wins over `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_keys: parse_keys(
                std::env::var("GEMINI_API_KEYS").ok().as_deref(),
                std::env::var("GEMINI_API_KEY").ok().as_deref(),
            ),
            model: std::env::var("GEMINI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            fallback_delay: defaults.fallback_delay,
        }
    }
}

fn parse_keys(multi: Option<&str>, single: Option<&str>) -> Vec<String> {
    let keys: Vec<String> = multi
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();
    if !keys.is_empty() {
        return keys;
    }

    single
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| vec![k.to_string()])
        .unwrap_or_default()
}
