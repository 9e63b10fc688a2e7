//! Error types for AI calls.

use thiserror::Error;

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("No Gemini API key configured, set GEMINI_API_KEYS")]
    NoApiKeys,

    #[error("All {attempts} Gemini keys failed: {last}")]
    AllKeysFailed { attempts: usize, last: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gemini returned an empty response")]
    EmptyResponse,
}

impl AiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}
