//! AI access for the zimu backend.
//!
//! - [`GeminiClient`]: Gemini `generateContent` with ordered API-key fallback
//! - [`TextGenerator`]: the seam the worker and chat service call through
//! - [`PromptStore`]: hot-reloaded `prompts.json` templates

pub mod client;
pub mod config;
pub mod error;
pub mod prompts;

pub use client::{mask_key, FailureKind, GeminiClient, GenerateRequest, TextGenerator, Turn, TurnRole};
pub use config::GeminiConfig;
pub use error::{AiError, AiResult};
pub use prompts::{normalize_tag_reply, PromptStore};
