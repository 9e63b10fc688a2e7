//! Tag classification of a video title.

use tracing::{info, warn};
use zimu_ai::{normalize_tag_reply, PromptStore, TextGenerator};

use crate::error::WorkerResult;

/// Outcome of asking the model for a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The reply matched a known tag
    Tagged(String),
    /// The reply was not one of the tags
    Rejected(String),
    /// No tags or no classify template configured
    Disabled,
}

/// Ask the model to pick one of `tags` for `title`.
pub async fn classify_title(
    ai: &dyn TextGenerator,
    prompts: &PromptStore,
    title: &str,
    tags: &[String],
) -> WorkerResult<Classification> {
    if tags.is_empty() {
        return Ok(Classification::Disabled);
    }
    let Some(prompt) = prompts.classify_prompt(title, tags).await else {
        return Ok(Classification::Disabled);
    };

    let reply = ai.generate_text(&prompt).await?;
    let chosen = normalize_tag_reply(&reply);

    if tags.iter().any(|t| t == chosen) {
        info!(title = %title, tag = %chosen, "Classified video");
        Ok(Classification::Tagged(chosen.to_string()))
    } else {
        warn!(title = %title, reply = %chosen, "Model reply is not a known tag");
        Ok(Classification::Rejected(chosen.to_string()))
    }
}
