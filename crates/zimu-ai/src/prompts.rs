//! Prompt templates loaded from `prompts.json`.
//!
//! The file is a flat JSON object of template strings. Keys starting with `_`
//! are comments. The cache is refreshed whenever the file's mtime changes; a
//! failed read keeps whatever was loaded before.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub const SUMMARY_PROMPT: &str = "summary_prompt";
pub const CLASSIFY_PROMPT: &str = "classify_prompt";
pub const CHAT_SYSTEM_PROMPT: &str = "chat_system_prompt";

const DEFAULT_SUMMARY_TEMPLATE: &str = "请总结以下视频字幕内容，使用中文 Markdown 格式：\n\n{transcript}";
const DEFAULT_CHAT_TEMPLATE: &str =
    "你是一位视频内容分析助手。以下是视频字幕：\n\n---\n{transcript}\n---\n\n请基于字幕内容回答用户问题。";

const UNKNOWN_TITLE: &str = "Unknown title";
const UNKNOWN_UPLOADER: &str = "Unknown uploader";
const UNKNOWN_DATE: &str = "Unknown date";

/// Separator used when listing tags inside a prompt.
const TAG_SEPARATOR: &str = "、";

#[derive(Debug, Default)]
struct PromptCache {
    mtime: Option<SystemTime>,
    templates: HashMap<String, String>,
}

/// Hot-reloading template store.
#[derive(Debug)]
pub struct PromptStore {
    path: PathBuf,
    cache: RwLock<PromptCache>,
}

fn or_unknown<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Strip whitespace and quotes from a classification reply.
pub fn normalize_tag_reply(reply: &str) -> &str {
    reply.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

impl PromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(PromptCache::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn reload_if_changed(&self) {
        let mtime = match tokio::fs::metadata(&self.path).await.and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to stat prompts file");
                return;
            }
        };

        if self.cache.read().await.mtime == Some(mtime) {
            return;
        }

        let mut cache = self.cache.write().await;
        if cache.mtime == Some(mtime) {
            return;
        }

        match self.read_templates().await {
            Ok(templates) => {
                info!(templates = templates.len(), "Loaded prompts file");
                cache.templates = templates;
                cache.mtime = Some(mtime);
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read prompts file");
            }
        }
    }

    async fn read_templates(&self) -> Result<HashMap<String, String>, Box<dyn std::error::Error + Send + Sync>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)?;
        Ok(object
            .into_iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect())
    }

    /// Non-empty template for `key`, reloading first if the file changed.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.reload_if_changed().await;
        self.cache
            .read()
            .await
            .templates
            .get(key)
            .filter(|t| !t.trim().is_empty())
            .cloned()
    }

    /// Summary prompt for a transcript and its video metadata.
    pub async fn summary_prompt(&self, transcript: &str, title: &str, uploader: &str, upload_date: &str) -> String {
        let template = self.get(SUMMARY_PROMPT).await.unwrap_or_else(|| {
            warn!("summary_prompt missing from prompts file, using built-in default");
            DEFAULT_SUMMARY_TEMPLATE.to_string()
        });
        template
            .replace("{transcript}", transcript)
            .replace("{title}", or_unknown(title, UNKNOWN_TITLE))
            .replace("{uploader}", or_unknown(uploader, UNKNOWN_UPLOADER))
            .replace("{upload_date}", or_unknown(upload_date, UNKNOWN_DATE))
    }

    /// Classification prompt, or `None` when no template is configured.
    pub async fn classify_prompt(&self, title: &str, tags: &[String]) -> Option<String> {
        let template = self.get(CLASSIFY_PROMPT).await?;
        Some(
            template
                .replace("{title}", title)
                .replace("{tags}", &tags.join(TAG_SEPARATOR)),
        )
    }

    pub async fn has_classify_prompt(&self) -> bool {
        self.get(CLASSIFY_PROMPT).await.is_some()
    }

    /// System context for chat about a transcript.
    pub async fn chat_system_prompt(&self, transcript: &str) -> String {
        let template = self.get(CHAT_SYSTEM_PROMPT).await.unwrap_or_else(|| {
            warn!("chat_system_prompt missing from prompts file, using built-in default");
            DEFAULT_CHAT_TEMPLATE.to_string()
        });
        template.replace("{transcript}", transcript)
    }
}
