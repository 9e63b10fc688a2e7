//! Persisted project records.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::task::lenient_source;
use crate::{infer_title_from_url, ProjectId, Segment, SubtitleSource, Task, TaskStatus, VideoMeta};

/// Title shown when neither metadata nor a placeholder is available.
pub const UNTITLED_PROJECT: &str = "Untitled project";

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a follow-up conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Durable record of one processed (or processing) video.
///
/// All fields default so project files written by older builds still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: ProjectId,
    pub video_url: String,
    #[serde(flatten)]
    pub meta: VideoMeta,
    #[serde(deserialize_with = "lenient_source")]
    pub subtitle_source: Option<SubtitleSource>,
    pub transcript: String,
    pub segments: Vec<Segment>,
    pub summary: String,
    pub tag: String,
    pub favorite: bool,
    pub created_at: String,
    #[serde(deserialize_with = "lenient_status")]
    pub status: TaskStatus,
    pub message: String,
    pub progress: String,
    pub transcribe_percent: f64,
    pub transcribe_current: u64,
    pub transcribe_total: u64,
    #[serde(deserialize_with = "lenient_history")]
    pub chat_history: Vec<ChatMessage>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: ProjectId::from_string(""),
            video_url: String::new(),
            meta: VideoMeta::default(),
            subtitle_source: None,
            transcript: String::new(),
            segments: Vec::new(),
            summary: String::new(),
            tag: String::new(),
            favorite: false,
            created_at: String::new(),
            status: TaskStatus::Done,
            message: String::new(),
            progress: String::new(),
            transcribe_percent: 0.0,
            transcribe_current: 0,
            transcribe_total: 0,
            chat_history: Vec::new(),
        }
    }
}

impl Project {
    /// Placeholder written at submission so the project shows up before
    /// the worker reaches it.
    pub fn placeholder(task: &Task) -> Self {
        let mut project = Self::from_task(task);
        project.meta.title = infer_title_from_url(&task.video_url);
        project
    }

    /// Snapshot of a task as a project with no chat history.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            video_url: task.video_url.clone(),
            meta: task.meta.clone(),
            subtitle_source: task.subtitle_source,
            transcript: task.transcript.clone(),
            segments: task.segments.clone(),
            summary: task.summary.clone(),
            tag: task.tag.clone(),
            favorite: false,
            created_at: task.created_at.clone(),
            status: task.status,
            message: task.message.clone(),
            progress: task.progress.clone(),
            transcribe_percent: task.transcribe_percent,
            transcribe_current: task.transcribe_current,
            transcribe_total: task.transcribe_total,
            chat_history: Vec::new(),
        }
    }

    /// Overlay the live task state onto the stored record.
    ///
    /// Title, URL, subtitle source and creation time only replace stored
    /// values when the task has one; favorite and chat history always come
    /// from disk.
    pub fn merge_task(&mut self, task: &Task) {
        self.id = task.id.clone();
        if !task.meta.title.is_empty() {
            self.meta.title = task.meta.title.clone();
        }
        if !task.video_url.is_empty() {
            self.video_url = task.video_url.clone();
        }
        self.meta.uploader = task.meta.uploader.clone();
        self.meta.upload_date = task.meta.upload_date.clone();
        self.meta.thumbnail = task.meta.thumbnail.clone();
        self.meta.uploader_url = task.meta.uploader_url.clone();
        self.meta.uploader_avatar = task.meta.uploader_avatar.clone();
        if task.subtitle_source.is_some() {
            self.subtitle_source = task.subtitle_source;
        }
        self.segments = task.segments.clone();
        self.transcript = task.transcript.clone();
        self.summary = task.summary.clone();
        if !task.created_at.is_empty() {
            self.created_at = task.created_at.clone();
        }
        self.status = task.status;
        self.message = task.message.clone();
        self.progress = task.progress.clone();
        self.transcribe_percent = task.transcribe_percent;
        self.transcribe_current = task.transcribe_current;
        self.transcribe_total = task.transcribe_total;
        self.tag = task.tag.clone();
    }

    /// List-view row for this project.
    pub fn summary_row(&self) -> ProjectSummary {
        let title = if self.meta.title.is_empty() {
            UNTITLED_PROJECT.to_string()
        } else {
            self.meta.title.clone()
        };
        ProjectSummary {
            id: self.id.clone(),
            title,
            subtitle_source: self.subtitle_source,
            created_at: self.created_at.clone(),
            video_url: self.video_url.clone(),
            thumbnail: self.meta.thumbnail.clone(),
            uploader: self.meta.uploader.clone(),
            upload_date: self.meta.upload_date.clone(),
            uploader_url: self.meta.uploader_url.clone(),
            uploader_avatar: self.meta.uploader_avatar.clone(),
            status: self.status,
            message: self.message.clone(),
            progress: self.progress.clone(),
            transcribe_percent: self.transcribe_percent,
            tag: self.tag.clone(),
            favorite: self.favorite,
        }
    }
}

/// Status as written by any build. Older files used `pending` and
/// `processing`; anything unrecognized is treated as failed.
fn lenient_status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Other(IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Name(name) => match name.as_str() {
            "queued" | "pending" => TaskStatus::Queued,
            "checking_subtitles" => TaskStatus::CheckingSubtitles,
            "downloading" => TaskStatus::Downloading,
            "transcribing" | "processing" => TaskStatus::Transcribing,
            "summarizing" => TaskStatus::Summarizing,
            "done" => TaskStatus::Done,
            _ => TaskStatus::Error,
        },
        Raw::Other(_) => TaskStatus::Error,
    })
}

/// Chat history with legacy entries dropped: plain strings, roles other
/// than user/assistant, and anything that is not an object.
fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<ChatMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct RawMessage {
        #[serde(default)]
        role: String,
        #[serde(default)]
        content: String,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Message(RawMessage),
        Other(IgnoredAny),
    }

    let entries = Option::<Vec<Entry>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Message(RawMessage { role, content }) => match role.as_str() {
                "user" => Some(ChatMessage::user(content)),
                "assistant" | "model" => Some(ChatMessage::assistant(content)),
                _ => None,
            },
            Entry::Other(_) => None,
        })
        .collect())
}

/// Project row returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub title: String,
    pub subtitle_source: Option<SubtitleSource>,
    pub created_at: String,
    pub video_url: String,
    pub thumbnail: String,
    pub uploader: String,
    pub upload_date: String,
    pub uploader_url: String,
    pub uploader_avatar: String,
    pub status: TaskStatus,
    pub message: String,
    pub progress: String,
    pub transcribe_percent: f64,
    pub tag: String,
    pub favorite: bool,
}
