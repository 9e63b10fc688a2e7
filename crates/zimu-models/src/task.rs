//! In-flight task records.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{now_timestamp, ProjectId, SubtitleSource, TaskStatus};

/// Title used when video metadata could not be read.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// One timed unit of transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    #[serde(default)]
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Descriptive metadata about the source video.
///
/// Every field is an empty string when unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMeta {
    pub title: String,
    pub uploader: String,
    /// `YYYY-MM-DD` when the host reported a date
    pub upload_date: String,
    pub thumbnail: String,
    pub uploader_url: String,
    pub uploader_avatar: String,
}

impl VideoMeta {
    /// Metadata used when the probe failed.
    pub fn unknown() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            ..Default::default()
        }
    }
}

/// Live state of one submitted URL, polled by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: ProjectId,
    pub status: TaskStatus,
    pub message: String,
    pub video_url: String,
    #[serde(flatten)]
    pub meta: VideoMeta,
    #[serde(default, deserialize_with = "lenient_source")]
    pub subtitle_source: Option<SubtitleSource>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tag: String,
    /// Free-text progress line shown under the status message
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub transcribe_percent: f64,
    #[serde(default)]
    pub transcribe_current: u64,
    #[serde(default)]
    pub transcribe_total: u64,
    pub created_at: String,
    /// The user renamed the project while the job was live
    #[serde(skip)]
    pub title_edited: bool,
    /// The user tagged the project while the job was live
    #[serde(skip)]
    pub tag_edited: bool,
}

/// Message shown while a task waits in the queue.
pub const QUEUED_MESSAGE: &str = "Queued, waiting for processing...";

impl Task {
    /// Create a queued task for an already-normalized URL.
    pub fn queued(id: ProjectId, video_url: impl Into<String>) -> Self {
        Self {
            id,
            status: TaskStatus::Queued,
            message: QUEUED_MESSAGE.to_string(),
            video_url: video_url.into(),
            meta: VideoMeta::default(),
            subtitle_source: None,
            transcript: String::new(),
            segments: Vec::new(),
            summary: String::new(),
            tag: String::new(),
            progress: String::new(),
            transcribe_percent: 0.0,
            transcribe_current: 0,
            transcribe_total: 0,
            created_at: now_timestamp(),
            title_edited: false,
            tag_edited: false,
        }
    }

    /// Title chosen by the user. Later metadata does not replace it.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.meta.title = title.into();
        self.title_edited = true;
    }

    /// Tag chosen by the user. Automatic classification does not replace it.
    pub fn retag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
        self.tag_edited = true;
    }

    /// Take probed metadata, keeping a user-set title.
    pub fn apply_meta(&mut self, meta: VideoMeta) {
        let title = std::mem::take(&mut self.meta.title);
        self.meta = meta;
        if self.title_edited {
            self.meta.title = title;
        }
    }

    /// Update status and message together.
    pub fn set_status(&mut self, status: TaskStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    /// Mark the task failed.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.status = TaskStatus::Error;
        self.message = format!("Processing failed: {}", error);
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }
}

/// Accepts a missing, null or empty `subtitle_source` as unknown.
pub(crate) fn lenient_source<'de, D>(deserializer: D) -> Result<Option<SubtitleSource>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("official") => Some(SubtitleSource::Official),
        Some("auto_generated") | Some("auto") => Some(SubtitleSource::AutoGenerated),
        Some("whisper") => Some(SubtitleSource::Whisper),
        _ => None,
    })
}
