//! Task lifecycle status.

use serde::{Deserialize, Serialize};

/// Processing status of a task.
///
/// Transitions run `queued -> checking_subtitles -> [downloading -> transcribing]
/// -> summarizing -> done`, with `error` reachable from any running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue
    #[default]
    Queued,
    /// Probing the video for official or host-generated captions
    CheckingSubtitles,
    /// Downloading audio for local transcription
    Downloading,
    /// Running speech recognition
    Transcribing,
    /// Waiting for the AI summary
    Summarizing,
    /// Finished and persisted
    Done,
    /// Failed with a message
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::CheckingSubtitles => "checking_subtitles",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Transcribing => "transcribing",
            TaskStatus::Summarizing => "summarizing",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }

    /// Queued or in any processing step.
    pub fn is_running(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleSource {
    /// Human-authored captions published with the video
    Official,
    /// Captions generated by the video host's own speech recognition
    AutoGenerated,
    /// Local speech recognition on downloaded audio
    Whisper,
}

impl SubtitleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleSource::Official => "official",
            SubtitleSource::AutoGenerated => "auto_generated",
            SubtitleSource::Whisper => "whisper",
        }
    }
}

impl std::fmt::Display for SubtitleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
