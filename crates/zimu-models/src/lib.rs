//! Shared data models for the zimu backend.
//!
//! This crate provides Serde-serializable types for:
//! - Tasks and their lifecycle status
//! - Persisted projects and chat history
//! - Transcript segments and video metadata
//! - URL extraction and normalization helpers

pub mod ids;
pub mod project;
pub mod status;
pub mod task;
pub mod url;
pub mod utils;

// Re-export common types
pub use ids::{ProjectId, SessionId};
pub use project::{ChatMessage, ChatRole, Project, ProjectSummary, UNTITLED_PROJECT};
pub use status::{SubtitleSource, TaskStatus};
pub use task::{Segment, Task, VideoMeta, QUEUED_MESSAGE, UNKNOWN_TITLE};
pub use url::{extract_first_url, infer_title_from_url, normalize_url};
pub use utils::{build_timestamped_transcript, format_timestamp, format_upload_date, now_timestamp};
