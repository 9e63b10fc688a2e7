//! Media acquisition for the zimu backend.
//!
//! This crate provides:
//! - yt-dlp metadata probing and audio download
//! - Caption track selection and json3/WebVTT parsing
//! - Local speech recognition through the whisper.cpp CLI
//! - Image fetching for the thumbnail proxy

pub mod captions;
pub mod command;
pub mod config;
pub mod error;
pub mod image;
pub mod subtitles;
pub mod transcribe;
pub mod whisper;
pub mod ytdlp;

pub use captions::{CaptionProbe, CaptionProvider, Captions, YtDlpCaptionProvider};
pub use command::{ToolCommand, ToolOutput};
pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use image::{FetchedImage, ImageFetcher};
pub use subtitles::{parse_caption, parse_json3, parse_vtt, select_track, SubtitleTrack, LANGUAGE_PRIORITY};
pub use transcribe::{TranscribeProgress, Transcriber, WhisperTranscriber};
pub use ytdlp::{probe_video, VideoInfo};
