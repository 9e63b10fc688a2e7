//! Media tool configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Paths and limits for the external media tools.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// yt-dlp executable
    pub ytdlp_path: String,
    /// ffmpeg executable (audio conversion)
    pub ffmpeg_path: String,
    /// whisper.cpp CLI executable
    pub whisper_cli: String,
    /// ggml model file for whisper.cpp
    pub whisper_model: PathBuf,
    /// Spoken language passed to whisper
    pub whisper_language: String,
    /// Worker threads for whisper (its own default when unset)
    pub whisper_threads: Option<u32>,
    /// Netscape cookies file handed to yt-dlp
    pub cookies_file: Option<PathBuf>,
    /// Metadata probe timeout
    pub probe_timeout: Duration,
    /// Caption file download timeout
    pub subtitle_timeout: Duration,
    /// Thumbnail/avatar download timeout
    pub image_timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            whisper_cli: "whisper-cli".to_string(),
            whisper_model: PathBuf::from("models/ggml-large-v3-turbo.bin"),
            whisper_language: "zh".to_string(),
            whisper_threads: None,
            cookies_file: None,
            probe_timeout: Duration::from_secs(120),
            subtitle_timeout: Duration::from_secs(15),
            image_timeout: Duration::from_secs(20),
        }
    }
}

impl MediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            whisper_cli: std::env::var("WHISPER_CLI").unwrap_or(defaults.whisper_cli),
            whisper_model: std::env::var("WHISPER_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.whisper_model),
            whisper_language: std::env::var("WHISPER_LANGUAGE").unwrap_or(defaults.whisper_language),
            whisper_threads: std::env::var("WHISPER_THREADS")
                .ok()
                .and_then(|s| s.parse().ok()),
            cookies_file: std::env::var("YTDLP_COOKIES")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            probe_timeout: Duration::from_secs(
                std::env::var("PROBE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            subtitle_timeout: Duration::from_secs(
                std::env::var("SUBTITLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            image_timeout: Duration::from_secs(
                std::env::var("IMAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }

    /// `--cookies <file>` when a cookies file is configured and present.
    pub(crate) fn cookie_args(&self) -> Vec<String> {
        match &self.cookies_file {
            Some(path) if path.exists() => {
                vec!["--cookies".to_string(), path.to_string_lossy().into_owned()]
            }
            _ => Vec::new(),
        }
    }
}
