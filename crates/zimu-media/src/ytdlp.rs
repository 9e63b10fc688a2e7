//! yt-dlp metadata probe and audio download.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};
use zimu_models::{format_upload_date, VideoMeta};

use crate::command::ToolCommand;
use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};

/// Extensions yt-dlp may leave behind for an audio download, in lookup order.
const AUDIO_EXTENSIONS: [&str; 8] = ["wav", "m4a", "mp3", "ogg", "opus", "webm", "mp4", "flac"];

/// One downloadable caption rendition.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleFormat {
    #[serde(default, deserialize_with = "null_default")]
    pub ext: String,
    #[serde(default, deserialize_with = "null_default")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The subset of `yt-dlp --dump-single-json` output we read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub uploader_id: Option<String>,
    pub upload_date: Option<String>,
    pub uploader_url: Option<String>,
    pub channel_url: Option<String>,
    pub uploader_thumbnail: Option<String>,
    pub channel_thumbnail: Option<String>,
    pub avatar: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub thumbnails: Vec<Thumbnail>,
    pub webpage_url: Option<String>,
    pub original_url: Option<String>,
    /// Human-authored captions by language
    #[serde(deserialize_with = "null_default")]
    pub subtitles: HashMap<String, Vec<SubtitleFormat>>,
    /// Host-generated captions by language
    #[serde(deserialize_with = "null_default")]
    pub automatic_captions: HashMap<String, Vec<SubtitleFormat>>,
}

/// yt-dlp emits `null` for absent lists and maps.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn first_non_empty<'a>(candidates: impl IntoIterator<Item = &'a Option<String>>) -> String {
    candidates
        .into_iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

impl VideoInfo {
    /// Metadata shown on the project card.
    pub fn meta(&self) -> VideoMeta {
        let title = first_non_empty([&self.title]);
        let uploader = first_non_empty([&self.uploader, &self.channel, &self.uploader_id]);
        let upload_date = format_upload_date(self.upload_date.as_deref().unwrap_or_default());

        let mut uploader_url = first_non_empty([&self.uploader_url, &self.channel_url]);
        if uploader_url.is_empty() {
            let page = first_non_empty([&self.webpage_url, &self.original_url]);
            let mid = first_non_empty([&self.uploader_id]);
            if page.contains("bilibili.com") && !mid.is_empty() {
                uploader_url = format!("https://space.bilibili.com/{}", mid);
            }
        }

        let mut uploader_avatar =
            first_non_empty([&self.uploader_thumbnail, &self.channel_thumbnail, &self.avatar]);
        if uploader_avatar.is_empty() {
            uploader_avatar = self
                .thumbnails
                .iter()
                .find(|t| t.id.as_deref() == Some("avatar"))
                .and_then(|t| t.url.clone())
                .unwrap_or_default();
        }

        let mut thumbnail = first_non_empty([&self.thumbnail]);
        if thumbnail.is_empty() {
            thumbnail = self
                .thumbnails
                .last()
                .and_then(|t| t.url.clone())
                .unwrap_or_default();
        }

        VideoMeta {
            title,
            uploader,
            upload_date,
            thumbnail,
            uploader_url,
            uploader_avatar,
        }
    }
}

/// Read metadata and caption listings without downloading media.
pub async fn probe_video(config: &MediaConfig, url: &str) -> MediaResult<VideoInfo> {
    info!("Probing video metadata for {}", url);

    let output = ToolCommand::new(&config.ytdlp_path)
        .args(["--dump-single-json", "--skip-download", "--no-playlist", "--no-warnings"])
        .args(config.cookie_args())
        .arg(url)
        .timeout(config.probe_timeout)
        .output()
        .await?;

    let info: VideoInfo = serde_json::from_str(output.stdout.trim())?;
    debug!(
        id = ?info.id,
        subtitles = info.subtitles.len(),
        automatic_captions = info.automatic_captions.len(),
        "Probe complete"
    );
    Ok(info)
}

/// Download best-effort audio as 16 kHz mono WAV next to `stem`.
///
/// Returns the path of the file yt-dlp actually produced.
pub async fn download_audio(config: &MediaConfig, url: &str, stem: &Path) -> MediaResult<PathBuf> {
    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let template = format!("{}.%(ext)s", stem.display());
    info!("Downloading audio for {} to {}", url, template);

    ToolCommand::new(&config.ytdlp_path)
        .args(["-f", "bestaudio/best", "-x", "--audio-format", "wav"])
        .args(["--postprocessor-args", "ExtractAudio:-ar 16000 -ac 1"])
        .args(["--no-playlist", "--no-warnings", "--quiet"])
        .args(config.cookie_args())
        .args(["-o", template.as_str()])
        .arg(url)
        .output()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    let audio = find_audio_file(stem)
        .await?
        .ok_or_else(|| MediaError::download_failed(format!("no audio file found for {}.*", stem.display())))?;

    let size = tokio::fs::metadata(&audio).await.map(|m| m.len()).unwrap_or(0);
    info!(path = %audio.display(), bytes = size, "Audio downloaded");
    Ok(audio)
}

/// Locate `<stem>.<ext>` by known extension, then by any file sharing the stem.
pub async fn find_audio_file(stem: &Path) -> MediaResult<Option<PathBuf>> {
    for ext in AUDIO_EXTENSIONS {
        let candidate = stem.with_extension(ext);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Ok(Some(candidate));
        }
    }

    let Some(name) = stem.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(None);
    };
    let dir = match stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };

    let prefix = format!("{}.", name);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
