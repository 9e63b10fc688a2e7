//! Audio download plus local transcription.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};
use zimu_models::Segment;

use crate::command::ToolCommand;
use crate::config::MediaConfig;
use crate::error::MediaResult;
use crate::whisper::transcribe_wav;
use crate::ytdlp::download_audio;

/// Progress events emitted while transcribing.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscribeProgress {
    /// Fetching audio
    Downloading,
    /// Audio ready, recognizer starting
    Transcribing,
    /// Recognizer progress
    Progress { percent: f64, current: u64, total: u64 },
    /// All segments produced
    Finished { segments: usize },
}

/// Speech-to-text fallback used when a video has no captions.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `url`, using `work_stem` as the base name of temporary files.
    async fn transcribe(
        &self,
        url: &str,
        work_stem: &Path,
        progress: mpsc::UnboundedSender<TranscribeProgress>,
    ) -> MediaResult<Vec<Segment>>;
}

/// yt-dlp audio download followed by whisper.cpp.
pub struct WhisperTranscriber {
    config: MediaConfig,
}

impl WhisperTranscriber {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Convert to 16 kHz mono PCM WAV unless yt-dlp already produced WAV.
    async fn ensure_wav(&self, audio: &Path, work_stem: &Path) -> MediaResult<PathBuf> {
        if audio.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
            return Ok(audio.to_path_buf());
        }

        let wav = work_stem.with_extension("16k.wav");
        info!(from = %audio.display(), to = %wav.display(), "Converting audio to WAV");
        ToolCommand::new(&self.config.ffmpeg_path)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(audio.to_string_lossy())
            .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
            .arg(wav.to_string_lossy())
            .output()
            .await?;
        Ok(wav)
    }

    async fn run(
        &self,
        url: &str,
        work_stem: &Path,
        progress: &mpsc::UnboundedSender<TranscribeProgress>,
        temp_files: &mut Vec<PathBuf>,
    ) -> MediaResult<Vec<Segment>> {
        let _ = progress.send(TranscribeProgress::Downloading);
        let audio = download_audio(&self.config, url, work_stem).await?;
        temp_files.push(audio.clone());

        let wav = self.ensure_wav(&audio, work_stem).await?;
        if wav != audio {
            temp_files.push(wav.clone());
        }

        let _ = progress.send(TranscribeProgress::Transcribing);
        let segments = transcribe_wav(&self.config, &wav, |percent| {
            let _ = progress.send(TranscribeProgress::Progress {
                percent,
                current: percent.round() as u64,
                total: 100,
            });
        })
        .await?;

        let _ = progress.send(TranscribeProgress::Finished {
            segments: segments.len(),
        });
        Ok(segments)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(
        &self,
        url: &str,
        work_stem: &Path,
        progress: mpsc::UnboundedSender<TranscribeProgress>,
    ) -> MediaResult<Vec<Segment>> {
        let mut temp_files = Vec::new();
        let result = self.run(url, work_stem, &progress, &mut temp_files).await;

        for path in temp_files {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %e, "Failed to remove temp audio");
            }
        }

        result
    }
}
