//! whisper.cpp CLI wrapper.
//!
//! Runs `whisper-cli` with JSON output (`-oj`) and progress printing (`-pp`),
//! reporting progress as it parses stderr.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};
use zimu_models::Segment;

use crate::command::ToolCommand;
use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};

static PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"progress\s*=\s*(\d{1,3})%").expect("valid progress regex"));

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    #[serde(default)]
    text: String,
}

/// Segment bounds in milliseconds.
#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

/// Extract the percentage from a `whisper_print_progress_callback` line.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    PROGRESS
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|p| p.min(100.0))
}

/// Parse the `-oj` JSON document into segments, dropping blank ones.
pub fn parse_output(raw: &str) -> MediaResult<Vec<Segment>> {
    let output: WhisperOutput = serde_json::from_str(raw)?;
    Ok(output
        .transcription
        .into_iter()
        .filter_map(|s| {
            let text = s.text.trim();
            (!text.is_empty()).then(|| {
                Segment::new(s.offsets.from as f64 / 1000.0, s.offsets.to as f64 / 1000.0, text)
            })
        })
        .collect())
}

/// Transcribe a 16 kHz WAV file.
///
/// The JSON result is written next to the audio and removed after parsing.
pub async fn transcribe_wav<F>(config: &MediaConfig, wav: &Path, mut on_progress: F) -> MediaResult<Vec<Segment>>
where
    F: FnMut(f64) + Send,
{
    if !config.whisper_model.exists() {
        return Err(MediaError::ModelNotFound(config.whisper_model.clone()));
    }

    let out_stem = wav.with_extension("");
    let json_path = out_stem.with_extension("json");

    let mut cmd = ToolCommand::new(&config.whisper_cli)
        .arg("-m")
        .arg(config.whisper_model.to_string_lossy())
        .arg("-f")
        .arg(wav.to_string_lossy())
        .args(["-l", config.whisper_language.as_str()])
        .args(["-oj", "-pp", "-of"])
        .arg(out_stem.to_string_lossy());
    if let Some(threads) = config.whisper_threads {
        cmd = cmd.args(["-t".to_string(), threads.to_string()]);
    }
    cmd.ensure_available()?;

    info!(audio = %wav.display(), model = %config.whisper_model.display(), "Starting whisper transcription");

    cmd.run_with_lines(|line| {
        if let Some(pct) = parse_progress_line(line) {
            on_progress(pct);
        } else {
            debug!("whisper: {}", line);
        }
    })
    .await?;

    let raw = tokio::fs::read_to_string(&json_path)
        .await
        .map_err(|e| MediaError::transcription_failed(format!("missing whisper output {}: {}", json_path.display(), e)))?;
    let segments = parse_output(&raw)?;

    if let Err(e) = tokio::fs::remove_file(&json_path).await {
        debug!(error = %e, "Failed to remove whisper output");
    }

    info!(segments = segments.len(), "Whisper transcription complete");
    Ok(segments)
}
