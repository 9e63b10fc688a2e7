//! Official and host-generated caption lookup.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use zimu_models::{Segment, SubtitleSource, VideoMeta};

use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};
use crate::subtitles::{parse_caption, select_track, SubtitleTrack};
use crate::ytdlp::probe_video;

/// Captions fetched from the video host.
#[derive(Debug, Clone)]
pub struct Captions {
    pub source: SubtitleSource,
    pub language: String,
    pub segments: Vec<Segment>,
}

/// Result of probing a video for metadata and captions.
#[derive(Debug, Clone)]
pub struct CaptionProbe {
    pub meta: VideoMeta,
    /// `None` when no track exists or the track parsed to nothing
    pub captions: Option<Captions>,
}

/// Source of video metadata and captions.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn probe(&self, url: &str) -> MediaResult<CaptionProbe>;
}

/// Caption provider backed by `yt-dlp` plus an HTTP download of the track.
pub struct YtDlpCaptionProvider {
    config: MediaConfig,
    client: Client,
}

impl YtDlpCaptionProvider {
    pub fn new(config: MediaConfig) -> MediaResult<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(config.subtitle_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Download and parse one caption track.
    pub async fn fetch_track(&self, track: &SubtitleTrack) -> MediaResult<Vec<Segment>> {
        let response = self.client.get(&track.url).send().await?;
        if !response.status().is_success() {
            return Err(MediaError::download_failed(format!(
                "caption download returned {}",
                response.status()
            )));
        }
        let raw = response.text().await?;
        Ok(parse_caption(&raw))
    }
}

#[async_trait]
impl CaptionProvider for YtDlpCaptionProvider {
    async fn probe(&self, url: &str) -> MediaResult<CaptionProbe> {
        let info = probe_video(&self.config, url).await?;
        let meta = info.meta();

        let Some(track) = select_track(&info) else {
            info!("No caption track available for {}", url);
            return Ok(CaptionProbe { meta, captions: None });
        };

        info!(
            language = %track.language,
            source = %track.source,
            ext = %track.ext,
            "Found caption track"
        );

        // Metadata is still worth keeping when only the track download fails.
        let segments = match self.fetch_track(&track).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!(error = %e, "Caption download failed, falling back to transcription");
                return Ok(CaptionProbe { meta, captions: None });
            }
        };

        if segments.is_empty() {
            info!("Caption track parsed to zero segments");
            return Ok(CaptionProbe { meta, captions: None });
        }

        Ok(CaptionProbe {
            meta,
            captions: Some(Captions {
                source: track.source,
                language: track.language,
                segments,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track(url: String) -> SubtitleTrack {
        SubtitleTrack {
            source: SubtitleSource::Official,
            language: "en".to_string(),
            ext: "json3".to_string(),
            url,
        }
    }

    #[tokio::test]
    async fn test_fetch_track_parses_json3() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/timedtext"))
            .and(header("user-agent", "Mozilla/5.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"events": [{"tStartMs": 1000, "dDurationMs": 1000, "segs": [{"utf8": "hi"}]}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = YtDlpCaptionProvider::new(MediaConfig::default()).unwrap();
        let segments = provider
            .fetch_track(&track(format!("{}/timedtext", server.uri())))
            .await
            .unwrap();

        assert_eq!(segments, vec![Segment::new(1.0, 2.0, "hi")]);
    }

    #[tokio::test]
    async fn test_fetch_track_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = YtDlpCaptionProvider::new(MediaConfig::default()).unwrap();
        let result = provider.fetch_track(&track(format!("{}/missing", server.uri()))).await;
        assert!(matches!(result, Err(MediaError::DownloadFailed { .. })));
    }
}
