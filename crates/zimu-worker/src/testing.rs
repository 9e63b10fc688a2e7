//! Fake backends for pipeline and executor tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use zimu_ai::{AiError, AiResult, GenerateRequest, TextGenerator};
use zimu_media::{CaptionProbe, CaptionProvider, Captions, MediaError, MediaResult, TranscribeProgress, Transcriber};
use zimu_models::{Project, ProjectId, Segment, SubtitleSource, Task, VideoMeta};
use zimu_queue::ProcessVideoJob;

use crate::config::WorkerConfig;
use crate::context::ProcessingContext;

pub(crate) struct FakeCaptions {
    captions: Option<Captions>,
    fail: bool,
    /// Probing a URL containing this text panics
    panic_marker: Option<&'static str>,
}

impl FakeCaptions {
    pub(crate) fn with(captions: Captions) -> Self {
        Self {
            captions: Some(captions),
            fail: false,
            panic_marker: None,
        }
    }

    pub(crate) fn none() -> Self {
        Self {
            captions: None,
            fail: false,
            panic_marker: None,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::none()
        }
    }

    pub(crate) fn panicking_on(mut self, marker: &'static str) -> Self {
        self.panic_marker = Some(marker);
        self
    }
}

#[async_trait]
impl CaptionProvider for FakeCaptions {
    async fn probe(&self, url: &str) -> MediaResult<CaptionProbe> {
        if let Some(marker) = self.panic_marker {
            if url.contains(marker) {
                panic!("probe exploded");
            }
        }
        if self.fail {
            return Err(MediaError::ToolNotFound("yt-dlp".to_string()));
        }
        Ok(CaptionProbe {
            meta: VideoMeta {
                title: "Rust in 100 seconds".to_string(),
                uploader: "Fireship".to_string(),
                ..Default::default()
            },
            captions: self.captions.clone(),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeTranscriber {
    pub(crate) calls: AtomicUsize,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(
        &self,
        _url: &str,
        _work_stem: &Path,
        progress: mpsc::UnboundedSender<TranscribeProgress>,
    ) -> MediaResult<Vec<Segment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = progress.send(TranscribeProgress::Downloading);
        let _ = progress.send(TranscribeProgress::Transcribing);
        let _ = progress.send(TranscribeProgress::Progress {
            percent: 50.0,
            current: 50,
            total: 100,
        });
        let _ = progress.send(TranscribeProgress::Finished { segments: 1 });
        Ok(vec![Segment::new(0.0, 2.0, "spoken words")])
    }
}

/// Answers classify prompts with `tag_reply` and everything else with `summary`.
pub(crate) struct FakeAi {
    pub(crate) summary: Result<String, String>,
    pub(crate) tag_reply: String,
}

impl FakeAi {
    pub(crate) fn ok(summary: &str, tag_reply: &str) -> Self {
        Self {
            summary: Ok(summary.to_string()),
            tag_reply: tag_reply.to_string(),
        }
    }

    pub(crate) fn failing(error: &str) -> Self {
        Self {
            summary: Err(error.to_string()),
            tag_reply: String::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeAi {
    async fn generate(&self, request: GenerateRequest) -> AiResult<String> {
        let prompt = request.turns.first().map(|t| t.text.as_str()).unwrap_or_default();
        if prompt.starts_with("CLASSIFY") {
            return Ok(self.tag_reply.clone());
        }
        self.summary
            .clone()
            .map_err(|last| AiError::AllKeysFailed { attempts: 1, last })
    }
}

pub(crate) fn context(
    dir: &Path,
    captions: FakeCaptions,
    transcriber: Arc<FakeTranscriber>,
    ai: FakeAi,
) -> ProcessingContext {
    let prompts = dir.join("prompts.json");
    std::fs::write(
        &prompts,
        r#"{"summary_prompt": "SUMMARY {title}\n{transcript}", "classify_prompt": "CLASSIFY {title} {tags}"}"#,
    )
    .unwrap();

    let config = WorkerConfig {
        data_dir: dir.join("data"),
        work_dir: dir.join("work"),
        prompts_file: prompts,
    };
    ProcessingContext::with_backends(config, Arc::new(captions), transcriber, Arc::new(ai))
}

/// Register a queued task plus its placeholder, as the submit endpoint does.
pub(crate) async fn submit(ctx: &ProcessingContext, id: &str, url: &str) -> ProcessVideoJob {
    let task = Task::queued(ProjectId::from_string(id), url);
    ctx.projects.save(Project::placeholder(&task)).await.unwrap();
    ctx.registry.insert(task.clone()).await;
    ProcessVideoJob::new(task.id, url)
}

pub(crate) fn official_captions() -> Captions {
    Captions {
        source: SubtitleSource::Official,
        language: "en".to_string(),
        segments: vec![Segment::new(0.0, 1.5, "hello"), Segment::new(65.0, 66.0, "world")],
    }
}
