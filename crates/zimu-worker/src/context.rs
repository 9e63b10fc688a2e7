//! Shared state for pipeline runs.

use std::sync::Arc;

use tokio::sync::Mutex;
use zimu_ai::{GeminiClient, GeminiConfig, PromptStore, TextGenerator};
use zimu_media::{CaptionProvider, MediaConfig, Transcriber, WhisperTranscriber, YtDlpCaptionProvider};
use zimu_queue::TaskRegistry;
use zimu_storage::{ProjectStore, TagStore};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Everything a job needs. The HTTP layer holds the same instance.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub registry: TaskRegistry,
    pub projects: Arc<ProjectStore>,
    pub tags: Arc<TagStore>,
    pub prompts: Arc<PromptStore>,
    pub captions: Arc<dyn CaptionProvider>,
    pub transcriber: Arc<dyn Transcriber>,
    pub ai: Arc<dyn TextGenerator>,
    /// The local recognizer runs one job at a time
    pub transcribe_lock: Mutex<()>,
}

impl ProcessingContext {
    /// Wire up the yt-dlp, whisper.cpp and Gemini implementations.
    pub fn new(config: WorkerConfig, media: MediaConfig, gemini: GeminiConfig) -> WorkerResult<Self> {
        let captions = YtDlpCaptionProvider::new(media.clone())?;
        let transcriber = WhisperTranscriber::new(media);
        let ai = GeminiClient::new(gemini)?;

        Ok(Self::with_backends(
            config,
            Arc::new(captions),
            Arc::new(transcriber),
            Arc::new(ai),
        ))
    }

    /// Build a context around the given backends, with stores under `config.data_dir`.
    pub fn with_backends(
        config: WorkerConfig,
        captions: Arc<dyn CaptionProvider>,
        transcriber: Arc<dyn Transcriber>,
        ai: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            registry: TaskRegistry::new(),
            projects: Arc::new(ProjectStore::new(config.projects_file())),
            tags: Arc::new(TagStore::new(config.tags_file())),
            prompts: Arc::new(PromptStore::new(config.prompts_file.clone())),
            captions,
            transcriber,
            ai,
            transcribe_lock: Mutex::new(()),
            config,
        }
    }
}
