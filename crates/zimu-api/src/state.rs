//! Application state.

use std::sync::Arc;

use zimu_media::ImageFetcher;
use zimu_queue::JobQueue;
use zimu_storage::ImageCache;
use zimu_worker::ProcessingContext;

use crate::config::ApiConfig;
use crate::services::ChatService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// Stores, registry and backends shared with the worker
    pub ctx: Arc<ProcessingContext>,
    pub queue: JobQueue,
    pub images: ImageCache,
    pub fetcher: ImageFetcher,
    pub chat: ChatService,
}

impl AppState {
    /// Create application state around an existing worker context.
    pub fn new(config: ApiConfig, ctx: Arc<ProcessingContext>, queue: JobQueue, fetcher: ImageFetcher) -> Self {
        let images = ImageCache::new(ctx.config.image_cache_dir());
        let chat = ChatService::new(
            Arc::clone(&ctx.ai),
            Arc::clone(&ctx.prompts),
            Arc::clone(&ctx.projects),
        );

        Self {
            config,
            ctx,
            queue,
            images,
            fetcher,
            chat,
        }
    }
}
