//! Video processing pipeline.
//!
//! Steps: normalize the URL, probe for captions, fall back to local
//! transcription, summarize, classify, persist. Every state change is written
//! to the live task record so `/api/status` polling sees it immediately.

use std::fmt::Display;

use tokio::sync::mpsc;
use tracing::error;
use zimu_media::{CaptionProbe, TranscribeProgress};
use zimu_models::{
    build_timestamped_transcript, normalize_url, now_timestamp, Project, ProjectId, Segment, SubtitleSource,
    Task, TaskStatus, VideoMeta, UNKNOWN_TITLE,
};
use zimu_queue::ProcessVideoJob;

use crate::classify::{classify_title, Classification};
use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

const CHECKING_MESSAGE: &str = "Checking for official subtitles...";
const WAITING_MESSAGE: &str = "Waiting for another transcription to finish...";
const DOWNLOADING_MESSAGE: &str = "Downloading audio...";
const TRANSCRIBING_MESSAGE: &str = "Transcribing speech with Whisper...";
const TRANSCRIBED_MESSAGE: &str = "Transcription complete!";
const SUMMARIZING_MESSAGE: &str = "Generating AI summary...";
const DONE_MESSAGE: &str = "Processing complete!";

/// Run the full pipeline for one job.
///
/// On failure the task is marked `error` and the message is mirrored onto
/// the stored placeholder before the error is returned.
pub async fn process_video(ctx: &ProcessingContext, job: &ProcessVideoJob) -> WorkerResult<()> {
    let logger = JobLogger::new(&job.task_id, "process_video");
    logger.log_start(&job.url);

    match run_pipeline(ctx, job, &logger).await {
        Ok(()) => {
            logger.log_completion("summary saved");
            Ok(())
        }
        Err(e) => {
            logger.log_error(&e.to_string());
            mark_failed(ctx, &job.task_id, &e).await;
            Err(e)
        }
    }
}

/// Set the task to `error` and copy its state onto the stored project.
pub async fn mark_failed(ctx: &ProcessingContext, task_id: &ProjectId, reason: impl Display) {
    let Some(task) = ctx
        .registry
        .update(task_id, |t| {
            t.fail(&reason);
            t.clone()
        })
        .await
    else {
        return;
    };

    if let Err(e) = ctx.projects.update(task_id, |p| p.merge_task(&task)).await {
        error!(task_id = %task_id, error = %e, "Failed to persist task failure");
    }
}

async fn update_task<F, R>(ctx: &ProcessingContext, task_id: &ProjectId, f: F) -> WorkerResult<R>
where
    F: FnOnce(&mut Task) -> R,
{
    ctx.registry
        .update(task_id, f)
        .await
        .ok_or_else(|| WorkerError::processing_failed(format!("task {} is no longer registered", task_id)))
}

async fn run_pipeline(ctx: &ProcessingContext, job: &ProcessVideoJob, logger: &JobLogger) -> WorkerResult<()> {
    let task_id = &job.task_id;

    let url = normalize_url(&job.url);
    update_task(ctx, task_id, |t| t.video_url = url.clone()).await?;

    update_task(ctx, task_id, |t| {
        t.set_status(TaskStatus::CheckingSubtitles, CHECKING_MESSAGE)
    })
    .await?;

    let probe = match ctx.captions.probe(&url).await {
        Ok(probe) => probe,
        Err(e) => {
            logger.log_warning(&format!("caption probe failed, continuing without captions: {}", e));
            CaptionProbe {
                meta: VideoMeta::unknown(),
                captions: None,
            }
        }
    };

    let mut meta = probe.meta;
    if meta.title.trim().is_empty() {
        meta.title = UNKNOWN_TITLE.to_string();
    }
    update_task(ctx, task_id, |t| t.apply_meta(meta.clone())).await?;

    let segments = match probe.captions {
        Some(captions) => {
            let label = match captions.source {
                SubtitleSource::Official => "official",
                _ => "auto-generated",
            };
            logger.log_progress(&format!(
                "using {} {} captions ({} segments)",
                label,
                captions.language,
                captions.segments.len()
            ));
            update_task(ctx, task_id, |t| {
                t.subtitle_source = Some(captions.source);
                t.message = format!("Found {} subtitles, no transcription needed!", label);
            })
            .await?;
            captions.segments
        }
        None => {
            update_task(ctx, task_id, |t| t.subtitle_source = Some(SubtitleSource::Whisper)).await?;
            let segments = transcribe(ctx, task_id, &url, logger).await?;
            update_task(ctx, task_id, |t| t.message = TRANSCRIBED_MESSAGE.to_string()).await?;
            segments
        }
    };

    let transcript = build_timestamped_transcript(&segments);
    let title = update_task(ctx, task_id, |t| {
        t.set_status(TaskStatus::Summarizing, SUMMARIZING_MESSAGE);
        t.segments = segments;
        t.transcript = transcript.clone();
        t.meta.title.clone()
    })
    .await?;

    let prompt = ctx
        .prompts
        .summary_prompt(&transcript, &title, &meta.uploader, &meta.upload_date)
        .await;
    let summary = ctx.ai.generate_text(&prompt).await?;
    update_task(ctx, task_id, |t| t.summary = summary).await?;

    // A tag the user picked while the job ran wins over classification
    let tag_edited = update_task(ctx, task_id, |t| t.tag_edited).await?;
    let tag = if tag_edited {
        None
    } else {
        Some(pick_tag(ctx, &title, logger).await)
    };

    let task = update_task(ctx, task_id, |t| {
        if let Some(tag) = tag.filter(|_| !t.tag_edited) {
            t.tag = tag;
        }
        t.set_status(TaskStatus::Done, DONE_MESSAGE);
        t.clone()
    })
    .await?;

    ctx.projects
        .modify(|map| {
            let favorite = map.get(task_id).map(|p| p.favorite).unwrap_or(false);
            let mut project = Project::from_task(&task);
            project.favorite = favorite;
            project.created_at = now_timestamp();
            map.insert(task_id.clone(), project);
        })
        .await?;

    Ok(())
}

/// Classification problems never fail the job.
async fn pick_tag(ctx: &ProcessingContext, title: &str, logger: &JobLogger) -> String {
    let tags = match ctx.tags.list().await {
        Ok(tags) => tags,
        Err(e) => {
            logger.log_warning(&format!("failed to load tags: {}", e));
            return String::new();
        }
    };

    match classify_title(ctx.ai.as_ref(), &ctx.prompts, title, &tags).await {
        Ok(Classification::Tagged(tag)) => tag,
        Ok(Classification::Rejected(reply)) => {
            logger.log_warning(&format!("classifier replied '{}', leaving untagged", reply));
            String::new()
        }
        Ok(Classification::Disabled) => String::new(),
        Err(e) => {
            logger.log_warning(&format!("classification failed: {}", e));
            String::new()
        }
    }
}

async fn transcribe(
    ctx: &ProcessingContext,
    task_id: &ProjectId,
    url: &str,
    logger: &JobLogger,
) -> WorkerResult<Vec<Segment>> {
    let _guard = match ctx.transcribe_lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            update_task(ctx, task_id, |t| t.message = WAITING_MESSAGE.to_string()).await?;
            logger.log_progress("waiting for transcription lock");
            ctx.transcribe_lock.lock().await
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = ctx.registry.clone();
    let forward_id = task_id.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            registry.update(&forward_id, |t| apply_progress(t, &event)).await;
        }
    });

    let stem = ctx.config.work_dir.join(format!("temp_{}", task_id));
    let result = ctx.transcriber.transcribe(url, &stem, tx).await;
    // The sender is gone once transcribe returns, so this drains and exits.
    let _ = forwarder.await;

    let segments = result?;
    logger.log_progress(&format!("transcribed {} segments", segments.len()));
    Ok(segments)
}

fn apply_progress(task: &mut Task, event: &TranscribeProgress) {
    match event {
        TranscribeProgress::Downloading => {
            task.set_status(TaskStatus::Downloading, DOWNLOADING_MESSAGE);
            task.progress.clear();
        }
        TranscribeProgress::Transcribing => {
            task.set_status(TaskStatus::Transcribing, TRANSCRIBING_MESSAGE);
            task.progress = "Loading model...".to_string();
        }
        TranscribeProgress::Progress { percent, current, total } => {
            let percent = percent.clamp(0.0, 100.0);
            task.transcribe_percent = (percent * 10.0).round() / 10.0;
            task.transcribe_current = *current;
            task.transcribe_total = *total;
            task.progress = format!("Transcribing {:.0}%", percent);
        }
        TranscribeProgress::Finished { segments } => {
            task.transcribe_percent = 100.0;
            task.progress = format!("Transcription finished, {} segments", segments);
        }
    }
}
