//! Job executor.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};
use zimu_queue::{JobReceiver, ProcessVideoJob};

use crate::context::ProcessingContext;
use crate::logging::JobLogger;
use crate::processor::{mark_failed, process_video};

const JOBS_COMPLETED_TOTAL: &str = "zimu_jobs_completed_total";
const JOBS_FAILED_TOTAL: &str = "zimu_jobs_failed_total";
const JOB_DURATION_SECONDS: &str = "zimu_job_duration_seconds";

/// Single consumer that runs queued jobs one after another.
pub struct JobExecutor {
    ctx: Arc<ProcessingContext>,
    receiver: JobReceiver,
}

impl JobExecutor {
    pub fn new(ctx: Arc<ProcessingContext>, receiver: JobReceiver) -> Self {
        Self { ctx, receiver }
    }

    /// Process jobs until `shutdown` flips to true or every producer is gone.
    ///
    /// The job in flight when shutdown arrives is finished first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting job executor");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                job = self.receiver.recv() => match job {
                    Some(job) => self.execute_job(job).await,
                    None => {
                        info!("Job queue closed, stopping executor");
                        break;
                    }
                },
            }
        }

        info!("Job executor stopped");
    }

    /// Run one job in its own task so a panic only fails that job.
    async fn execute_job(&self, job: ProcessVideoJob) {
        let task_id = job.task_id.clone();
        let started = Instant::now();
        let ctx = Arc::clone(&self.ctx);

        // Logs from the media and AI crates inherit the job fields
        let span = JobLogger::new(&task_id, "process_video").create_span();
        let handle = tokio::spawn(async move { process_video(&ctx, &job).await }.instrument(span));

        match handle.await {
            Ok(Ok(())) => {
                metrics::counter!(JOBS_COMPLETED_TOTAL).increment(1);
            }
            Ok(Err(e)) => {
                warn!(task_id = %task_id, error = %e, "Job failed");
                metrics::counter!(JOBS_FAILED_TOTAL, "reason" => "error").increment(1);
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    let payload = join_error.into_panic();
                    payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string())
                } else {
                    "job was cancelled".to_string()
                };
                error!(task_id = %task_id, reason = %reason, "Job panicked");
                mark_failed(&self.ctx, &task_id, format!("internal error: {}", reason)).await;
                metrics::counter!(JOBS_FAILED_TOTAL, "reason" => "panic").increment(1);
            }
        }

        metrics::histogram!(JOB_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zimu_models::TaskStatus;
    use zimu_queue::{JobQueue, QueueConfig};

    use crate::testing::{context, official_captions, submit, FakeAi, FakeCaptions, FakeTranscriber};

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(context(
            dir.path(),
            FakeCaptions::with(official_captions()).panicking_on("boom"),
            Arc::new(FakeTranscriber::default()),
            FakeAi::ok("summary", ""),
        ));

        let (queue, receiver) = JobQueue::new(QueueConfig::default());
        let bad = submit(&ctx, "bad00000", "https://youtu.be/boom").await;
        let good = submit(&ctx, "good0000", "https://youtu.be/fine").await;
        queue.enqueue(bad.clone()).unwrap();
        queue.enqueue(good.clone()).unwrap();
        drop(queue);

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        JobExecutor::new(Arc::clone(&ctx), receiver).run(shutdown_rx).await;

        let bad_task = ctx.registry.get(&bad.task_id).await.unwrap();
        assert_eq!(bad_task.status, TaskStatus::Error);
        assert!(bad_task.message.contains("probe exploded"));

        let good_task = ctx.registry.get(&good.task_id).await.unwrap();
        assert_eq!(good_task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_executor() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(context(
            dir.path(),
            FakeCaptions::none(),
            Arc::new(FakeTranscriber::default()),
            FakeAi::ok("summary", ""),
        ));

        let (_queue, receiver) = JobQueue::new(QueueConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(JobExecutor::new(ctx, receiver).run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
