//! In-memory registry of live task records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;
use zimu_models::{ProjectId, Task};

/// How long a finished task stays pollable before it is dropped.
pub const FINISHED_TASK_RETENTION: Duration = Duration::from_secs(30 * 60);

/// Result of claiming a URL for processing.
#[derive(Debug, Clone)]
pub enum Claim {
    /// A running task already covers this URL
    Existing(ProjectId),
    /// A new task was registered
    Created(Task),
}

#[derive(Debug)]
struct Entry {
    task: Task,
    /// Set when the task first reaches a terminal status
    finished_at: Option<Instant>,
}

impl Entry {
    fn new(task: Task) -> Self {
        let mut entry = Self {
            task,
            finished_at: None,
        };
        entry.touch();
        entry
    }

    fn touch(&mut self) {
        if !self.task.is_running() {
            self.finished_at.get_or_insert_with(Instant::now);
        } else {
            self.finished_at = None;
        }
    }
}

/// Shared map of task id to task record.
///
/// Records are discarded on restart; the project store is the durable copy.
/// Finished records are evicted once they are older than the retention
/// window, on the next submission.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<ProjectId, Entry>>>,
    retention: Duration,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::with_retention(FINISHED_TASK_RETENTION)
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub async fn get(&self, id: &ProjectId) -> Option<Task> {
        self.tasks.read().await.get(id).map(|e| e.task.clone())
    }

    /// Clone of every task record.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.values().map(|e| e.task.clone()).collect()
    }

    pub async fn insert(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), Entry::new(task));
    }

    pub async fn remove(&self, id: &ProjectId) -> Option<Task> {
        self.tasks.write().await.remove(id).map(|e| e.task)
    }

    /// Mutate a task in place; `None` if it is not registered.
    pub async fn update<F, R>(&self, id: &ProjectId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let mut tasks = self.tasks.write().await;
        let entry = tasks.get_mut(id)?;
        let result = f(&mut entry.task);
        entry.touch();
        Some(result)
    }

    /// Register a new task for `video_url` unless a running one exists.
    ///
    /// The scan and the insert happen under one write lock, so two
    /// concurrent submissions of the same URL always resolve to one task.
    pub async fn claim<F>(&self, video_url: &str, make_task: F) -> Claim
    where
        F: FnOnce() -> Task,
    {
        let mut tasks = self.tasks.write().await;
        evict_expired(&mut tasks, self.retention);

        if let Some(existing) = tasks
            .values()
            .find(|e| e.task.video_url == video_url && e.task.is_running())
        {
            return Claim::Existing(existing.task.id.clone());
        }

        let task = make_task();
        tasks.insert(task.id.clone(), Entry::new(task.clone()));
        Claim::Created(task)
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn evict_expired(tasks: &mut HashMap<ProjectId, Entry>, retention: Duration) {
    let before = tasks.len();
    tasks.retain(|_, e| e.finished_at.map_or(true, |at| at.elapsed() < retention));
    let evicted = before - tasks.len();
    if evicted > 0 {
        debug!(evicted, "Evicted finished tasks");
    }
}
