//! Project store backed by a single JSON object keyed by project id.
//!
//! Every mutation is a full read-modify-write of the file. Cycles are
//! serialized by an internal mutex so a chat append and a worker update
//! cannot interleave and lose each other's write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{info, warn};
use zimu_models::{Project, ProjectId, TaskStatus};

use crate::error::StorageResult;
use crate::json_file::{corrupt, read_json, write_json_atomic, Loaded};

/// All projects, keyed by id.
pub type ProjectMap = BTreeMap<ProjectId, Project>;

/// Message stored on projects whose task died with the previous process.
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted by a restart. Please resubmit the video.";

/// JSON-file project store.
#[derive(Debug)]
pub struct ProjectStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every project. An unreadable file reads as empty.
    pub async fn load(&self) -> StorageResult<ProjectMap> {
        match read_json::<RawMap>(&self.path).await? {
            Loaded::Parsed(raw) => Ok(decode(raw).projects),
            Loaded::Missing => Ok(ProjectMap::new()),
            Loaded::Corrupt(e) => {
                warn!(path = %self.path.display(), error = %e, "Project store unreadable, treating as empty");
                Ok(ProjectMap::new())
            }
        }
    }

    pub async fn get(&self, id: &ProjectId) -> StorageResult<Option<Project>> {
        Ok(self.load().await?.remove(id))
    }

    /// Run `f` against the full map and write the result back.
    ///
    /// A file that exists but does not parse is never overwritten. Entries
    /// that do not decode as a project are hidden from `f` and written back
    /// untouched.
    pub async fn modify<F, R>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&mut ProjectMap) -> R,
    {
        let _guard = self.write_lock.lock().await;

        let Decoded { mut projects, mut malformed } = match read_json::<RawMap>(&self.path).await? {
            Loaded::Parsed(raw) => decode(raw),
            Loaded::Missing => Decoded::default(),
            Loaded::Corrupt(e) => return Err(corrupt(&self.path, e)),
        };

        let result = f(&mut projects);

        for (id, project) in &projects {
            malformed.insert(id.as_str().to_string(), serde_json::to_value(project)?);
        }
        write_json_atomic(&self.path, &malformed).await?;
        Ok(result)
    }

    /// Insert or replace a project.
    pub async fn save(&self, project: Project) -> StorageResult<()> {
        self.modify(|map| {
            map.insert(project.id.clone(), project);
        })
        .await
    }

    /// Apply `f` to one project. Returns the updated record, or `None` when
    /// the id is unknown (the file is still rewritten unchanged).
    pub async fn update<F>(&self, id: &ProjectId, f: F) -> StorageResult<Option<Project>>
    where
        F: FnOnce(&mut Project),
    {
        self.modify(|map| {
            map.get_mut(id).map(|project| {
                f(project);
                project.clone()
            })
        })
        .await
    }

    /// Remove a project; returns whether it existed.
    pub async fn delete(&self, id: &ProjectId) -> StorageResult<bool> {
        self.modify(|map| map.remove(id).is_some()).await
    }

    /// Mark projects left in a running state by a previous process as failed.
    ///
    /// Their in-memory task no longer exists, so nothing would ever finish
    /// them.
    pub async fn mark_interrupted(&self) -> StorageResult<usize> {
        let count = self
            .modify(|map| {
                let mut count = 0;
                for project in map.values_mut().filter(|p| p.status.is_running()) {
                    project.status = TaskStatus::Error;
                    project.message = INTERRUPTED_MESSAGE.to_string();
                    count += 1;
                }
                count
            })
            .await?;

        if count > 0 {
            info!(count, "Marked interrupted projects as failed");
        }
        Ok(count)
    }
}

/// The file as written: entries are decoded one by one so a single bad
/// record cannot hide the rest.
type RawMap = BTreeMap<String, serde_json::Value>;

#[derive(Default)]
struct Decoded {
    projects: ProjectMap,
    malformed: RawMap,
}

fn decode(raw: RawMap) -> Decoded {
    let mut decoded = Decoded::default();
    for (key, value) in raw {
        match serde_json::from_value::<Project>(value.clone()) {
            Ok(mut project) => {
                let id = ProjectId::from_string(key);
                project.id = id.clone();
                decoded.projects.insert(id, project);
            }
            Err(e) => {
                warn!(project_id = %key, error = %e, "Skipping unreadable project entry");
                decoded.malformed.insert(key, value);
            }
        }
    }
    decoded
}
