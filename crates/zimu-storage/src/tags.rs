//! Tag list used for classification.

use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};
use crate::json_file::{read_json, write_json_atomic, Loaded};

/// Tags offered when no tag file exists (politics, tech, life).
pub const DEFAULT_TAGS: [&str; 3] = ["政治", "科技", "生活"];

/// JSON-file tag store.
#[derive(Debug)]
pub struct TagStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Current tags; missing, empty or invalid files yield the defaults.
    pub async fn list(&self) -> StorageResult<Vec<String>> {
        let tags = match read_json::<Vec<String>>(&self.path).await? {
            Loaded::Parsed(tags) if !tags.is_empty() => tags,
            Loaded::Corrupt(e) => {
                warn!(path = %self.path.display(), error = %e, "Tag file unreadable, using defaults");
                default_tags()
            }
            _ => default_tags(),
        };
        Ok(tags)
    }

    /// Append a tag and return the new list.
    pub async fn add(&self, name: &str) -> StorageResult<Vec<String>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::invalid_input("Tag name cannot be empty"));
        }

        let _guard = self.write_lock.lock().await;
        let mut tags = self.list().await?;
        if tags.iter().any(|t| t == name) {
            return Err(StorageError::invalid_input(format!("Tag already exists: {}", name)));
        }

        tags.push(name.to_string());
        write_json_atomic(&self.path, &tags).await?;
        info!(tag = %name, "Tag added");
        Ok(tags)
    }

    /// Remove a tag and return the new list.
    pub async fn remove(&self, name: &str) -> StorageResult<Vec<String>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::invalid_input("Tag name cannot be empty"));
        }

        let _guard = self.write_lock.lock().await;
        let mut tags = self.list().await?;
        let Some(pos) = tags.iter().position(|t| t == name) else {
            return Err(StorageError::not_found(format!("Tag not found: {}", name)));
        };

        tags.remove(pos);
        write_json_atomic(&self.path, &tags).await?;
        info!(tag = %name, "Tag removed");
        Ok(tags)
    }
}

fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}
