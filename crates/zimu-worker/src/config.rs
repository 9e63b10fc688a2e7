//! Worker configuration.

use std::path::PathBuf;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding projects.json, tags.json and the image cache
    pub data_dir: PathBuf,
    /// Scratch directory for downloaded audio
    pub work_dir: PathBuf,
    /// Prompt template file
    pub prompts_file: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            work_dir: std::env::temp_dir().join("zimu"),
            prompts_file: PathBuf::from("prompts.json"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            prompts_file: std::env::var("PROMPTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompts_file),
        }
    }

    pub fn projects_file(&self) -> PathBuf {
        self.data_dir.join("projects.json")
    }

    pub fn tags_file(&self) -> PathBuf {
        self.data_dir.join("tags.json")
    }

    pub fn image_cache_dir(&self) -> PathBuf {
        self.data_dir.join("thumb_cache")
    }
}
