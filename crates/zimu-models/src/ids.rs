//! Project and chat session identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of a generated project id.
pub const PROJECT_ID_LEN: usize = 8;

/// Prefix that ties a chat session to a persisted project.
pub const SESSION_PREFIX: &str = "session_";

/// Identifier shared by a task and the project it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Generate a new random 8-character id.
    pub fn new() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(PROJECT_ID_LEN);
        Self(id)
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat session id for this project.
    pub fn session_id(&self) -> SessionId {
        SessionId(format!("{}{}", SESSION_PREFIX, self.0))
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat session identifier.
///
/// Sessions created from the project page are named `session_<project_id>`
/// and have their history persisted on the project. Any other id is a
/// free-standing session that lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The project this session belongs to, if it follows the `session_` scheme.
    pub fn project_id(&self) -> Option<ProjectId> {
        self.0
            .strip_prefix(SESSION_PREFIX)
            .filter(|id| !id.is_empty())
            .map(ProjectId::from_string)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
