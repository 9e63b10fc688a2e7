//! Multi-turn chat about a transcript.
//!
//! Sessions live in memory. Sessions named `session_<project_id>` are seeded
//! from, and written back to, the project's `chat_history`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};
use zimu_ai::{GenerateRequest, PromptStore, TextGenerator, Turn};
use zimu_models::{ChatMessage, ChatRole, SessionId};
use zimu_storage::ProjectStore;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
struct ChatSession {
    system: String,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    fn request(&self, message: &str) -> GenerateRequest {
        let mut turns: Vec<Turn> = self
            .history
            .iter()
            .map(|m| match m.role {
                ChatRole::User => Turn::user(m.content.clone()),
                ChatRole::Assistant => Turn::model(m.content.clone()),
            })
            .collect();
        turns.push(Turn::user(message));

        GenerateRequest {
            system: Some(self.system.clone()),
            turns,
        }
    }
}

/// Chat sessions keyed by session id.
#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<RwLock<HashMap<SessionId, ChatSession>>>,
    ai: Arc<dyn TextGenerator>,
    prompts: Arc<PromptStore>,
    projects: Arc<ProjectStore>,
}

impl ChatService {
    pub fn new(ai: Arc<dyn TextGenerator>, prompts: Arc<PromptStore>, projects: Arc<ProjectStore>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ai,
            prompts,
            projects,
        }
    }

    async fn session(&self, session_id: &SessionId, transcript: &str) -> ChatSession {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        let history = match session_id.project_id() {
            Some(project_id) => match self.projects.get(&project_id).await {
                Ok(project) => project.map(|p| p.chat_history).unwrap_or_default(),
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Failed to load chat history");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let session = ChatSession {
            system: self.prompts.chat_system_prompt(transcript).await,
            history,
        };

        self.sessions
            .write()
            .await
            .entry(session_id.clone())
            .or_insert(session)
            .clone()
    }

    /// Send `message` in `session_id` and return the model's reply.
    ///
    /// History is only extended when the model answers.
    pub async fn reply(&self, session_id: &SessionId, message: &str, transcript: &str) -> ApiResult<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::bad_request("Message cannot be empty"));
        }

        let session = self.session(session_id, transcript).await;
        let reply = self
            .ai
            .generate(session.request(message))
            .await
            .map_err(|e| ApiError::ai_failed(format!("AI reply failed: {}", e)))?;

        let history = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions.entry(session_id.clone()).or_insert(session);
            entry.history.push(ChatMessage::user(message));
            entry.history.push(ChatMessage::assistant(reply.clone()));
            entry.history.clone()
        };
        info!(session_id = %session_id, turns = history.len(), "Chat reply generated");

        if let Some(project_id) = session_id.project_id() {
            if let Err(e) = self
                .projects
                .update(&project_id, |p| p.chat_history = history)
                .await
            {
                error!(session_id = %session_id, error = %e, "Failed to persist chat history");
            }
        }

        Ok(reply)
    }

    /// Drop a session; returns whether it existed.
    pub async fn remove(&self, session_id: &SessionId) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}
