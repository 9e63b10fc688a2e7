//! Gemini `generateContent` client with ordered API-key fallback.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::GeminiConfig;
use crate::error::{AiError, AiResult};

const KEY_FALLBACKS_TOTAL: &str = "zimu_ai_key_fallbacks_total";

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// One generation call: optional system context plus ordered turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub turns: Vec<Turn>,
}

impl GenerateRequest {
    /// Single user prompt without system context.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system: None,
            turns: vec![Turn::user(text)],
        }
    }
}

/// Text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> AiResult<String>;

    async fn generate_text(&self, prompt: &str) -> AiResult<String> {
        self.generate(GenerateRequest::prompt(prompt)).await
    }
}

/// Coarse failure category, used for fallback logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Quota,
    Auth,
    Network,
    Server,
    Unknown,
}

impl FailureKind {
    /// Classify by substrings of the lowercased error text.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

        if has(&["quota", "resource_exhausted", "429", "rate limit", "too many requests"]) {
            Self::Quota
        } else if has(&["401", "403", "permission", "invalid", "api_key_invalid", "unauthorized"]) {
            Self::Auth
        } else if has(&["timeout", "deadline", "timed out", "connection"]) {
            Self::Network
        } else if has(&["500", "502", "503", "504", "internal", "unavailable"]) {
            Self::Server
        } else {
            Self::Unknown
        }
    }

    pub fn of(err: &AiError) -> Self {
        match err {
            AiError::Http(e) if e.is_timeout() || e.is_connect() => Self::Network,
            other => Self::classify(&other.to_string()),
        }
    }

    /// Whether this kind warrants switching keys.
    pub fn is_switchable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quota => "quota",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }
}

/// `abcd1234...wxyz`; short keys are fully hidden.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: TurnRole,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GeminiRequest<'a> {
    fn from_request(request: &'a GenerateRequest) -> Self {
        Self {
            system_instruction: request
                .system
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|text| SystemInstruction { parts: [Part { text }] }),
            contents: request
                .turns
                .iter()
                .map(|t| Content {
                    role: t.role,
                    parts: [Part { text: &t.text }],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini API client.
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> AiResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        if config.api_keys.is_empty() {
            warn!("No Gemini API key configured; AI calls will fail");
        } else {
            info!(
                keys = config.api_keys.len(),
                model = %config.model,
                "Gemini client configured"
            );
        }
        Ok(Self { config, client })
    }

    pub fn key_count(&self) -> usize {
        self.config.api_keys.len()
    }

    fn endpoint(&self) -> String {
        let model = self.config.model.trim_start_matches("models/");
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn call_with_key(&self, key: &str, body: &GeminiRequest<'_>) -> AiResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::api(status.as_u16(), text));
        }

        let parsed: GeminiResponse = response.json().await?;
        parsed.text().ok_or(AiError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> AiResult<String> {
        let keys = &self.config.api_keys;
        if keys.is_empty() {
            return Err(AiError::NoApiKeys);
        }

        let body = GeminiRequest::from_request(&request);
        let mut last_error = None;

        for (idx, key) in keys.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.config.fallback_delay).await;
            }

            match self.call_with_key(key, &body).await {
                Ok(text) => {
                    debug!(key = %mask_key(key), chars = text.len(), "Gemini call succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    let kind = FailureKind::of(&e);
                    if idx + 1 < keys.len() {
                        warn!(
                            key_index = idx + 1,
                            key = %mask_key(key),
                            kind = kind.as_str(),
                            switchable = kind.is_switchable(),
                            error = %e,
                            "Gemini key failed, trying next key"
                        );
                        metrics::counter!(KEY_FALLBACKS_TOTAL, "kind" => kind.as_str()).increment(1);
                    } else {
                        error!(
                            keys = keys.len(),
                            key = %mask_key(key),
                            kind = kind.as_str(),
                            error = %e,
                            "All Gemini keys failed"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AiError::AllKeysFailed {
            attempts: keys.len(),
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, keys: &[&str]) -> GeminiConfig {
        GeminiConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            model: "models/test-model".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            fallback_delay: Duration::from_millis(1),
        }
    }

    fn reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        }))
    }

    #[test]
    fn test_classify_failures() {
        assert_eq!(FailureKind::classify("429 RESOURCE_EXHAUSTED"), FailureKind::Quota);
        assert_eq!(FailureKind::classify("API_KEY_INVALID"), FailureKind::Auth);
        assert_eq!(FailureKind::classify("Deadline exceeded"), FailureKind::Network);
        assert_eq!(FailureKind::classify("503 Service Unavailable"), FailureKind::Server);
        assert_eq!(FailureKind::classify("something odd"), FailureKind::Unknown);
        assert!(!FailureKind::Unknown.is_switchable());
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("AIzaSyABCDEFGHIJKLwxyz"), "AIzaSyAB...wxyz");
        assert_eq!(mask_key("short"), "***");
    }

    #[tokio::test]
    async fn test_falls_back_to_next_key() {
        let server = MockServer::start().await;
        let endpoint = "/models/test-model:generateContent";

        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(header("x-goog-api-key", "key-number-one-aaaa"))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(header("x-goog-api-key", "key-number-two-bbbb"))
            .respond_with(reply("## Summary"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(header("x-goog-api-key", "key-number-three-cc"))
            .respond_with(reply("unused"))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(
            &server,
            &["key-number-one-aaaa", "key-number-two-bbbb", "key-number-three-cc"],
        ))
        .unwrap();

        let text = client.generate_text("summarize").await.unwrap();
        assert_eq!(text, "## Summary");
    }

    #[tokio::test]
    async fn test_all_keys_failed_reports_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "first-key-000000"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "second-key-11111"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let client =
            GeminiClient::new(config(&server, &["first-key-000000", "second-key-11111"])).unwrap();

        match client.generate_text("hi").await {
            Err(AiError::AllKeysFailed { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(last.contains("500"), "last error was {}", last);
            }
            other => panic!("expected AllKeysFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_keys_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("x"))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &[])).unwrap();
        assert!(matches!(client.generate_text("hi").await, Err(AiError::NoApiKeys)));
    }

    #[tokio::test]
    async fn test_request_carries_system_and_roles() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "context"}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "q1"}]},
                    {"role": "model", "parts": [{"text": "a1"}]},
                    {"role": "user", "parts": [{"text": "q2"}]}
                ]
            })))
            .respond_with(reply("a2"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &["only-key-123456"])).unwrap();
        let request = GenerateRequest {
            system: Some("context".to_string()),
            turns: vec![Turn::user("q1"), Turn::model("a1"), Turn::user("q2")],
        };
        assert_eq!(client.generate(request).await.unwrap(), "a2");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &["only-key-123456"])).unwrap();
        match client.generate_text("hi").await {
            Err(AiError::AllKeysFailed { last, .. }) => assert!(last.contains("empty")),
            other => panic!("expected AllKeysFailed, got {:?}", other),
        }
    }
}
