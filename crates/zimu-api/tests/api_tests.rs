//! Router-level API tests against fake backends.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zimu_ai::{AiResult, GenerateRequest, TextGenerator};
use zimu_api::{create_router, ApiConfig, AppState};
use zimu_media::{CaptionProbe, CaptionProvider, ImageFetcher, MediaConfig, MediaResult, TranscribeProgress, Transcriber};
use zimu_models::{ChatMessage, Project, ProjectId, Segment, SessionId, Task, TaskStatus, VideoMeta};
use zimu_queue::{JobQueue, JobReceiver, QueueConfig};
use zimu_worker::{ProcessingContext, WorkerConfig};

struct NoCaptions;

#[async_trait]
impl CaptionProvider for NoCaptions {
    async fn probe(&self, _url: &str) -> MediaResult<CaptionProbe> {
        Ok(CaptionProbe {
            meta: VideoMeta::unknown(),
            captions: None,
        })
    }
}

struct SilentTranscriber;

#[async_trait]
impl Transcriber for SilentTranscriber {
    async fn transcribe(
        &self,
        _url: &str,
        _work_stem: &Path,
        _progress: mpsc::UnboundedSender<TranscribeProgress>,
    ) -> MediaResult<Vec<Segment>> {
        Ok(Vec::new())
    }
}

/// Answers classify prompts with a quoted tag and echoes everything else.
struct EchoAi;

#[async_trait]
impl TextGenerator for EchoAi {
    async fn generate(&self, request: GenerateRequest) -> AiResult<String> {
        let last = request.turns.last().map(|t| t.text.clone()).unwrap_or_default();
        if last.starts_with("CLASSIFY") {
            Ok("\"科技\"".to_string())
        } else {
            Ok(format!("echo: {}", last))
        }
    }
}

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
    _receiver: JobReceiver,
}

fn test_app_with_capacity(capacity: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let prompts_file = dir.path().join("prompts.json");
    std::fs::write(
        &prompts_file,
        json!({
            "_comment": "test templates",
            "classify_prompt": "CLASSIFY {title} {tags}",
            "chat_system_prompt": "CTX {transcript}"
        })
        .to_string(),
    )
    .unwrap();

    let worker_config = WorkerConfig {
        data_dir: dir.path().join("data"),
        work_dir: dir.path().join("work"),
        prompts_file,
    };
    let ctx = Arc::new(ProcessingContext::with_backends(
        worker_config,
        Arc::new(NoCaptions),
        Arc::new(SilentTranscriber),
        Arc::new(EchoAi),
    ));

    let (queue, receiver) = JobQueue::new(QueueConfig { capacity });
    let config = ApiConfig {
        static_dir: dir.path().join("static"),
        ..Default::default()
    };
    let fetcher = ImageFetcher::new(&MediaConfig::default()).unwrap();
    let state = AppState::new(config, ctx, queue, fetcher);
    let router = create_router(state.clone(), None);

    TestApp {
        _dir: dir,
        state,
        router,
        _receiver: receiver,
    }
}

fn test_app() -> TestApp {
    test_app_with_capacity(16)
}

impl TestApp {
    async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.raw(method, uri, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn save_project(&self, project: Project) {
        self.state.ctx.projects.save(project).await.unwrap();
    }
}

fn done_project(id: &str, title: &str, created_at: &str) -> Project {
    Project {
        id: ProjectId::from_string(id),
        meta: VideoMeta {
            title: title.to_string(),
            ..Default::default()
        },
        status: TaskStatus::Done,
        created_at: created_at.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let response = app.raw(Method::GET, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let (status, body) = app.json(Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("X-Request-ID", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_process_rejects_empty_and_urlless_input() {
    let app = test_app();

    let (status, body) = app.json(Method::POST, "/api/process", Some(json!({"url": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app
        .json(Method::POST, "/api/process", Some(json!({"url": "no link in here"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.state.queue.is_empty());
}

#[tokio::test]
async fn test_duplicate_submission_reuses_running_task() {
    let app = test_app();
    let shared = "【Bilibili】 look at this https://bilibili.com/video/BV1xx411c7mD";

    let (status, first) = app.json(Method::POST, "/api/process", Some(json!({"url": shared}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(first.get("reused").is_none());
    let task_id = first["task_id"].as_str().unwrap().to_string();
    assert_eq!(task_id.len(), 8);

    let (status, second) = app
        .json(
            Method::POST,
            "/api/process",
            Some(json!({"url": "https://m.bilibili.com/video/BV1xx411c7mD"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["task_id"], task_id.as_str());
    assert_eq!(second["reused"], true);
    assert_eq!(app.state.queue.len(), 1);

    let (status, task) = app.json(Method::GET, &format!("/api/status/{}", task_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "queued");
    assert_eq!(task["video_url"], "https://www.bilibili.com/video/BV1xx411c7mD");

    let (_, projects) = app.json(Method::GET, "/api/projects", None).await;
    let rows = projects.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Bilibili BV1xx411c7mD");
    assert_eq!(rows[0]["status"], "queued");
}

#[tokio::test]
async fn test_full_queue_returns_unavailable_and_rolls_back() {
    let app = test_app_with_capacity(1);

    let (status, _) = app
        .json(Method::POST, "/api/process", Some(json!({"url": "https://youtu.be/first"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::POST, "/api/process", Some(json!({"url": "https://youtu.be/second"})))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(app.state.ctx.registry.len().await, 1);
    assert_eq!(app.state.ctx.projects.load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_status_is_not_found() {
    let app = test_app();
    let (status, body) = app.json(Method::GET, "/api/status/deadbeef", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn test_projects_sorted_newest_first() {
    let app = test_app();
    app.save_project(done_project("aaaa0001", "Older", "2024-01-01 10:00:00")).await;
    app.save_project(done_project("aaaa0002", "Newer", "2024-03-01 10:00:00")).await;
    app.save_project(done_project("aaaa0003", "", "2024-02-01 10:00:00")).await;

    let (status, body) = app.json(Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Newer", "Untitled project", "Older"]);
    assert!(body[0].get("transcript").is_none());

    let (status, _) = app.json(Method::GET, "/api/projects/missing1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_task_without_stored_project() {
    let app = test_app();
    let mut task = Task::queued(ProjectId::from_string("11ve0000"), "https://youtu.be/live");
    task.status = TaskStatus::Transcribing;
    task.meta.title = "Live talk".to_string();
    task.transcribe_percent = 30.0;
    app.state.ctx.registry.insert(task).await;

    let (status, body) = app.json(Method::GET, "/api/projects/11ve0000", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "11ve0000");
    assert_eq!(body["title"], "Live talk");
    assert_eq!(body["status"], "transcribing");
    assert_eq!(body["transcribe_percent"], 30.0);
    assert_eq!(body["video_url"], "https://youtu.be/live");

    let (_, rows) = app.json(Method::GET, "/api/projects", None).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["status"], "transcribing");
}

#[tokio::test]
async fn test_project_list_survives_malformed_entries() {
    let app = test_app();
    let file = app.state.ctx.projects.path().to_path_buf();
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(
        &file,
        json!({
            "aaaa0001": {"title": "Fine", "status": "done", "created_at": "2024-02-01 10:00:00"},
            "aaaa0002": {
                "title": "Legacy chat",
                "status": "done",
                "created_at": "2024-01-01 10:00:00",
                "chat_history": ["用户：hi", {"role": "system", "content": "x"}]
            },
            "aaaa0003": ["not", "a", "project"]
        })
        .to_string(),
    )
    .unwrap();

    let (status, body) = app.json(Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Fine", "Legacy chat"]);

    let (status, _) = app
        .json(Method::POST, "/api/process", Some(json!({"url": "https://youtu.be/fresh"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(Method::GET, "/api/projects", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_patch_project() {
    let app = test_app();
    app.save_project(done_project("abcd1234", "Original", "2024-01-01 10:00:00")).await;

    let (status, body) = app
        .json(
            Method::PATCH,
            "/api/projects/abcd1234",
            Some(json!({"title": "   ", "tag": "  科技 ", "favorite": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "title": "Original", "tag": "科技", "favorite": true}));

    let (_, body) = app
        .json(Method::PATCH, "/api/projects/abcd1234", Some(json!({"title": "Renamed"})))
        .await;
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["favorite"], true);

    let (status, _) = app
        .json(Method::PATCH, "/api/projects/nope0000", Some(json!({"tag": "x"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_removes_project_and_chat_session() {
    let app = test_app();
    let id = ProjectId::from_string("abcd1234");
    app.save_project(done_project(id.as_str(), "Talk", "2024-01-01 10:00:00")).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/chat",
            Some(json!({
                "session_id": "session_abcd1234",
                "message": "What is it about?",
                "transcript": "[00:01] hello"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "echo: What is it about?");
    assert!(app.state.chat.contains(&id.session_id()).await);

    let stored = app.state.ctx.projects.get(&id).await.unwrap().unwrap();
    assert_eq!(
        stored.chat_history,
        vec![
            ChatMessage::user("What is it about?"),
            ChatMessage::assistant("echo: What is it about?")
        ]
    );

    let (status, body) = app.json(Method::DELETE, "/api/projects/abcd1234", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(!app.state.chat.contains(&SessionId::from_string("session_abcd1234")).await);
    assert!(app.state.ctx.projects.get(&id).await.unwrap().is_none());

    let (status, _) = app.json(Method::DELETE, "/api/projects/abcd1234", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_rejects_blank_message() {
    let app = test_app();
    let (status, body) = app
        .json(
            Method::POST,
            "/api/chat",
            Some(json!({"session_id": "scratch", "message": " ", "transcript": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_tag_crud() {
    let app = test_app();

    let (status, body) = app.json(Method::GET, "/api/tags", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["政治", "科技", "生活"]));

    let (status, _) = app.json(Method::POST, "/api/tags", Some(json!({"name": "科技"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.json(Method::POST, "/api/tags", Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.json(Method::POST, "/api/tags", Some(json!({"name": " 游戏 "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["tags"], json!(["政治", "科技", "生活", "游戏"]));

    let (status, _) = app.json(Method::DELETE, "/api/tags", Some(json!({"name": "音乐"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.json(Method::DELETE, "/api/tags", Some(json!({"name": "政治"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!(["科技", "生活", "游戏"]));
}

#[tokio::test]
async fn test_classify_all_skips_ineligible_projects() {
    let app = test_app();
    app.save_project(done_project("aaaa0001", "Rust talk", "2024-01-01 10:00:00")).await;
    app.save_project(done_project("aaaa0002", "Untitled project", "2024-01-01 10:00:00")).await;
    let mut tagged = done_project("aaaa0003", "Tagged talk", "2024-01-01 10:00:00");
    tagged.tag = "生活".to_string();
    app.save_project(tagged).await;
    let mut running = done_project("aaaa0004", "Running talk", "2024-01-01 10:00:00");
    running.status = TaskStatus::Transcribing;
    app.save_project(running).await;

    let (status, body) = app.json(Method::POST, "/api/classify-all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "classified": 1, "failed": 0}));

    let projects = app.state.ctx.projects.load().await.unwrap();
    assert_eq!(projects[&ProjectId::from_string("aaaa0001")].tag, "科技");
    assert_eq!(projects[&ProjectId::from_string("aaaa0003")].tag, "生活");
    assert!(projects[&ProjectId::from_string("aaaa0004")].tag.is_empty());
}

#[tokio::test]
async fn test_thumbnail_served_from_cache() {
    let app = test_app();
    let url = "https://i0.hdslb.com/bfs/archive/cover.png";
    let mut project = done_project("abcd1234", "Talk", "2024-01-01 10:00:00");
    project.meta.thumbnail = url.to_string();
    app.save_project(project).await;
    app.state.images.store(url, "png", &[137, 80, 78, 71]).await.unwrap();

    let response = app.raw(Method::GET, "/api/projects/abcd1234/thumbnail", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=86400");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], &[137u8, 80, 78, 71]);

    let (status, _) = app.json(Method::GET, "/api/projects/abcd1234/avatar", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thumbnail_fetch_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cover.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = test_app();
    let mut project = done_project("abcd1234", "Talk", "2024-01-01 10:00:00");
    project.meta.thumbnail = format!("{}/cover.jpg", server.uri());
    project.video_url = "https://youtu.be/abc".to_string();
    app.save_project(project).await;

    let (status, body) = app.json(Method::GET, "/api/projects/abcd1234/thumbnail", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().starts_with("Failed to fetch image"));
    assert!(app
        .state
        .images
        .lookup(&format!("{}/cover.jpg", server.uri()))
        .await
        .is_none());
}

#[tokio::test]
async fn test_favicon() {
    let app = test_app();
    let response = app.raw(Method::GET, "/favicon.ico", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=604800");
}
