//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "zimu_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "zimu_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "zimu_http_requests_in_flight";

    // Queue metrics
    pub const QUEUE_LENGTH: &str = "zimu_queue_length";
    pub const JOBS_ENQUEUED_TOTAL: &str = "zimu_jobs_enqueued_total";
    pub const JOBS_REUSED_TOTAL: &str = "zimu_jobs_reused_total";

    // Image proxy metrics
    pub const IMAGE_CACHE_TOTAL: &str = "zimu_image_cache_total";
}

static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/projects/[^/]+").expect("valid regex"));
static STATUS_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/status/[^/]+").expect("valid regex"));

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update queue length gauge.
pub fn set_queue_length(length: usize) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Record job enqueued.
pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

/// Record a submission answered with an already running task.
pub fn record_job_reused() {
    counter!(names::JOBS_REUSED_TOTAL).increment(1);
}

/// Record an image proxy lookup (`hit`, `miss` or `error`).
pub fn record_image_cache(result: &'static str) {
    counter!(names::IMAGE_CACHE_TOTAL, "result" => result).increment(1);
}

/// Sanitize path for metrics labels (remove IDs).
fn sanitize_path(path: &str) -> String {
    let path = PROJECT_ID.replace_all(path, "/projects/:id");
    let path = STATUS_ID.replace_all(&path, "/status/:task_id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
