//! Inline SVG favicon.

use axum::http::header;
use axum::response::IntoResponse;

const FAVICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<rect width="100" height="100" rx="20" fill="#6366f1"/>
<text x="50" y="72" text-anchor="middle" font-size="60" fill="white">📺</text>
</svg>"##;

pub async fn favicon() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=604800"),
        ],
        FAVICON_SVG,
    )
}
