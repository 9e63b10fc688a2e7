//! Video URL extraction and normalization.
//!
//! Users paste share text like `【Title】 https://b23.tv/abc` as often as bare
//! links, so the submit path first pulls a URL out of free text and then
//! brings it into a canonical form used for deduplication.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::project::UNTITLED_PROJECT;

static SCHEME_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"'\x{3000}]+"#).expect("valid scheme url regex")
});

static BARE_VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:b23\.tv|bilibili\.com|youtube\.com|youtu\.be)/[^\s<>"'\x{3000}]*"#)
        .expect("valid bare url regex")
});

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("valid scheme prefix regex"));

/// Hosts that are always served over https in their canonical form.
const CANONICAL_HOSTS: [&str; 4] = ["www.bilibili.com", "www.youtube.com", "youtu.be", "m.youtube.com"];

fn trim_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(['.', ',', ';', '!', '?'])
}

/// Pull the first video URL out of free-form text.
///
/// Returns `None` when nothing URL-like is present.
pub fn extract_first_url(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(m) = SCHEME_URL.find(text) {
        return Some(trim_trailing_punctuation(m.as_str()).to_string());
    }

    if let Some(m) = BARE_VIDEO_URL.find(text) {
        return Some(format!("https://{}", trim_trailing_punctuation(m.as_str())));
    }

    // A single dotted token is worth a try as a URL.
    if !text.contains(' ') && text.contains('.') {
        return Some(text.to_string());
    }

    None
}

/// Canonical form of a video URL.
///
/// Bilibili is rewritten to its desktop `www.` host (the bare domain answers
/// 403). Known hosts are forced to https; other URLs keep their scheme, or
/// get https when they have none. Applying it twice changes nothing.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let mut bare = SCHEME_PREFIX.replace(url, "").into_owned();

    if bare.starts_with("bilibili.com") {
        bare = format!("www.{}", bare);
    } else if let Some(rest) = bare.strip_prefix("m.bilibili.com") {
        bare = format!("www.bilibili.com{}", rest);
    }

    if CANONICAL_HOSTS.iter().any(|host| bare.starts_with(host)) {
        return format!("https://{}", bare);
    }

    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{}", bare)
    }
}

/// Placeholder title derived from the URL alone.
pub fn infer_title_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return UNTITLED_PROJECT.to_string();
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let mut segments = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    if host.contains("bilibili.com") {
        // Only `/video/<BV id>`; the id prefix is matched case-insensitively
        let bv = match (segments.next(), segments.next()) {
            (Some("video"), Some(id)) if id.to_ascii_uppercase().starts_with("BV") => Some(id),
            _ => None,
        };
        return match bv {
            Some(id) => format!("Bilibili {}", id),
            None => "Bilibili video".to_string(),
        };
    }

    if host.ends_with("b23.tv") {
        return match segments.next() {
            Some(code) => format!("Bilibili short link {}", code),
            None => "Bilibili short link".to_string(),
        };
    }

    if host.contains("youtube.com") {
        let id = parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
        return match id {
            Some(id) => format!("YouTube {}", id),
            None => "YouTube video".to_string(),
        };
    }

    if host.ends_with("youtu.be") {
        return match segments.next() {
            Some(id) => format!("YouTube {}", id),
            None => "YouTube video".to_string(),
        };
    }

    UNTITLED_PROJECT.to_string()
}
