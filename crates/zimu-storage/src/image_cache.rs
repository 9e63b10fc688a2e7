//! Content-hashed image cache for proxied thumbnails and avatars.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StorageResult;

/// Extensions checked on lookup, in order.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "png", "webp", "gif"];

/// A cached image file.
#[derive(Debug, Clone)]
pub struct CachedImage {
    pub path: PathBuf,
    pub ext: String,
}

impl CachedImage {
    /// Content type to serve the file with.
    pub fn content_type(&self) -> &'static str {
        content_type_for_ext(&self.ext)
    }
}

pub fn content_type_for_ext(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

/// Directory of `<sha256(url)>.<ext>` files.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for an image URL.
    pub fn key(url: &str) -> String {
        format!("{:x}", Sha256::digest(url.as_bytes()))
    }

    /// Find a cached copy of `url`.
    pub async fn lookup(&self, url: &str) -> Option<CachedImage> {
        let key = Self::key(url);
        for ext in IMAGE_EXTENSIONS {
            let path = self.dir.join(format!("{}.{}", key, ext));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some(CachedImage {
                    path,
                    ext: ext.to_string(),
                });
            }
        }
        None
    }

    /// Write a downloaded image into the cache.
    pub async fn store(&self, url: &str, ext: &str, bytes: &[u8]) -> StorageResult<CachedImage> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.{}", Self::key(url), ext));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Cached image");
        Ok(CachedImage {
            path,
            ext: ext.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_hex_sha256() {
        let key = ImageCache::key("https://i0.hdslb.com/a.jpg");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, ImageCache::key("https://i0.hdslb.com/a.jpg"));
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path().join("thumb_cache"));
        let url = "https://i.ytimg.com/vi/abc/hq.webp";

        assert!(cache.lookup(url).await.is_none());
        cache.store(url, "webp", b"RIFF").await.unwrap();

        let hit = cache.lookup(url).await.unwrap();
        assert_eq!(hit.ext, "webp");
        assert_eq!(hit.content_type(), "image/webp");
        assert_eq!(std::fs::read(hit.path).unwrap(), b"RIFF");
    }
}
