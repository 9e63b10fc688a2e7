//! Thumbnail and avatar download for the image proxy.

use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::Client;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// A downloaded image and the extension to cache it under.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub ext: &'static str,
}

/// Map a `Content-Type` to a cache extension.
pub fn ext_for_content_type(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("png") {
        "png"
    } else if ct.contains("webp") {
        "webp"
    } else if ct.contains("gif") {
        "gif"
    } else {
        "jpg"
    }
}

/// HTTP client for image hosts that check browser headers.
#[derive(Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new(config: &MediaConfig) -> MediaResult<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(config.image_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url`, sending the video page as `Referer` when known.
    pub async fn fetch(&self, url: &str, referer: Option<&str>) -> MediaResult<FetchedImage> {
        let mut request = self.client.get(url).header(ACCEPT, IMAGE_ACCEPT);
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::download_failed(format!("image host returned {}", status)));
        }

        let ext = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ext_for_content_type)
            .unwrap_or("jpg");
        let bytes = response.bytes().await?.to_vec();
        debug!(url = %url, bytes = bytes.len(), ext, "Fetched image");

        Ok(FetchedImage { bytes, ext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ext_for_content_type() {
        assert_eq!(ext_for_content_type("image/png"), "png");
        assert_eq!(ext_for_content_type("image/WEBP"), "webp");
        assert_eq!(ext_for_content_type("image/gif"), "gif");
        assert_eq!(ext_for_content_type("image/jpeg"), "jpg");
        assert_eq!(ext_for_content_type("application/octet-stream"), "jpg");
    }

    #[tokio::test]
    async fn test_fetch_sends_referer_and_reads_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.webp"))
            .and(header("referer", "https://www.bilibili.com/video/BV1xx"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/webp")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(&MediaConfig::default()).unwrap();
        let image = fetcher
            .fetch(
                &format!("{}/cover.webp", server.uri()),
                Some("https://www.bilibili.com/video/BV1xx"),
            )
            .await
            .unwrap();

        assert_eq!(image.ext, "webp");
        assert_eq!(image.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(&MediaConfig::default()).unwrap();
        let result = fetcher.fetch(&format!("{}/a.jpg", server.uri()), None).await;
        assert!(matches!(result, Err(MediaError::DownloadFailed { .. })));
    }
}
