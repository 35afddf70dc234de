//! Image source resolution
//!
//! Some vision deployments cannot fetch arbitrary URLs themselves, so the
//! pipeline fetches the page image and inlines it as a data URL when it fits
//! under the byte ceiling. Every failure here is non-fatal: the caller falls
//! back to passing the original URL to the model.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, warn};
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// An image fetched and inlined as a data URL.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub content_type: String,
    pub data_url: String,
    pub byte_len: usize,
}

/// Fetch `raw_url` and inline the bytes if they fit within `max_bytes`.
///
/// Returns `None` on any failure: bad URL, network error, non-success
/// status, empty body, oversized payload, or an elapsed timeout (which
/// aborts the in-flight request). This function never errors.
pub async fn resolve_image_source(
    client: &reqwest::Client,
    raw_url: &str,
    max_bytes: u64,
) -> Option<InlineImage> {
    let parsed = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(err) => {
            debug!("image url unparseable ({err}); passing through");
            return None;
        }
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        debug!("image url scheme {} not fetchable; passing through", parsed.scheme());
        return None;
    }

    let response = match tokio::time::timeout(FETCH_TIMEOUT, client.get(parsed).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!("image fetch failed: {err}");
            return None;
        }
        Err(_) => {
            warn!("image fetch timed out after {}s", FETCH_TIMEOUT.as_secs());
            return None;
        }
    };

    if !response.status().is_success() {
        warn!("image fetch returned {}", response.status());
        return None;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let bytes = match tokio::time::timeout(FETCH_TIMEOUT, response.bytes()).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            warn!("image body read failed: {err}");
            return None;
        }
        Err(_) => {
            warn!("image body read timed out after {}s", FETCH_TIMEOUT.as_secs());
            return None;
        }
    };

    if bytes.is_empty() {
        warn!("image fetch returned an empty body");
        return None;
    }
    if bytes.len() as u64 > max_bytes {
        warn!(
            "image too large to inline ({} bytes, ceiling {}); passing through",
            bytes.len(),
            max_bytes
        );
        return None;
    }

    let data_url = format!("data:{};base64,{}", content_type, BASE64.encode(&bytes));
    debug!("inlined {} bytes as {}", bytes.len(), content_type);
    Some(InlineImage {
        content_type,
        data_url,
        byte_len: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_url_resolves_to_none() {
        let client = reqwest::Client::new();
        assert!(resolve_image_source(&client, "not a url", 1024).await.is_none());
    }

    #[tokio::test]
    async fn test_non_http_scheme_resolves_to_none() {
        let client = reqwest::Client::new();
        assert!(
            resolve_image_source(&client, "file:///etc/passwd", 1024)
                .await
                .is_none()
        );
        assert!(
            resolve_image_source(&client, "data:image/png;base64,AAAA", 1024)
                .await
                .is_none()
        );
    }
}
