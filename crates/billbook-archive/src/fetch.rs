//! Evidence file retrieval.
//!
//! Evidence files live in remote object storage and are addressed by plain
//! URLs. Any failure to retrieve one is recoverable from the archive's
//! point of view: the assembler records the omission and moves on.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::config::ExportConfig;
use crate::retry::retry_send;

/// Why an evidence file could not be retrieved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The stored reference is not an absolute http(s) URL.
    #[error("invalid evidence url: {reason}")]
    InvalidUrl { reason: String },

    /// Connection, TLS, or timeout failure after all retries.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Storage answered with a non-success status.
    #[error("storage returned HTTP {status}")]
    Status { status: u16 },

    /// The body stream broke off mid-download.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The file exceeds the configured size cap.
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// The export was cancelled while the request was in flight.
    #[error("cancelled")]
    Cancelled,
}

/// Retrieves one evidence file by URL.
#[async_trait]
pub trait EvidenceFetcher: Send + Sync {
    /// Full contents of the file at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<T: EvidenceFetcher + ?Sized> EvidenceFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}

/// [`EvidenceFetcher`] over plain HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpEvidenceFetcher {
    http: reqwest::Client,
    max_file_bytes: u64,
}

impl HttpEvidenceFetcher {
    /// Build a fetcher with its own client, using the timeout and size cap
    /// from `config`.
    pub fn new(config: &ExportConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(concat!("billbook-archive/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, config.max_file_bytes))
    }

    /// Wrap an existing client.
    pub fn with_client(http: reqwest::Client, max_file_bytes: u64) -> Self {
        Self { http, max_file_bytes }
    }
}

#[async_trait]
impl EvidenceFetcher for HttpEvidenceFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl { reason: e.to_string() })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        let mut resp = retry_send(url, || self.http.get(parsed.clone()).send())
            .await
            .map_err(FetchError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let limit = self.max_file_bytes;
        if resp.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut body = Vec::with_capacity(resp.content_length().unwrap_or(0).min(limit) as usize);
        while let Some(chunk) = resp.chunk().await.map_err(FetchError::Body)? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_file_bytes: u64) -> HttpEvidenceFetcher {
        HttpEvidenceFetcher::with_client(reqwest::Client::new(), max_file_bytes)
    }

    #[tokio::test]
    async fn fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/slip.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .mount(&server)
            .await;

        let bytes = fetcher(1024)
            .fetch(&format!("{}/files/slip.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"jpeg-bytes");
    }

    #[tokio::test]
    async fn not_found_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher(1024)
            .fetch(&format!("{}/missing.pdf", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404 }));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let err = fetcher(16)
            .fetch(&format!("{}/big.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn relative_and_non_http_urls_are_invalid() {
        let f = fetcher(16);
        assert!(matches!(
            f.fetch("uploads/slip.jpg").await,
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            f.fetch("file:///etc/passwd").await,
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
