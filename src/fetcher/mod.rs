//! Document fetching.
//!
//! One outbound GET per download request against the resolved URL. The
//! fetcher distinguishes transport failures (connect errors, timeouts,
//! non-success status) from content failures, which surface later when the
//! stamper tries to parse the bytes. There is no retry at this layer; the
//! delivery adapter owns the fallback policy.

use crate::error::PipelineError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;

/// Configuration for the document fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timeout for the whole request.
    pub timeout: Duration,
    /// Upper bound on the fetched document size, in bytes.
    pub max_document_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_document_bytes: 100 * 1024 * 1024, // 100 MB
        }
    }
}

/// Source of raw document bytes, injectable so the delivery adapter can be
/// exercised without a network.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the raw document bytes behind a resolved URL.
    async fn fetch(&self, url: &str) -> Result<Bytes, PipelineError>;
}

/// HTTP document fetcher.
#[derive(Clone)]
pub struct DocumentFetcher {
    http_client: reqwest::Client,
    max_document_bytes: usize,
}

impl DocumentFetcher {
    /// Create a fetcher with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Transport` if the HTTP client cannot be
    /// created (e.g. TLS backend initialization failure).
    pub fn new(config: FetcherConfig) -> Result<Self, PipelineError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Transport(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            max_document_bytes: config.max_document_bytes,
        })
    }

    /// Fetch the raw document bytes from a resolved URL.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Transport` when the request does not
    /// complete, returns a non-success status, or the body exceeds the
    /// configured size bound. The bound is enforced before download when
    /// the server advertises a length, and while streaming otherwise, so
    /// an oversized body never sits fully in memory.
    pub async fn fetch_document(&self, url: &str) -> Result<Bytes, PipelineError> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(format!("HTTP fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Transport(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        if let Some(advertised) = response.content_length() {
            if advertised > self.max_document_bytes as u64 {
                return Err(PipelineError::Transport(format!(
                    "document of {} bytes exceeds the {} byte limit",
                    advertised, self.max_document_bytes
                )));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::Transport(format!("failed to read HTTP body: {}", e)))?
        {
            if body.len() + chunk.len() > self.max_document_bytes {
                return Err(PipelineError::Transport(format!(
                    "document body exceeds the {} byte limit",
                    self.max_document_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, size = body.len(), "Fetched document");

        Ok(body.freeze())
    }
}

#[async_trait]
impl DocumentSource for DocumentFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, PipelineError> {
        self.fetch_document(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on a loopback socket.
    async fn one_shot_server(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let header = format!(
                "{}\r\nContent-Length: {}\r\nContent-Type: application/pdf\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            stream.write_all(header.as_bytes()).await.unwrap();
            stream.write_all(body).await.unwrap();
        });

        format!("http://{}/paper.pdf", addr)
    }

    /// Serve a canned 200 response with no Content-Length header; the body
    /// is delimited by connection close.
    async fn one_shot_server_unsized(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nConnection: close\r\n\r\n",
                )
                .await
                .unwrap();
            stream.write_all(body).await.unwrap();
        });

        format!("http://{}/paper.pdf", addr)
    }

    #[test]
    fn test_fetcher_config_default() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_document_bytes, 100 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = one_shot_server("HTTP/1.1 200 OK", b"%PDF-raw-bytes").await;
        let fetcher = DocumentFetcher::new(FetcherConfig::default()).unwrap();

        let bytes = fetcher.fetch_document(&url).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-raw-bytes");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_transport_error() {
        let url = one_shot_server("HTTP/1.1 404 Not Found", b"missing").await;
        let fetcher = DocumentFetcher::new(FetcherConfig::default()).unwrap();

        let err = fetcher.fetch_document(&url).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_connect_failure_is_transport_error() {
        let fetcher = DocumentFetcher::new(FetcherConfig::default()).unwrap();

        // Malformed target; the client rejects it before any I/O happens.
        let err = fetcher.fetch_document("http://").await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
    }

    #[tokio::test]
    async fn test_fetch_oversized_body_is_transport_error() {
        let url = one_shot_server("HTTP/1.1 200 OK", b"0123456789").await;
        let fetcher = DocumentFetcher::new(FetcherConfig {
            timeout: Duration::from_secs(5),
            max_document_bytes: 4,
        })
        .unwrap();

        let err = fetcher.fetch_document(&url).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
        assert!(err.to_string().contains("limit"));
    }

    // Test: the size bound holds even when the server sends no
    // Content-Length, so the cap applies mid-stream.
    #[tokio::test]
    async fn test_fetch_unsized_oversized_body_is_transport_error() {
        let url = one_shot_server_unsized(b"0123456789").await;
        let fetcher = DocumentFetcher::new(FetcherConfig {
            timeout: Duration::from_secs(5),
            max_document_bytes: 4,
        })
        .unwrap();

        let err = fetcher.fetch_document(&url).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
        assert!(err.to_string().contains("limit"));
    }

    #[tokio::test]
    async fn test_fetch_unsized_body_within_limit_succeeds() {
        let url = one_shot_server_unsized(b"%PDF-raw-bytes").await;
        let fetcher = DocumentFetcher::new(FetcherConfig::default()).unwrap();

        let bytes = fetcher.fetch_document(&url).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-raw-bytes");
    }
}
