//! HTTP content provider.
//!
//! Plain HTTP/1.1 GET requests through the hyper-util pooled client.

use super::{ContentProvider, FetchError};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::{ACCEPT, USER_AGENT};
use hyper::{Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches response bodies over HTTP.
#[derive(Clone, Debug)]
pub struct HttpContentProvider {
    client: Client<HttpConnector, Empty<Bytes>>,
    /// Limit for connect, headers and body together.
    timeout: Duration,
}

impl HttpContentProvider {
    /// Create a provider with the given request timeout.
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            timeout: request_timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, uri: Uri) -> Result<String, FetchError> {
        let url = uri.to_string();
        let request = Request::get(uri)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("rustexporter/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::InvalidUrl {
                url,
                reason: e.to_string(),
            })?;

        let response = self.client.request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();

        debug!(status = %status, bytes = body.len(), "received response");

        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        Ok(String::from_utf8(body.to_vec())?)
    }
}

impl Default for HttpContentProvider {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    #[instrument(skip(self), level = "debug")]
    async fn get_response_content(&self, url: &str) -> Result<String, FetchError> {
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        match timeout(self.timeout, self.fetch(uri)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned response per connection.
    fn start_http_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for mut stream in listener.incoming().flatten() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let base = start_http_server("200 OK", r#"{"value": 42}"#);
        let provider = HttpContentProvider::default();

        let body = provider
            .get_response_content(&format!("{}/status", base))
            .await
            .unwrap();
        assert_eq!(body, r#"{"value": 42}"#);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let base = start_http_server("503 Service Unavailable", "down");
        let provider = HttpContentProvider::default();

        let err = provider.get_response_content(&base).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status } if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let provider = HttpContentProvider::new(Duration::from_secs(2));
        let err = provider
            .get_response_content("http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request(_) | FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let provider = HttpContentProvider::default();
        let err = provider.get_response_content("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        // Accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let _held: Vec<_> = listener.incoming().take(1).flatten().collect();
            thread::sleep(Duration::from_secs(5));
        });

        let provider = HttpContentProvider::new(Duration::from_millis(200));
        let err = provider
            .get_response_content(&format!("http://{}/", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
