//! Content providers fetch raw response bodies for exporters.

mod http;

pub use http::HttpContentProvider;

use async_trait::async_trait;
use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("unexpected status {status}")]
    Status { status: StatusCode },

    #[error("request timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Source of response bodies.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch the body at `url` as text.
    async fn get_response_content(&self, url: &str) -> Result<String, FetchError>;
}
