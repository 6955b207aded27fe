use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::internal_error;
use crate::proxy::upstream::UpstreamError;

/// Errors that end a request with the generic 500.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Upstream(UpstreamError::Timeout(_)) => "upstream_timeout",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        internal_error()
    }
}

/// Errors building the edge from a validated configuration.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("invalid origin '{url}': {reason}")]
    InvalidOrigin { url: String, reason: String },

    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid header name '{0}'")]
    InvalidHeader(String),

    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] reqwest::Error),
}
