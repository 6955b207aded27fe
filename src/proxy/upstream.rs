//! Forwarding to origins.
//!
//! # Responsibilities
//! - Send one buffered request to an origin and buffer its response
//! - Never follow redirects; the edge rewrites them instead
//! - Bound every call by the configured connect and request timeouts
//!
//! # Design Decisions
//! - `Upstream` is a trait so the dispatcher can be driven by a mock in tests
//! - No retries: a failed call is reported to the client as a 500
//! - The future is cancel-safe; dropping it aborts the origin call

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use thiserror::Error;
use url::Url;

use crate::config::TimeoutConfig;
use crate::http::response::UpstreamResponse;
use crate::proxy::origin::OriginLabel;

/// A request ready to be sent to an origin.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub origin: OriginLabel,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("origin did not answer within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to read origin body: {0}")]
    Body(String),
}

/// Sends requests to origins.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, UpstreamError>;
}

/// `reqwest`-backed upstream used in production.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpUpstream {
    pub fn new(config: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let request_timeout = Duration::from_secs(config.request_secs);
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_secs))
            .timeout(request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            request_timeout,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, UpstreamError> {
        tracing::debug!(
            origin = %request.origin,
            method = %request.method,
            url = %request.url,
            "Forwarding request"
        );

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| match self.classify(e) {
                UpstreamError::Transport(msg) => UpstreamError::Body(msg),
                other => other,
            })?;

        Ok(UpstreamResponse::new(status, headers, body))
    }
}

impl HttpUpstream {
    fn classify(&self, error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout(self.request_timeout)
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_config() {
        let upstream = HttpUpstream::new(&TimeoutConfig::default()).unwrap();
        assert_eq!(upstream.request_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = HttpUpstream::new(&TimeoutConfig {
            connect_secs: 1,
            request_secs: 2,
        })
        .unwrap();
        let result = upstream
            .send(OutboundRequest {
                origin: OriginLabel::Primary,
                method: Method::GET,
                url: Url::parse(&format!("http://{addr}/")).unwrap(),
                headers: HeaderMap::new(),
                body: Bytes::new(),
            })
            .await;
        assert!(matches!(result, Err(UpstreamError::Transport(_))));
    }
}
