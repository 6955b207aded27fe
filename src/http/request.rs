//! Request handling.
//!
//! # Responsibilities
//! - Buffer the inbound request into an owned value
//! - Extract routing-relevant information (client host, path, query)
//! - Rebuild the client-facing URL the bypass rules inspect
//!
//! # Design Decisions
//! - Request ID is assigned by the tower-http layer before the handler runs
//! - The original request is never mutated; outbound copies are built from it

use std::str::FromStr;

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::uri::Authority;
use axum::http::{header, HeaderMap, Method, Uri};
use url::Url;

/// Request ID header set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
        }
    }

    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("unknown")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Hostname the client addressed, without port. Falls back to the URI
    /// authority, then to `fallback`.
    pub fn client_host(&self, fallback: &str) -> String {
        self.headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| Authority::from_str(h).ok())
            .map(|a| a.host().to_ascii_lowercase())
            .or_else(|| self.uri.host().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| fallback.to_string())
    }

    /// The client-facing URL: `https://<client host><path>[?query]`.
    pub fn client_url(&self, client_host: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("https://{client_host}"))?;
        url.set_path(self.path());
        url.set_query(self.query());
        Ok(url)
    }
}
