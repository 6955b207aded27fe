//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamResponse + RewriteContext
//!     → redirect.rs (Location: origin host → client host, path aliases)
//!     → cookie.rs   (Set-Cookie: Domain scoped to the client host)
//!     → html.rs     (text/html: domain replacement, href aliases)
//!     → new UpstreamResponse
//! ```
//!
//! # Design Decisions
//! - The input response is never mutated; a rewrite builds a new value
//! - Any failure is returned as `RewriteError`; the caller falls back to the
//!   original response
//! - Non-password bypass responses pass through untouched
//! - Routed headless responses only get redirect rewriting; every primary
//!   response gets cookie and HTML domain rewriting too

pub mod cookie;
pub mod html;
pub mod redirect;

use axum::body::Bytes;
use axum::http::header::{self, InvalidHeaderValue, ToStrError};
use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

pub use cookie::{rewrite_set_cookie, CookieScope};
pub use html::HtmlRewriter;
pub use redirect::{LocationRewriter, PathAlias};

use crate::config::AliasConfig;
use crate::error::SetupError;
use crate::http::response::UpstreamResponse;
use crate::proxy::origin::{OriginLabel, Origins};

/// Which rewrites apply to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// A normally routed request.
    Routed,
    /// A request that arrived under a path alias.
    Alias,
    /// A bypassed password or challenge page.
    Password,
}

impl RewriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::Routed => "routed",
            RewriteMode::Alias => "alias",
            RewriteMode::Password => "password",
        }
    }
}

/// Everything the rewriter needs to know about the request, built once at
/// classification.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub original_url: Url,
    pub client_host: String,
    pub origin: OriginLabel,
    pub is_bypass: bool,
    pub is_headless: bool,
    pub mode: RewriteMode,
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("header is not visible ASCII: {0}")]
    InvalidHeader(#[from] ToStrError),

    #[error("rewritten header is not a valid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),

    #[error("invalid location '{location}': {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },
}

/// Turns origin responses into client-facing responses.
#[derive(Debug, Clone)]
pub struct ResponseRewriter {
    aliases: Vec<PathAlias>,
    locations: LocationRewriter,
    html: HtmlRewriter,
}

impl ResponseRewriter {
    pub fn from_config(origins: &Origins, aliases: &[AliasConfig]) -> Result<Self, SetupError> {
        let aliases: Vec<PathAlias> = aliases.iter().map(PathAlias::from_config).collect();
        let primary_domain = origins.primary.domain();
        Ok(Self {
            locations: LocationRewriter::new(origins.headless.base(), primary_domain, aliases.clone())?,
            html: HtmlRewriter::new(primary_domain, &aliases)?,
            aliases,
        })
    }

    /// Origin path for a path that arrived under an alias.
    pub fn resolve_alias(&self, path: &str) -> Option<String> {
        self.aliases.iter().find_map(|a| a.strip(path))
    }

    /// Rewrite a response for the client.
    pub fn rewrite(
        &self,
        response: &UpstreamResponse,
        ctx: &RewriteContext,
    ) -> Result<UpstreamResponse, RewriteError> {
        if ctx.is_bypass && ctx.mode != RewriteMode::Password {
            return Ok(response.clone());
        }
        let mut headers = response.headers.clone();

        if response.is_redirect() {
            if let Some(raw) = response.headers.get(header::LOCATION) {
                let location = raw.to_str()?;
                let rewritten = self.locations.rewrite(location, ctx)?;
                if rewritten != location {
                    tracing::debug!(from = %location, to = %rewritten, mode = ctx.mode.as_str(), "Rewrote redirect");
                    headers.insert(header::LOCATION, HeaderValue::from_str(&rewritten)?);
                }
            }
        }

        if ctx.mode == RewriteMode::Routed && ctx.origin == OriginLabel::Headless {
            return Ok(UpstreamResponse::new(response.status, headers, response.body.clone()));
        }

        let scope = match ctx.mode {
            RewriteMode::Password => CookieScope::Host,
            _ => CookieScope::Subdomain,
        };
        let cookies = response
            .headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().map(str::to_owned))
            .collect::<Result<Vec<_>, _>>()?;
        if !cookies.is_empty() {
            headers.remove(header::SET_COOKIE);
            for cookie in cookies {
                if let Some(rewritten) = rewrite_set_cookie(&cookie, &ctx.client_host, scope) {
                    headers.append(header::SET_COOKIE, HeaderValue::from_str(&rewritten)?);
                }
            }
        }

        let body = if response.is_redirect() && ctx.mode != RewriteMode::Routed {
            Bytes::new()
        } else if HtmlRewriter::is_rewritable(&response.headers) {
            let with_aliases = ctx.mode == RewriteMode::Alias;
            match self.html.rewrite(&response.body, &ctx.client_host, with_aliases) {
                Some(html) => Bytes::from(html),
                None => response.body.clone(),
            }
        } else {
            response.body.clone()
        };

        if body.len() != response.body.len() {
            headers.remove(header::CONTENT_LENGTH);
        }
        Ok(UpstreamResponse::new(response.status, headers, body))
    }
}
