//! Bypass rules.
//!
//! Requests matched here always go to the primary origin, whatever the
//! route classifier or the override header would say. Checks run in order:
//! checkout subdomain, sensitive path prefix, password page, URL marker.

use serde::Serialize;
use url::Url;

use crate::config::BypassConfig;

/// Which rule forced the request to the primary origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    CheckoutSubdomain,
    PathPrefix,
    PasswordPage,
    UrlMarker,
}

impl BypassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BypassReason::CheckoutSubdomain => "checkout_subdomain",
            BypassReason::PathPrefix => "path_prefix",
            BypassReason::PasswordPage => "password_page",
            BypassReason::UrlMarker => "url_marker",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BypassClassifier {
    checkout_subdomain: String,
    prefixes: Vec<String>,
    password_keywords: Vec<String>,
    url_markers: Vec<String>,
}

impl BypassClassifier {
    pub fn from_config(config: &BypassConfig) -> Self {
        Self {
            checkout_subdomain: config.checkout_subdomain.to_ascii_lowercase(),
            prefixes: config.prefixes.clone(),
            password_keywords: config.password_keywords.clone(),
            url_markers: config.url_markers.clone(),
        }
    }

    /// The first bypass rule matching `url`, if any.
    pub fn evaluate(&self, url: &Url) -> Option<BypassReason> {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !self.checkout_subdomain.is_empty() && host.starts_with(&self.checkout_subdomain) {
            return Some(BypassReason::CheckoutSubdomain);
        }

        let path = url.path();
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return Some(BypassReason::PathPrefix);
        }

        if self.is_password_path(path) {
            return Some(BypassReason::PasswordPage);
        }

        let full = url.as_str();
        if self.url_markers.iter().any(|m| full.contains(m.as_str())) {
            return Some(BypassReason::UrlMarker);
        }

        None
    }

    /// True for password and challenge pages, which need host-scoped
    /// response rewriting.
    pub fn is_password_related(&self, url: &Url) -> bool {
        self.is_password_path(url.path())
    }

    fn is_password_path(&self, path: &str) -> bool {
        self.password_keywords.iter().any(|keyword| {
            path == keyword
                || path
                    .strip_prefix(keyword.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
                || path.contains(keyword.as_str())
        })
    }
}
