//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Origins must be absolute URLs with a host
//! - Path rules must be absolute paths, patterns must compile
//! - Lifetimes, capacities and intervals must be positive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::schema::{EdgeConfig, OriginConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_origin("origins.headless", &config.origins.headless, &mut errors);
    validate_origin("origins.primary", &config.origins.primary, &mut errors);

    let routes = &config.routes;
    check_paths("routes.exact", &routes.exact, &mut errors);
    check_paths("routes.prefixes", &routes.prefixes, &mut errors);
    for (i, pattern) in routes.patterns.iter().enumerate() {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::new(format!("routes.patterns[{i}]"), e.to_string()));
        }
    }
    if HeaderName::from_bytes(routes.override_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "routes.override_header",
            format!("'{}' is not a valid header name", routes.override_header),
        ));
    }
    if routes.cache_capacity == 0 {
        errors.push(ValidationError::new("routes.cache_capacity", "must be greater than 0"));
    }

    check_paths("bypass.prefixes", &config.bypass.prefixes, &mut errors);
    check_paths("bypass.password_keywords", &config.bypass.password_keywords, &mut errors);

    for (i, alias) in config.aliases.iter().enumerate() {
        let field = format!("aliases[{i}]");
        if !alias.segment.starts_with('/') || alias.segment.len() < 2 {
            errors.push(ValidationError::new(
                format!("{field}.segment"),
                "must be an absolute path segment such as '/account'",
            ));
        }
        if alias.suffix.is_empty() || alias.suffix.contains(['/', '?', '#']) {
            errors.push(ValidationError::new(
                format!("{field}.suffix"),
                "must be non-empty and must not contain '/', '?' or '#'",
            ));
        }
    }

    let caches = &config.caches;
    for (field, value) in [
        ("caches.collect_ttl_secs", caches.collect_ttl_secs),
        ("caches.beacon_ttl_secs", caches.beacon_ttl_secs),
        ("caches.response_ttl_secs", caches.response_ttl_secs),
        ("caches.prune_interval", caches.prune_interval),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    for (field, value) in [
        ("caches.collect_capacity", caches.collect_capacity),
        ("caches.beacon_capacity", caches.beacon_capacity),
        ("caches.response_capacity", caches.response_capacity),
        ("listener.max_connections", config.listener.max_connections),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    check_paths(
        "endpoints",
        &[
            config.endpoints.metrics_path.clone(),
            config.endpoints.beacon_prefix.clone(),
            config.endpoints.collect_prefix.clone(),
        ],
        &mut errors,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_origin(field: &str, origin: &OriginConfig, errors: &mut Vec<ValidationError>) {
    match Url::parse(&origin.base_url) {
        Ok(url) => {
            if url.host_str().is_none() {
                errors.push(ValidationError::new(
                    format!("{field}.base_url"),
                    format!("'{}' has no host", origin.base_url),
                ));
            }
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::new(
                    format!("{field}.base_url"),
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            if url.path() != "/" || url.query().is_some() {
                errors.push(ValidationError::new(
                    format!("{field}.base_url"),
                    "must not carry a path or query",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new(
            format!("{field}.base_url"),
            format!("'{}': {}", origin.base_url, e),
        )),
    }

    if let Some(host) = &origin.host {
        if host.is_empty() || host.contains(['/', ' ']) {
            errors.push(ValidationError::new(
                format!("{field}.host"),
                format!("'{host}' is not a valid host"),
            ));
        }
    }
}

fn check_paths(field: &str, paths: &[String], errors: &mut Vec<ValidationError>) {
    for (i, path) in paths.iter().enumerate() {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{field}[{i}]"),
                format!("'{path}' must start with '/'"),
            ));
        }
    }
}
