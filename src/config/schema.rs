//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to defaults so a partial file is enough.

use serde::{Deserialize, Serialize};

/// Root configuration for the storefront edge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// The two origins the edge can forward to.
    pub origins: OriginsConfig,

    /// Headless routing rules.
    pub routes: RoutesConfig,

    /// Paths and hosts that always go to the primary origin.
    pub bypass: BypassConfig,

    /// Path aliases that keep primary-origin pages addressable.
    pub aliases: Vec<AliasConfig>,

    /// Cache lifetimes and capacities.
    pub caches: CacheConfig,

    /// Operational endpoints answered by the edge itself.
    pub endpoints: EndpointsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request limits.
    pub security: SecurityConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            origins: OriginsConfig::default(),
            routes: RoutesConfig::default(),
            bypass: BypassConfig::default(),
            aliases: default_aliases(),
            caches: CacheConfig::default(),
            endpoints: EndpointsConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,

    /// Client-facing hostname assumed when a request carries no Host.
    pub public_host: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            public_host: "localhost".to_string(),
        }
    }
}

/// Both origins.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginsConfig {
    /// Origin serving the headless storefront.
    pub headless: OriginConfig,

    /// Default storefront origin.
    pub primary: OriginConfig,
}

impl Default for OriginsConfig {
    fn default() -> Self {
        Self {
            headless: OriginConfig {
                base_url: "https://headless.example.myshopify.dev".to_string(),
                host: None,
            },
            primary: OriginConfig {
                base_url: "https://shop.example.myshopify.com".to_string(),
                host: Some("shops.myshopify.com".to_string()),
            },
        }
    }
}

/// A single origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// Base URL, scheme and authority only (e.g., "https://shop.example.com").
    pub base_url: String,

    /// Host header sent upstream. Defaults to the base URL's authority.
    #[serde(default)]
    pub host: Option<String>,
}

/// Headless routing rules, evaluated exact → prefix → pattern.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Literal paths.
    pub exact: Vec<String>,

    /// Path prefixes. Sorted longest-first at startup.
    pub prefixes: Vec<String>,

    /// Structural patterns (regular expressions over the path).
    pub patterns: Vec<String>,

    /// Header that forces headless routing when set to `override_value`.
    pub override_header: String,

    /// Affirmative value of the override header.
    pub override_value: String,

    /// Maximum number of memoized path classifications.
    pub cache_capacity: usize,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            exact: vec![
                "/collections/keyboards".to_string(),
                "/custom-headless-page".to_string(),
                "/api/collect".to_string(),
            ],
            prefixes: vec![
                "/collections/in-stock-keyboards/".to_string(),
                "/api/collect/".to_string(),
                "/headless/".to_string(),
                "/account".to_string(),
            ],
            patterns: vec![
                r"^/collections/[a-z0-9-]+/products/[a-z0-9-]+\.js$".to_string(),
                r"^/products/[a-z0-9-]+/(reviews|specs)$".to_string(),
                r"^/api/collect/[a-z0-9-]+$".to_string(),
            ],
            override_header: "x-headless-request".to_string(),
            override_value: "1".to_string(),
            cache_capacity: 1000,
        }
    }
}

/// Bypass rules. A match always forwards to the primary origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BypassConfig {
    /// Hostname prefix reserved for checkout (e.g., "checkout.").
    pub checkout_subdomain: String,

    /// Sensitive path prefixes.
    pub prefixes: Vec<String>,

    /// Keywords identifying password and challenge pages.
    pub password_keywords: Vec<String>,

    /// Literal markers searched for in the full request URL.
    pub url_markers: Vec<String>,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            checkout_subdomain: "checkout.".to_string(),
            prefixes: vec![
                "/checkout".to_string(),
                "/checkouts/".to_string(),
                "/cart".to_string(),
                "/payments/".to_string(),
                "/services/".to_string(),
                "/wpm@".to_string(),
            ],
            password_keywords: vec!["/password".to_string(), "/challenge".to_string()],
            url_markers: vec![".myshopify.com/checkouts/".to_string()],
        }
    }
}

/// A path segment served by the primary origin under a suffixed alias.
///
/// With `segment = "/account"` and `suffix = "-online"`, clients use
/// `/account-online/...` and the primary origin sees `/account/...`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AliasConfig {
    pub segment: String,
    pub suffix: String,
}

fn default_aliases() -> Vec<AliasConfig> {
    vec![AliasConfig {
        segment: "/account".to_string(),
        suffix: "-online".to_string(),
    }]
}

/// Cache lifetimes and capacities.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL of collect acknowledgements in seconds.
    pub collect_ttl_secs: u64,

    /// Maximum collect acknowledgements kept.
    pub collect_capacity: usize,

    /// TTL of beacon acknowledgements in seconds.
    pub beacon_ttl_secs: u64,

    /// Maximum beacon acknowledgements kept.
    pub beacon_capacity: usize,

    /// TTL of cached full responses in seconds.
    pub response_ttl_secs: u64,

    /// Maximum cached full responses.
    pub response_capacity: usize,

    /// Run cache maintenance every N requests.
    pub prune_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collect_ttl_secs: 300,
            collect_capacity: 1000,
            beacon_ttl_secs: 60,
            beacon_capacity: 1000,
            response_ttl_secs: 300,
            response_capacity: 500,
            prune_interval: 100,
        }
    }
}

/// Operational endpoints answered without contacting an origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Path returning the metrics snapshot.
    pub metrics_path: String,

    /// Prefix of telemetry beacon requests.
    pub beacon_prefix: String,

    /// Prefix of analytics collection requests.
    pub collect_prefix: String,

    /// Collect bodies shorter than this many bytes are acknowledged locally.
    pub collect_max_body: usize,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            metrics_path: "/__performance".to_string(),
            beacon_prefix: "/.well-known/shopify/monorail".to_string(),
            collect_prefix: "/api/collect".to_string(),
            collect_max_body: 1000,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
