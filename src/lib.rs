//! Storefront edge proxy library.
//!
//! Splits storefront traffic between a headless origin and the primary
//! storefront origin, rewrites primary-origin responses so visitors stay on
//! the public domain, and answers telemetry endpoints locally.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod rewrite;
pub mod routing;

pub use config::schema::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::Dispatcher;
