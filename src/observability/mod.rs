//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (Prometheus counters, histograms)
//!     → aggregator.rs (in-process snapshot for the performance endpoint)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Performance endpoint and the periodic performance report
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through all log events of a request
//! - Metrics are cheap (atomic increments, one short lock per request)

pub mod aggregator;
pub mod logging;
pub mod metrics;

pub use aggregator::{MetricsAggregator, MetricsSnapshot, RequestKind, RequestRecord};
pub use logging::init_logging;
pub use metrics::init_metrics;
