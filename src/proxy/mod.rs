//! Proxying subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → dispatcher.rs (tick, operational endpoints, plan)
//!     → endpoints.rs (performance, beacon and collect acks)
//!     → origin.rs (target URL, Host header)
//!     → upstream.rs (forward, buffer response)
//!     → [rewrite] → [response cache] → client
//! ```

pub mod dispatcher;
pub mod endpoints;
pub mod origin;
pub mod upstream;

pub use dispatcher::Dispatcher;
pub use endpoints::PerformanceReport;
pub use origin::{OriginDescriptor, OriginLabel, Origins};
pub use upstream::{HttpUpstream, OutboundRequest, Upstream, UpstreamError};
