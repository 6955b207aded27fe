//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body buffering)
//!     → request.rs (owned request, client host, client URL)
//!     → [dispatcher decides origin, forwards, rewrites]
//!     → response.rs (hop-by-hop removal, edge-generated responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::{internal_error, UpstreamResponse};
pub use server::HttpServer;
