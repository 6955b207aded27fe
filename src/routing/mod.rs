//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (client URL, path, headers)
//!     → bypass.rs (checkout, payment, password rules; absolute)
//!     → router.rs (override header, path cache)
//!     → matcher.rs (exact → prefix → structural)
//!     → Return: headless or primary
//!
//! Route Compilation (at startup):
//!     RoutesConfig
//!     → Sort prefixes longest-first
//!     → Compile structural patterns
//!     → Freeze as an ordered list of tagged matchers
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - Deterministic: same path always yields the same origin
//! - First match wins, no match means primary

pub mod bypass;
pub mod matcher;
pub mod router;

pub use bypass::{BypassClassifier, BypassReason};
pub use matcher::{MatchLayer, RouteMatcher};
pub use router::{Classification, ClassifyReason, RouteClassifier};
