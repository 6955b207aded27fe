//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → consumed once at startup to build origins, classifiers and caches
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; origins never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AliasConfig, BypassConfig, CacheConfig, EdgeConfig, EndpointsConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, OriginConfig, OriginsConfig, RoutesConfig, SecurityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
