//! In-memory caching subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher lookup
//!     → keys.rs (build typed key from method, path, header fingerprint)
//!     → ttl.rs (expiry check, lazy eviction)
//!     → store.rs (the cache instances owned by one dispatcher)
//!
//! Every Nth request:
//!     → store.rs maintain() → prune expired, trim over-capacity
//! ```
//!
//! # Design Decisions
//! - One mutex per cache instance; no sharding
//! - Eviction removes the oldest half by insertion order, not LRU
//! - Caches are best effort: an empty or reset cache never changes behavior,
//!   only cost

pub mod clock;
pub mod keys;
pub mod store;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keys::{BeaconKey, CollectKey, ResponseKey};
pub use store::{CacheSet, CacheSizes, CachedResponse, MaintenanceReport};
pub use ttl::{CacheEntry, TtlCache};
