//! In-memory stores for remote resources.
//!
//! A `CacheStore` wraps a fetch-and-normalize function and provides:
//! - At most one outstanding request per store
//! - A staleness window during which repeated fetches are answered from memory
//! - Failure recording that keeps the last good value visible
//! - Subscriptions, so one store can derive state from another through the
//!   target's own `patch` operation

mod clock;
mod layer;
mod traits;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use layer::CacheStore;
pub use traits::{FetchOptions, Normalize, Patch, Snapshot, StoreKey};
