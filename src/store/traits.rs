//! Core traits and types for the store system.

use chrono::{DateTime, Utc};

/// Identifier used to select which remote resource a store pulls.
pub trait StoreKey: Clone + PartialEq + Send + Sync + std::fmt::Display + 'static {
  /// Blank keys turn a fetch into a no-op.
  fn is_blank(&self) -> bool;
}

impl StoreKey for String {
  fn is_blank(&self) -> bool {
    self.trim().is_empty()
  }
}

/// Mapping from a remote payload shape into a fixed local record shape.
///
/// Implementations must be total (every field the remote side may omit gets a
/// zero/empty default) and idempotent (normalizing an already-normalized
/// record yields the same record).
pub trait Normalize {
  type Record;

  fn normalize(self) -> Self::Record;
}

/// A partial update that a store can merge into its current value.
pub trait Patch<T> {
  fn apply(self, target: &mut T);
}

/// Options for a single fetch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
  /// Skip the staleness check
  pub force: bool,
}

impl FetchOptions {
  pub fn forced() -> Self {
    Self { force: true }
  }
}

/// Synchronously readable state of a store.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
  /// Last successfully fetched value, kept across failed refreshes
  pub value: Option<T>,
  /// True while exactly one fetch is outstanding
  pub is_loading: bool,
  /// Message of the last failed attempt, cleared when a new attempt starts
  pub error: Option<String>,
  /// When the last successful fetch completed
  pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for Snapshot<T> {
  fn default() -> Self {
    Self {
      value: None,
      is_loading: false,
      error: None,
      last_fetched_at: None,
    }
  }
}

impl<T> Snapshot<T> {
  /// True when a value is shown alongside a failed refresh.
  pub fn is_stale_with_error(&self) -> bool {
    self.value.is_some() && self.error.is_some()
  }
}
