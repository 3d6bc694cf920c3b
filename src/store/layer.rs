//! Cache store that gates remote fetches behind an in-flight flag and a
//! staleness window.

use chrono::Duration;
use color_eyre::{Report, Result};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::traits::{FetchOptions, Patch, Snapshot, StoreKey};

/// Message recorded when a failure carries no text of its own.
const FALLBACK_ERROR: &str = "Request failed";

type Fetcher<K, T> = dyn Fn(K) -> BoxFuture<'static, Result<T>> + Send + Sync;
type Listener<K, T> = Arc<dyn Fn(&K, &T) -> Result<()> + Send + Sync>;

struct State<K, T> {
  snapshot: Snapshot<T>,
  /// Key the current value was fetched for
  key: Option<K>,
}

/// Single-slot store wrapping a fetch-and-normalize function.
///
/// At most one fetch runs at a time. While one is outstanding, further calls
/// return the current value without starting another request, whatever key
/// they ask for. Successful values stay fresh for `stale_time`; within that
/// window a fetch for the same key is answered from memory unless forced.
///
/// Failures never escape `fetch`: they are recorded in the snapshot's `error`
/// field while the last good value is retained.
pub struct CacheStore<K, T> {
  name: &'static str,
  fetcher: Arc<Fetcher<K, T>>,
  /// How long a successful value is considered fresh
  stale_time: Duration,
  clock: Arc<dyn Clock>,
  state: Arc<Mutex<State<K, T>>>,
  listeners: Arc<Mutex<Vec<Listener<K, T>>>>,
}

impl<K: StoreKey, T: Clone + Send + Sync + 'static> CacheStore<K, T> {
  /// Create a store around `fetcher` with a 60 second staleness window.
  pub fn new<F, Fut>(name: &'static str, fetcher: F) -> Self
  where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    Self {
      name,
      fetcher: Arc::new(move |key| fetcher(key).boxed()),
      stale_time: Duration::seconds(60),
      clock: Arc::new(SystemClock),
      state: Arc::new(Mutex::new(State {
        snapshot: Snapshot::default(),
        key: None,
      })),
      listeners: Arc::new(Mutex::new(Vec::new())),
    }
  }

  /// Set the staleness window.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Replace the time source used for staleness checks.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Current state, readable without waiting on any fetch.
  pub fn snapshot(&self) -> Snapshot<T> {
    self.lock_state().snapshot.clone()
  }

  /// Fetch the resource identified by `key`.
  ///
  /// 1. Blank key: no-op, returns the cached value
  /// 2. A fetch is already in flight: returns the cached value
  /// 3. Not forced and the cached value for this key is fresh: returns it
  /// 4. Otherwise calls the fetcher and commits the outcome
  ///
  /// On failure the previously cached value is returned.
  pub async fn fetch(&self, key: K, options: FetchOptions) -> Option<T> {
    if key.is_blank() {
      debug!(store = self.name, "skipping fetch without a key");
      return self.lock_state().snapshot.value.clone();
    }

    let gate = {
      let mut state = self.lock_state();
      if state.snapshot.is_loading {
        debug!(store = self.name, %key, "fetch already in flight");
        return state.snapshot.value.clone();
      }
      if !options.force && self.is_fresh(&state, &key) {
        debug!(store = self.name, %key, "cached value is fresh");
        return state.snapshot.value.clone();
      }
      state.snapshot.is_loading = true;
      state.snapshot.error = None;
      InFlight {
        state: &self.state,
        settled: false,
      }
    };

    let outcome = (self.fetcher)(key.clone()).await;
    gate.settle();

    match outcome {
      Ok(value) => {
        {
          let mut state = self.lock_state();
          state.snapshot.value = Some(value.clone());
          state.snapshot.last_fetched_at = Some(self.clock.now());
          state.snapshot.is_loading = false;
          state.snapshot.error = None;
          state.key = Some(key.clone());
        }
        info!(store = self.name, %key, "fetch completed");
        self.publish(&key, &value);
        Some(value)
      }
      Err(report) => {
        let message = failure_message(&report);
        warn!(store = self.name, %key, error = %message, "fetch failed");
        let mut state = self.lock_state();
        state.snapshot.is_loading = false;
        state.snapshot.error = Some(message);
        state.snapshot.value.clone()
      }
    }
  }

  /// Register a listener called with every successfully fetched value.
  ///
  /// Listener errors and panics are logged and dropped; they never turn a
  /// successful fetch into a failed one.
  pub fn subscribe<F>(&self, listener: F)
  where
    F: Fn(&K, &T) -> Result<()> + Send + Sync + 'static,
  {
    self
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Arc::new(listener));
  }

  /// Merge a partial update into the value cached for `key`.
  ///
  /// Ignored until a fetch has succeeded, and when the cached value belongs
  /// to a different key. Loading state, error and fetch time are left
  /// untouched, so a patched store still fetches on its next call.
  pub fn patch<P: Patch<T>>(&self, key: &K, patch: P) {
    let mut state = self.lock_state();
    let State { snapshot, key: cached } = &mut *state;

    match (cached.as_ref(), snapshot.value.as_mut()) {
      (Some(cached), Some(value)) if cached == key => {
        patch.apply(value);
        debug!(store = self.name, %key, "applied patch");
      }
      (Some(_), Some(_)) => debug!(store = self.name, %key, "ignoring patch for another key"),
      _ => debug!(store = self.name, %key, "nothing fetched yet, dropping patch"),
    }
  }

  fn is_fresh(&self, state: &State<K, T>, key: &K) -> bool {
    match (&state.key, state.snapshot.last_fetched_at) {
      (Some(cached), Some(fetched_at)) if cached == key => {
        self.clock.now() - fetched_at < self.stale_time
      }
      _ => false,
    }
  }

  fn publish(&self, key: &K, value: &T) {
    let listeners = self
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();

    for listener in listeners {
      match panic::catch_unwind(AssertUnwindSafe(|| listener(key, value))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(store = self.name, error = %e, "subscriber failed"),
        Err(_) => warn!(store = self.name, "subscriber panicked"),
      }
    }
  }

  fn lock_state(&self) -> MutexGuard<'_, State<K, T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<K, T> Clone for CacheStore<K, T> {
  fn clone(&self) -> Self {
    Self {
      name: self.name,
      fetcher: Arc::clone(&self.fetcher),
      stale_time: self.stale_time,
      clock: Arc::clone(&self.clock),
      state: Arc::clone(&self.state),
      listeners: Arc::clone(&self.listeners),
    }
  }
}

/// Clears the loading flag if the fetch future is dropped or panics before
/// the outcome is committed.
struct InFlight<'a, K, T> {
  state: &'a Mutex<State<K, T>>,
  settled: bool,
}

impl<K, T> InFlight<'_, K, T> {
  /// The caller commits the outcome itself from here on.
  fn settle(mut self) {
    self.settled = true;
  }
}

impl<K, T> Drop for InFlight<'_, K, T> {
  fn drop(&mut self) {
    if !self.settled {
      let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
      state.snapshot.is_loading = false;
    }
  }
}

fn failure_message(report: &Report) -> String {
  let message = report.to_string();
  if message.trim().is_empty() {
    FALLBACK_ERROR.to_string()
  } else {
    message
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::clock::ManualClock;
  use color_eyre::eyre::eyre;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tokio::sync::Notify;

  #[derive(Debug, Clone, Default, PartialEq)]
  struct Stats {
    total: u32,
    earned: u32,
  }

  struct Earned(u32);

  impl Patch<Stats> for Earned {
    fn apply(self, target: &mut Stats) {
      target.earned = self.0;
    }
  }

  /// Store whose fetcher replays `responses` in order and counts calls.
  fn scripted(
    responses: Vec<Result<Stats>>,
  ) -> (CacheStore<String, Stats>, Arc<AtomicUsize>, Arc<ManualClock>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
    let clock = Arc::new(ManualClock::new());

    let counter = Arc::clone(&calls);
    let store = CacheStore::new("test", move |_key: String| {
      counter.fetch_add(1, Ordering::SeqCst);
      let next = queue.lock().unwrap().pop_front();
      async move { next.unwrap_or_else(|| Err(eyre!("no scripted response"))) }
    })
    .with_clock(clock.clone());

    (store, calls, clock)
  }

  fn stats(total: u32) -> Stats {
    Stats { total, earned: 0 }
  }

  #[tokio::test]
  async fn test_first_fetch_populates_snapshot() {
    let (store, calls, _clock) = scripted(vec![Ok(stats(5))]);

    let value = store.fetch("user1".into(), FetchOptions::default()).await;

    assert_eq!(value, Some(stats(5)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.value, Some(stats(5)));
    assert!(!snapshot.is_loading);
    assert!(snapshot.error.is_none());
    assert!(snapshot.last_fetched_at.is_some());
  }

  #[tokio::test]
  async fn test_overlapping_fetches_make_one_remote_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());

    let counter = Arc::clone(&calls);
    let gate = Arc::clone(&release);
    let store = CacheStore::new("test", move |_key: String| {
      counter.fetch_add(1, Ordering::SeqCst);
      let gate = Arc::clone(&gate);
      async move {
        gate.notified().await;
        Ok(stats(7))
      }
    });

    let first = {
      let store = store.clone();
      tokio::spawn(async move { store.fetch("user1".into(), FetchOptions::default()).await })
    };
    while !store.snapshot().is_loading {
      tokio::task::yield_now().await;
    }

    assert_eq!(store.fetch("user1".into(), FetchOptions::default()).await, None);
    assert_eq!(store.fetch("user1".into(), FetchOptions::forced()).await, None);
    assert_eq!(store.fetch("user2".into(), FetchOptions::forced()).await, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    release.notify_one();
    assert_eq!(first.await.unwrap(), Some(stats(7)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!store.snapshot().is_loading);
  }

  #[tokio::test]
  async fn test_staleness_window() {
    let (store, calls, clock) = scripted(vec![Ok(stats(1)), Ok(stats(2))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    clock.advance(Duration::milliseconds(59_999));
    let value = store.fetch("user1".into(), FetchOptions::default()).await;
    assert_eq!(value, Some(stats(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::milliseconds(2));
    let value = store.fetch("user1".into(), FetchOptions::default()).await;
    assert_eq!(value, Some(stats(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_custom_stale_time() {
    let (store, calls, clock) = scripted(vec![Ok(stats(1)), Ok(stats(2))]);
    let store = store.with_stale_time(Duration::seconds(5));

    store.fetch("user1".into(), FetchOptions::default()).await;
    clock.advance(Duration::seconds(6));
    store.fetch("user1".into(), FetchOptions::default()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_force_bypasses_staleness() {
    let (store, calls, _clock) = scripted(vec![Ok(stats(1)), Ok(stats(2))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    let value = store.fetch("user1".into(), FetchOptions::forced()).await;

    assert_eq!(value, Some(stats(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_new_key_bypasses_staleness() {
    let (store, calls, _clock) = scripted(vec![Ok(stats(1)), Ok(stats(2))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    let value = store.fetch("user2".into(), FetchOptions::default()).await;

    assert_eq!(value, Some(stats(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_blank_key_is_noop() {
    let (store, calls, _clock) = scripted(vec![Ok(stats(1))]);

    assert_eq!(store.fetch("  ".into(), FetchOptions::forced()).await, None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_failure_retains_value() {
    let (store, _calls, _clock) = scripted(vec![Ok(stats(5)), Err(eyre!("Network error"))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    let fetched_at = store.snapshot().last_fetched_at;
    let value = store.fetch("user1".into(), FetchOptions::forced()).await;

    assert_eq!(value, Some(stats(5)));
    let snapshot = store.snapshot();
    assert_eq!(snapshot.value, Some(stats(5)));
    assert_eq!(snapshot.error.as_deref(), Some("Network error"));
    assert_eq!(snapshot.last_fetched_at, fetched_at);
    assert!(!snapshot.is_loading);
    assert!(snapshot.is_stale_with_error());
  }

  #[tokio::test]
  async fn test_failure_does_not_mark_fresh() {
    let (store, calls, _clock) = scripted(vec![Err(eyre!("offline")), Ok(stats(3))]);

    assert_eq!(store.fetch("user1".into(), FetchOptions::default()).await, None);
    assert!(store.snapshot().last_fetched_at.is_none());

    let value = store.fetch("user1".into(), FetchOptions::default()).await;
    assert_eq!(value, Some(stats(3)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_success_clears_error() {
    let (store, _calls, _clock) = scripted(vec![Err(eyre!("x")), Ok(stats(1))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    assert_eq!(store.snapshot().error.as_deref(), Some("x"));

    store.fetch("user1".into(), FetchOptions::default()).await;
    assert!(store.snapshot().error.is_none());
  }

  #[tokio::test]
  async fn test_empty_failure_message_uses_fallback() {
    let (store, _calls, _clock) = scripted(vec![Err(eyre!(""))]);

    store.fetch("user1".into(), FetchOptions::default()).await;

    assert_eq!(store.snapshot().error.as_deref(), Some(FALLBACK_ERROR));
  }

  #[tokio::test]
  async fn test_dropped_fetch_releases_gate() {
    let store: CacheStore<String, Stats> =
      CacheStore::new("test", |_key: String| futures::future::pending());

    let timed_out = tokio::time::timeout(
      std::time::Duration::from_millis(10),
      store.fetch("user1".into(), FetchOptions::default()),
    )
    .await;

    assert!(timed_out.is_err());
    assert!(!store.snapshot().is_loading);
  }

  #[tokio::test]
  async fn test_subscriber_receives_value() {
    let (store, _calls, _clock) = scripted(vec![Ok(stats(4))]);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    store.subscribe(move |key: &String, value: &Stats| {
      sink.lock().unwrap().push((key.clone(), value.total));
      Ok(())
    });
    store.fetch("user1".into(), FetchOptions::default()).await;

    assert_eq!(*seen.lock().unwrap(), vec![("user1".to_string(), 4)]);
  }

  #[tokio::test]
  async fn test_failing_subscribers_are_swallowed() {
    let (store, _calls, _clock) = scripted(vec![Ok(stats(4))]);
    store.subscribe(|_: &String, _: &Stats| Err(eyre!("target rejected patch")));
    store.subscribe(|_: &String, _: &Stats| panic!("subscriber bug"));

    let value = store.fetch("user1".into(), FetchOptions::default()).await;

    assert_eq!(value, Some(stats(4)));
    let snapshot = store.snapshot();
    assert!(snapshot.error.is_none());
    assert!(!snapshot.is_loading);
  }

  #[tokio::test]
  async fn test_patch_merges_without_touching_fetch_state() {
    let (store, calls, _clock) = scripted(vec![Ok(stats(5)), Ok(stats(6))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    let fetched_at = store.snapshot().last_fetched_at;
    store.patch(&"user1".to_string(), Earned(40));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.value, Some(Stats { total: 5, earned: 40 }));
    assert_eq!(snapshot.last_fetched_at, fetched_at);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_patch_for_other_key_is_ignored() {
    let (store, _calls, _clock) = scripted(vec![Ok(stats(5))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    store.patch(&"user2".to_string(), Earned(40));

    assert_eq!(store.snapshot().value, Some(stats(5)));
  }

  #[tokio::test]
  async fn test_patch_on_empty_store_is_dropped() {
    let (store, calls, _clock) = scripted(vec![Ok(stats(9))]);

    store.patch(&"user1".to_string(), Earned(12));
    assert_eq!(store.snapshot().value, None);
    assert!(store.snapshot().last_fetched_at.is_none());

    store.fetch("user1".into(), FetchOptions::default()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.snapshot().value, Some(stats(9)));
  }

  #[tokio::test]
  async fn test_patch_after_failed_first_fetch_is_dropped() {
    let (store, _calls, _clock) = scripted(vec![Err(eyre!("Network error"))]);

    store.fetch("user1".into(), FetchOptions::default()).await;
    store.patch(&"user1".to_string(), Earned(12));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.value, None);
    assert_eq!(snapshot.error.as_deref(), Some("Network error"));
  }
}
