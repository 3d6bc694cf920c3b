//! Dashboard and payment stores for one account.

use chrono::Duration;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::store::{CacheStore, Clock, FetchOptions, Patch};

use super::client::MarketClient;
use super::types::{DashboardStats, PaymentHistory, PaymentSummary};

/// Lifetime earnings as the payment history reports them, which can be more
/// recent than the dashboard endpoint's figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarningsPatch {
  pub total_earnings: f64,
}

impl From<&PaymentSummary> for EarningsPatch {
  fn from(summary: &PaymentSummary) -> Self {
    Self {
      total_earnings: summary.total_earnings,
    }
  }
}

impl Patch<DashboardStats> for EarningsPatch {
  fn apply(self, target: &mut DashboardStats) {
    target.total_earnings = self.total_earnings;
  }
}

/// Last earnings published by the payments store, with the user they belong to
type LatestEarnings = Arc<Mutex<Option<(String, EarningsPatch)>>>;

#[derive(Clone)]
pub struct MarketStores {
  pub dashboard: CacheStore<String, DashboardStats>,
  pub payments: CacheStore<String, PaymentHistory>,
  latest_earnings: LatestEarnings,
}

impl MarketStores {
  /// Build both stores on top of `client`.
  pub fn new(client: MarketClient, stale_time: Duration, clock: Arc<dyn Clock>) -> Self {
    let dashboard_client = client.clone();
    let dashboard = CacheStore::new("dashboard", move |user_id: String| {
      let client = dashboard_client.clone();
      async move { client.dashboard_stats(&user_id).await }
    })
    .with_stale_time(stale_time)
    .with_clock(Arc::clone(&clock));

    let payments = CacheStore::new("payments", move |user_id: String| {
      let client = client.clone();
      async move { client.payment_history(&user_id).await }
    })
    .with_stale_time(stale_time)
    .with_clock(clock);

    Self::connect(dashboard, payments)
  }

  /// Wire the payments store to keep the dashboard's earnings current.
  fn connect(
    dashboard: CacheStore<String, DashboardStats>,
    payments: CacheStore<String, PaymentHistory>,
  ) -> Self {
    let latest_earnings = LatestEarnings::default();

    let target = dashboard.clone();
    let latest = Arc::clone(&latest_earnings);
    payments.subscribe(move |user_id: &String, history: &PaymentHistory| {
      let earnings = EarningsPatch::from(&history.summary);
      *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some((user_id.clone(), earnings));
      debug!(%user_id, "patching dashboard earnings from payment history");
      target.patch(user_id, earnings);
      Ok(())
    });

    Self {
      dashboard,
      payments,
      latest_earnings,
    }
  }

  /// Fetch both resources for `user_id` concurrently.
  ///
  /// Whichever request lands first, the dashboard ends up carrying the
  /// payment history's earnings for the same user.
  pub async fn refresh(&self, user_id: &str, options: FetchOptions) {
    futures::join!(
      self.dashboard.fetch(user_id.to_string(), options),
      self.payments.fetch(user_id.to_string(), options)
    );
    self.reapply_earnings(user_id);
  }

  /// Patch the last published earnings back in, in case a dashboard response
  /// committed after them.
  fn reapply_earnings(&self, user_id: &str) {
    let latest = self
      .latest_earnings
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();

    if let Some((owner, earnings)) = latest.filter(|(owner, _)| owner == user_id) {
      self.dashboard.patch(&owner, earnings);
    }
  }
}
