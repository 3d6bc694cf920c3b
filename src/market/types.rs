//! Normalized records. Tests serialize them to check that normalizing a
//! record's own JSON gives the record back.

/// Account-level counters shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize), serde(rename_all = "camelCase"))]
pub struct DashboardStats {
  pub total_tasks: u64,
  pub active_tasks: u64,
  pub completed_tasks: u64,
  pub posted_tasks: u64,
  pub total_earnings: f64,
  pub total_spent: f64,
  pub pending_payments: f64,
  pub average_rating: f64,
  pub review_count: u64,
}

/// Direction of a payment relative to the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum TransactionKind {
  /// Money released to the account for completed work
  Earning,
  /// Money withdrawn from the account
  Payout,
}

impl TransactionKind {
  pub fn label(self) -> &'static str {
    match self {
      Self::Earning => "earning",
      Self::Payout => "payout",
    }
  }
}

/// A single payment history entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize), serde(rename_all = "camelCase"))]
pub struct Transaction {
  pub id: String,
  #[cfg_attr(test, serde(rename = "type"))]
  pub kind: TransactionKind,
  /// Always a magnitude; direction lives in `kind`
  pub amount: f64,
  pub status: String,
  pub description: String,
  pub task_id: Option<String>,
  pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize), serde(rename_all = "camelCase"))]
pub struct PaymentSummary {
  pub total_earnings: f64,
  pub total_payouts: f64,
  pub available_balance: f64,
}

impl PaymentSummary {
  /// Derive totals from the transactions themselves.
  pub fn from_transactions(transactions: &[Transaction]) -> Self {
    let (earnings, payouts) =
      transactions
        .iter()
        .fold((0.0, 0.0), |(earned, paid), tx| match tx.kind {
          TransactionKind::Earning => (earned + tx.amount, paid),
          TransactionKind::Payout => (earned, paid + tx.amount),
        });

    Self {
      total_earnings: earnings,
      total_payouts: payouts,
      available_balance: earnings - payouts,
    }
  }
}

/// Payment history with its summary totals
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct PaymentHistory {
  pub transactions: Vec<Transaction>,
  pub summary: PaymentSummary,
}

/// Authenticated backend session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub token: String,
  pub user_id: String,
}

/// Account profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
  pub id: String,
  pub name: String,
  pub phone: String,
  pub email: Option<String>,
  pub role: String,
}
