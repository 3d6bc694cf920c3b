//! Serde-deserializable types matching marketplace API responses.
//!
//! These types are separate from domain types so the loosely-shaped payloads
//! (optional fields, numbers sent as strings, `_id` vs `id`) are absorbed here
//! and the rest of the crate only sees the normalized records.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::store::Normalize;

use super::types::{
  DashboardStats, PaymentHistory, PaymentSummary, Profile, Session, Transaction, TransactionKind,
};

/// Responses arrive either bare or wrapped in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
  Wrapped { data: T },
  Bare(T),
}

impl<T> Envelope<T> {
  pub fn into_inner(self) -> T {
    match self {
      Self::Wrapped { data } => data,
      Self::Bare(data) => data,
    }
  }
}

/// Error body returned with non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
  pub error: Option<String>,
}

impl ApiErrorBody {
  pub fn into_message(self) -> Option<String> {
    self
      .message
      .or(self.error)
      .filter(|m| !m.trim().is_empty())
  }
}

// ============================================================================
// Lenient scalar decoding
// ============================================================================

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.and_then(|v| match v {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.and_then(|v| match v {
    Value::Number(n) => n
      .as_u64()
      .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.and_then(|v| match v {
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }))
}

// ============================================================================
// Dashboard stats endpoint response
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDashboardStats {
  #[serde(default, deserialize_with = "lenient_u64")]
  pub total_tasks: Option<u64>,
  #[serde(default, deserialize_with = "lenient_u64")]
  pub active_tasks: Option<u64>,
  #[serde(default, deserialize_with = "lenient_u64")]
  pub completed_tasks: Option<u64>,
  #[serde(default, deserialize_with = "lenient_u64")]
  pub posted_tasks: Option<u64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub total_earnings: Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub total_spent: Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub pending_payments: Option<f64>,
  #[serde(default, alias = "rating", deserialize_with = "lenient_f64")]
  pub average_rating: Option<f64>,
  #[serde(default, alias = "totalReviews", deserialize_with = "lenient_u64")]
  pub review_count: Option<u64>,
}

impl Normalize for ApiDashboardStats {
  type Record = DashboardStats;

  fn normalize(self) -> DashboardStats {
    DashboardStats {
      total_tasks: self.total_tasks.unwrap_or(0),
      active_tasks: self.active_tasks.unwrap_or(0),
      completed_tasks: self.completed_tasks.unwrap_or(0),
      posted_tasks: self.posted_tasks.unwrap_or(0),
      total_earnings: self.total_earnings.unwrap_or(0.0),
      total_spent: self.total_spent.unwrap_or(0.0),
      pending_payments: self.pending_payments.unwrap_or(0.0),
      average_rating: self.average_rating.unwrap_or(0.0),
      review_count: self.review_count.unwrap_or(0),
    }
  }
}

// ============================================================================
// Payment history endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTransaction {
  #[serde(default, alias = "_id", deserialize_with = "lenient_string")]
  pub id: Option<String>,
  #[serde(rename = "type", default)]
  pub kind: Option<String>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub amount: Option<f64>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default, alias = "task", deserialize_with = "lenient_string")]
  pub task_id: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
}

/// Map the many spellings the API uses onto the two canonical kinds.
/// Unrecognised values fall back to the sign of the amount.
fn transaction_kind(raw: Option<&str>, amount: f64) -> TransactionKind {
  match raw.map(|k| k.trim().to_lowercase()).as_deref() {
    Some("payout" | "withdrawal" | "debit") => TransactionKind::Payout,
    Some("earning" | "payment" | "credit" | "release") => TransactionKind::Earning,
    _ if amount < 0.0 => TransactionKind::Payout,
    _ => TransactionKind::Earning,
  }
}

impl Normalize for ApiTransaction {
  type Record = Transaction;

  fn normalize(self) -> Transaction {
    let amount = self.amount.unwrap_or(0.0);
    Transaction {
      id: self.id.unwrap_or_default(),
      kind: transaction_kind(self.kind.as_deref(), amount),
      amount: amount.abs(),
      status: self.status.unwrap_or_default(),
      description: self.description.unwrap_or_default(),
      task_id: self.task_id.filter(|t| !t.is_empty()),
      created_at: self.created_at.unwrap_or_default(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPaymentSummary {
  #[serde(default, deserialize_with = "lenient_f64")]
  pub total_earnings: Option<f64>,
  #[serde(default, alias = "totalWithdrawn", deserialize_with = "lenient_f64")]
  pub total_payouts: Option<f64>,
  #[serde(default, alias = "balance", deserialize_with = "lenient_f64")]
  pub available_balance: Option<f64>,
}

impl Normalize for ApiPaymentSummary {
  type Record = PaymentSummary;

  fn normalize(self) -> PaymentSummary {
    PaymentSummary {
      total_earnings: self.total_earnings.unwrap_or(0.0),
      total_payouts: self.total_payouts.unwrap_or(0.0),
      available_balance: self.available_balance.unwrap_or(0.0),
    }
  }
}

/// Payment history arrives either as a bare transaction list or as an object
/// with an optional summary.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiPaymentHistory {
  List(Vec<ApiTransaction>),
  Detailed {
    #[serde(default, alias = "payments")]
    transactions: Vec<ApiTransaction>,
    #[serde(default)]
    summary: Option<ApiPaymentSummary>,
  },
}

impl Normalize for ApiPaymentHistory {
  type Record = PaymentHistory;

  fn normalize(self) -> PaymentHistory {
    let (transactions, summary) = match self {
      Self::List(transactions) => (transactions, None),
      Self::Detailed {
        transactions,
        summary,
      } => (transactions, summary),
    };

    let transactions: Vec<Transaction> = transactions.into_iter().map(Normalize::normalize).collect();
    let summary = match summary {
      Some(summary) => summary.normalize(),
      None => PaymentSummary::from_transactions(&transactions),
    };

    PaymentHistory {
      transactions,
      summary,
    }
  }
}

// ============================================================================
// Auth endpoint responses
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProfile {
  #[serde(default, alias = "_id", deserialize_with = "lenient_string")]
  pub id: Option<String>,
  #[serde(default, alias = "fullName")]
  pub name: Option<String>,
  #[serde(default, alias = "phoneNumber")]
  pub phone: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub role: Option<String>,
}

impl Normalize for ApiProfile {
  type Record = Profile;

  fn normalize(self) -> Profile {
    Profile {
      id: self.id.unwrap_or_default(),
      name: self.name.unwrap_or_default(),
      phone: self.phone.unwrap_or_default(),
      email: self.email.filter(|e| !e.is_empty()),
      role: self.role.unwrap_or_else(|| "poster".to_string()),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSession {
  #[serde(alias = "accessToken")]
  pub token: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub user_id: Option<String>,
  #[serde(default)]
  pub user: Option<ApiProfile>,
}

impl Normalize for ApiSession {
  type Record = Session;

  fn normalize(self) -> Session {
    let user_id = self
      .user_id
      .or_else(|| self.user.and_then(|u| u.id))
      .unwrap_or_default();

    Session {
      token: self.token,
      user_id,
    }
  }
}
