use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::market::types::TransactionKind;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format a currency amount with two decimals and thousands separators
pub fn money(amount: f64) -> String {
  let sign = if amount < 0.0 { "-" } else { "" };
  let cents = (amount.abs() * 100.0).round() as u64;
  let whole = (cents / 100).to_string();

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, c) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }

  format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Short human description of how long ago `at` was
pub fn age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - at).num_seconds().max(0);
  match secs {
    0..=4 => "just now".to_string(),
    5..=59 => format!("{}s ago", secs),
    60..=3599 => format!("{}m ago", secs / 60),
    _ => format!("{}h ago", secs / 3600),
  }
}

/// Get the display color for a transaction kind
pub fn kind_color(kind: TransactionKind) -> Color {
  match kind {
    TransactionKind::Earning => Color::Green,
    TransactionKind::Payout => Color::Yellow,
  }
}

/// Get the display color for a payment status
pub fn status_color(status: &str) -> Color {
  match status.to_lowercase().as_str() {
    "completed" | "released" | "paid" => Color::Green,
    "pending" | "processing" | "held" => Color::Yellow,
    "failed" | "cancelled" | "refunded" => Color::Red,
    _ => Color::White,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("café au lait", 7), "café...");
  }

  #[test]
  fn test_money() {
    assert_eq!(money(0.0), "$0.00");
    assert_eq!(money(12.5), "$12.50");
    assert_eq!(money(1234567.891), "$1,234,567.89");
    assert_eq!(money(-40.0), "-$40.00");
    assert_eq!(money(999.999), "$1,000.00");
  }

  #[test]
  fn test_age() {
    let now = Utc::now();
    assert_eq!(age(now, now), "just now");
    assert_eq!(age(now - Duration::seconds(30), now), "30s ago");
    assert_eq!(age(now - Duration::seconds(125), now), "2m ago");
    assert_eq!(age(now - Duration::hours(3), now), "3h ago");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color("Completed"), Color::Green);
    assert_eq!(status_color("pending"), Color::Yellow);
    assert_eq!(status_color("failed"), Color::Red);
    assert_eq!(status_color(""), Color::White);
  }
}
