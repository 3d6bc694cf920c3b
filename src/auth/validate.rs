//! Input checks applied before anything is sent to the backend.

/// Strip the separators people type into phone numbers.
pub fn normalize_phone(raw: &str) -> String {
  raw
    .chars()
    .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
    .collect()
}

/// E.164: a `+`, then 8 to 15 digits, the first of which is not zero.
pub fn is_valid_phone(raw: &str) -> bool {
  let phone = normalize_phone(raw);
  let Some(digits) = phone.strip_prefix('+') else {
    return false;
  };
  (8..=15).contains(&digits.len())
    && digits.chars().all(|c| c.is_ascii_digit())
    && !digits.starts_with('0')
}

/// One-time codes are exactly six ASCII digits.
pub fn is_valid_otp(code: &str) -> bool {
  code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

/// Ids go into URL paths verbatim, so nothing that a URL parser would
/// decode or treat as a separator is allowed.
pub fn is_valid_user_id(user_id: &str) -> bool {
  let trimmed = user_id.trim();
  !trimmed.is_empty()
    && !trimmed
      .chars()
      .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '%'))
    && trimmed != "."
    && trimmed != ".."
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_phone() {
    assert_eq!(normalize_phone("+1 (555) 123-4567"), "+15551234567");
  }

  #[test]
  fn test_valid_phones() {
    assert!(is_valid_phone("+15551234567"));
    assert!(is_valid_phone("+44 20 7946 0958"));
    assert!(is_valid_phone("+91-98765-43210"));
  }

  #[test]
  fn test_invalid_phones() {
    assert!(!is_valid_phone("5551234567"));
    assert!(!is_valid_phone("+0551234567"));
    assert!(!is_valid_phone("+1234567"));
    assert!(!is_valid_phone("+1234567890123456"));
    assert!(!is_valid_phone("+1555abc4567"));
    assert!(!is_valid_phone(""));
  }

  #[test]
  fn test_otp() {
    assert!(is_valid_otp("012345"));
    assert!(!is_valid_otp("12345"));
    assert!(!is_valid_otp("1234567"));
    assert!(!is_valid_otp("12a456"));
  }

  #[test]
  fn test_user_id() {
    assert!(is_valid_user_id("64f1c2a9e1b2"));
    assert!(is_valid_user_id(" user-1 "));
    assert!(!is_valid_user_id(""));
    assert!(!is_valid_user_id("   "));
    assert!(!is_valid_user_id("a/b"));
    assert!(!is_valid_user_id("a b"));
    assert!(!is_valid_user_id(".."));
  }

  #[test]
  fn test_user_id_rejects_percent_encoding() {
    assert!(!is_valid_user_id("%2e%2e"));
    assert!(!is_valid_user_id("user%2Fother"));
    assert!(!is_valid_user_id("50%"));
  }
}
