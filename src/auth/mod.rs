//! Phone/OTP login sequence.
//!
//! The login progresses through explicit phases:
//! `SignedOut -> PhoneSubmitted -> OtpVerifying -> SessionEstablished -> ProfileLoaded`.
//! Every step takes the backend as an argument and checks the current phase,
//! so a profile fetch can never run ahead of the session it depends on.

pub mod validate;

use color_eyre::{eyre::bail, Result};
use std::future::Future;
use tracing::{debug, info};

use crate::market::types::{Profile, Session};

/// Remote operations the login sequence needs.
pub trait AuthBackend: Send + Sync {
  fn send_otp(&self, phone: &str) -> impl Future<Output = Result<()>> + Send;

  fn verify_otp(&self, phone: &str, code: &str) -> impl Future<Output = Result<Session>> + Send;

  fn fetch_profile(&self, session: &Session) -> impl Future<Output = Result<Profile>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthPhase {
  #[default]
  SignedOut,
  PhoneSubmitted {
    phone: String,
  },
  OtpVerifying {
    phone: String,
  },
  SessionEstablished {
    session: Session,
  },
  ProfileLoaded {
    session: Session,
    profile: Profile,
  },
}

impl AuthPhase {
  pub fn label(&self) -> &'static str {
    match self {
      Self::SignedOut => "signed out",
      Self::PhoneSubmitted { .. } => "waiting for code",
      Self::OtpVerifying { .. } => "verifying code",
      Self::SessionEstablished { .. } => "session established",
      Self::ProfileLoaded { .. } => "signed in",
    }
  }

  /// The backend session, once one exists. Profile data may only be
  /// requested when this is `Some`.
  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::SessionEstablished { session } | Self::ProfileLoaded { session, .. } => Some(session),
      _ => None,
    }
  }
}

/// Drives one login attempt through its phases.
#[derive(Debug, Default)]
pub struct LoginFlow {
  phase: AuthPhase,
}

impl LoginFlow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn phase(&self) -> &AuthPhase {
    &self.phase
  }

  /// Validate the phone number and ask the backend to send a code.
  ///
  /// Allowed while signed out or to resend a code.
  pub async fn submit_phone<B: AuthBackend>(&mut self, backend: &B, raw_phone: &str) -> Result<()> {
    if !matches!(
      self.phase,
      AuthPhase::SignedOut | AuthPhase::PhoneSubmitted { .. }
    ) {
      bail!("Cannot submit a phone number while {}", self.phase.label());
    }
    if !validate::is_valid_phone(raw_phone) {
      bail!("Invalid phone number: {}", raw_phone);
    }

    let phone = validate::normalize_phone(raw_phone);
    backend.send_otp(&phone).await?;
    info!("one-time code sent");

    self.phase = AuthPhase::PhoneSubmitted { phone };
    Ok(())
  }

  /// Exchange the one-time code for a backend session.
  ///
  /// A rejected code returns the flow to `PhoneSubmitted` so the user can
  /// try again.
  pub async fn verify_otp<B: AuthBackend>(&mut self, backend: &B, code: &str) -> Result<Session> {
    let phone = match &self.phase {
      AuthPhase::PhoneSubmitted { phone } => phone.clone(),
      other => bail!("Cannot verify a code while {}", other.label()),
    };
    let code = code.trim();
    if !validate::is_valid_otp(code) {
      bail!("One-time code must be 6 digits");
    }

    self.phase = AuthPhase::OtpVerifying {
      phone: phone.clone(),
    };
    match backend.verify_otp(&phone, code).await {
      Ok(session) => {
        info!(user_id = %session.user_id, "session established");
        self.phase = AuthPhase::SessionEstablished {
          session: session.clone(),
        };
        Ok(session)
      }
      Err(e) => {
        self.phase = AuthPhase::PhoneSubmitted { phone };
        Err(e)
      }
    }
  }

  /// Load the account profile.
  ///
  /// Returns `None` without contacting the backend when no session exists
  /// yet. A failed fetch leaves the session in place for a retry.
  pub async fn load_profile<B: AuthBackend>(&mut self, backend: &B) -> Result<Option<Profile>> {
    if let AuthPhase::ProfileLoaded { profile, .. } = &self.phase {
      return Ok(Some(profile.clone()));
    }
    let Some(session) = self.phase.session().cloned() else {
      debug!(phase = self.phase.label(), "profile fetch deferred");
      return Ok(None);
    };

    let profile = backend.fetch_profile(&session).await?;
    self.phase = AuthPhase::ProfileLoaded {
      session,
      profile: profile.clone(),
    };
    Ok(Some(profile))
  }
}
