use color_eyre::{
  eyre::{bail, eyre},
  Result,
};
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::auth::{validate, AuthBackend};
use crate::config::Config;
use crate::store::Normalize;

use super::api_types::{
  ApiDashboardStats, ApiErrorBody, ApiPaymentHistory, ApiProfile, ApiSession, Envelope,
};
use super::types::{DashboardStats, PaymentHistory, Profile, Session};

/// Marketplace REST API client
#[derive(Clone)]
pub struct MarketClient {
  http: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl MarketClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = config.api_base_url()?;
    let token = Config::get_api_token().ok();
    Self::build(base, token, Duration::from_secs(config.api.timeout_secs))
  }

  fn build(base: Url, token: Option<String>, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("taskboard/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base, token })
  }

  /// Use `token` for subsequent requests.
  pub fn with_token(mut self, token: impl Into<String>) -> Self {
    self.token = Some(token.into());
    self
  }

  /// Dashboard counters for a user
  pub async fn dashboard_stats(&self, user_id: &str) -> Result<DashboardStats> {
    let path = format!("api/users/{}/dashboard-stats", user_segment(user_id)?);
    let stats: ApiDashboardStats = self.request(Method::GET, &path, None::<()>).await?;
    Ok(stats.normalize())
  }

  /// Payment history and totals for a user
  pub async fn payment_history(&self, user_id: &str) -> Result<PaymentHistory> {
    let path = format!("api/payments/history/{}", user_segment(user_id)?);
    let history: ApiPaymentHistory = self.request(Method::GET, &path, None::<()>).await?;
    Ok(history.normalize())
  }

  async fn request<B, P>(&self, method: Method, path: &str, body: Option<B>) -> Result<P>
  where
    B: Serialize,
    P: DeserializeOwned,
  {
    let url = self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))?;

    let mut request = self.http.request(method.clone(), url);
    if let Some(body) = body {
      request = request.json(&body);
    }

    debug!(%method, path, "sending request");
    self.send(request).await
  }

  async fn send<P: DeserializeOwned>(&self, request: RequestBuilder) -> Result<P> {
    let request = match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    };

    let response = request.send().await.map_err(|e| {
      if e.is_timeout() {
        eyre!("Request timed out")
      } else {
        eyre!("Network error: {}", e)
      }
    })?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read response: {}", e))?;

    if !status.is_success() {
      let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
      bail!(message);
    }

    // Some endpoints answer with an empty body
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    let envelope: Envelope<P> =
      serde_json::from_str(text).map_err(|e| eyre!("Failed to decode response: {}", e))?;
    Ok(envelope.into_inner())
  }
}

/// A user id that is safe to place in a URL path.
fn user_segment(user_id: &str) -> Result<&str> {
  if validate::is_valid_user_id(user_id) {
    Ok(user_id.trim())
  } else {
    Err(eyre!("Invalid user id: {:?}", user_id))
  }
}

impl AuthBackend for MarketClient {
  async fn send_otp(&self, phone: &str) -> Result<()> {
    let _: serde_json::Value = self
      .request(Method::POST, "api/auth/otp/send", Some(json!({ "phone": phone })))
      .await?;
    Ok(())
  }

  async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session> {
    let session: ApiSession = self
      .request(
        Method::POST,
        "api/auth/otp/verify",
        Some(json!({ "phone": phone, "code": code })),
      )
      .await?;
    Ok(session.normalize())
  }

  async fn fetch_profile(&self, session: &Session) -> Result<Profile> {
    let client = self.clone().with_token(session.token.clone());
    let profile: ApiProfile = client
      .request(Method::GET, "api/users/me", None::<()>)
      .await?;
    Ok(profile.normalize())
  }
}
