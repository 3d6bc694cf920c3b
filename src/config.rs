use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Account whose dashboard is shown when --user is not given
  pub user_id: Option<String>,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Seconds a fetched dashboard or payment history stays fresh
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Directory for log files (defaults to the platform data directory)
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_stale_secs() -> u64 {
  60
}

fn default_timeout_secs() -> u64 {
  15
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./taskboard.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/taskboard/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/taskboard/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("taskboard.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("taskboard").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.api_base_url()?;
    Ok(config)
  }

  /// Base URL of the marketplace API, always ending in a slash so relative
  /// endpoint paths join onto it.
  pub fn api_base_url(&self) -> Result<Url> {
    let mut raw = self.api.url.trim().to_string();
    if !raw.ends_with('/') {
      raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| eyre!("Invalid API url {}: {}", self.api.url, e))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!("Unsupported API url scheme: {}", other)),
    }
  }

  /// Staleness window for the account stores, capped at one week.
  pub fn stale_time(&self) -> chrono::Duration {
    const WEEK_SECS: u64 = 7 * 24 * 60 * 60;
    chrono::Duration::seconds(self.stale_secs.min(WEEK_SECS) as i64)
  }

  /// Header title, falling back to the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    self
      .api_base_url()
      .ok()
      .and_then(|url| url.host_str().map(String::from))
      .unwrap_or_else(|| "taskboard".to_string())
  }

  /// Get the API session token from environment variables.
  ///
  /// Checks TASKBOARD_TOKEN first, then TASKBOARD_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("TASKBOARD_TOKEN")
      .or_else(|_| std::env::var("TASKBOARD_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set TASKBOARD_TOKEN or TASKBOARD_API_TOKEN, or run `taskboard login`.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_parse_applies_defaults() {
    let config = Config::parse("api:\n  url: https://api.example.com\n").unwrap();
    assert_eq!(config.stale_secs, 60);
    assert_eq!(config.stale_time(), chrono::Duration::seconds(60));
    assert_eq!(config.api.timeout_secs, 15);
    assert!(config.user_id.is_none());
  }

  #[test]
  fn test_base_url_gets_trailing_slash() {
    let config = Config::parse("api:\n  url: https://api.example.com/v2\n").unwrap();
    let base = config.api_base_url().unwrap();
    assert_eq!(base.as_str(), "https://api.example.com/v2/");
    assert_eq!(
      base.join("api/users/u1").unwrap().as_str(),
      "https://api.example.com/v2/api/users/u1"
    );
  }

  #[test]
  fn test_rejects_non_http_url() {
    assert!(Config::parse("api:\n  url: ftp://files.example.com\n").is_err());
    assert!(Config::parse("api:\n  url: not a url\n").is_err());
  }

  #[test]
  fn test_display_title() {
    let config = Config::parse("api:\n  url: https://api.example.com\n").unwrap();
    assert_eq!(config.display_title(), "api.example.com");

    let config = Config::parse("api:\n  url: https://api.example.com\ntitle: My Tasks\n").unwrap();
    assert_eq!(config.display_title(), "My Tasks");
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "api:\n  url: http://localhost:4000\nuser_id: user-42\nstale_secs: 30"
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.user_id.as_deref(), Some("user-42"));
    assert_eq!(config.stale_secs, 30);
  }

  #[test]
  fn test_load_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/taskboard.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
