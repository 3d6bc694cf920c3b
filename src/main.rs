mod app;
mod auth;
mod commands;
mod config;
mod event;
mod logging;
mod market;
mod store;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::{
  eyre::{bail, eyre},
  Result,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use auth::{validate, LoginFlow};
use market::{MarketClient, MarketStores};
use store::SystemClock;

/// Wrong codes tolerated before the login command gives up
const MAX_CODE_ATTEMPTS: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(about = "A terminal dashboard for task marketplace accounts")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/taskboard/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Account id to show (overrides user_id in config)
  #[arg(short, long)]
  user: Option<String>,

  #[command(subcommand)]
  command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Show the account dashboard (default)
  Dashboard,
  /// Sign in with a phone number and one-time code
  Login {
    /// Phone number in international format, e.g. +15551234567
    #[arg(long)]
    phone: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(config.log_dir.as_deref())?;

  let client = MarketClient::new(&config)?;

  match args.command.unwrap_or(Cmd::Dashboard) {
    Cmd::Dashboard => {
      let user_id = args
        .user
        .or_else(|| config.user_id.clone())
        .ok_or_else(|| eyre!("No account selected. Pass --user or set user_id in the config file."))?;
      if !validate::is_valid_user_id(&user_id) {
        bail!("Invalid user id: {:?}", user_id);
      }

      let stores = MarketStores::new(client, config.stale_time(), Arc::new(SystemClock));
      let mut app = app::App::new(&config, user_id.trim().to_string(), stores);
      app.run().await?;
    }
    Cmd::Login { phone } => login(&client, &phone).await?,
  }

  Ok(())
}

async fn login(client: &MarketClient, phone: &str) -> Result<()> {
  let mut flow = LoginFlow::new();
  flow.submit_phone(client, phone).await?;
  println!("A one-time code was sent to {}.", validate::normalize_phone(phone));

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut attempts = 0;
  let session = loop {
    print!("Code: ");
    std::io::stdout().flush()?;

    let Some(code) = lines.next_line().await? else {
      bail!("No code entered");
    };
    match flow.verify_otp(client, &code).await {
      Ok(session) => break session,
      Err(e) => {
        attempts += 1;
        if attempts >= MAX_CODE_ATTEMPTS {
          return Err(e);
        }
        eprintln!("{}", e);
      }
    }
  };

  let mut user_id = session.user_id.clone();
  match flow.load_profile(client).await? {
    Some(profile) => {
      let name = if profile.name.is_empty() { &profile.phone } else { &profile.name };
      println!("Signed in as {} ({})", name, profile.role);
      if let Some(email) = &profile.email {
        println!("Email: {}", email);
      }
      if !profile.id.is_empty() {
        user_id = profile.id;
      }
    }
    None => println!("Signed in"),
  }
  info!(phase = flow.phase().label(), "login finished");
  println!();
  println!("export TASKBOARD_TOKEN={}", session.token);
  println!("user_id: {}", user_id);

  Ok(())
}
