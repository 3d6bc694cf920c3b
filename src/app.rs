use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::market::types::{DashboardStats, PaymentHistory};
use crate::market::MarketStores;
use crate::store::{FetchOptions, Snapshot};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Ticks between background revalidation attempts (5s at the 250ms tick rate).
/// The stores' staleness window decides whether a request is actually made.
const REVALIDATE_TICKS: u32 = 20;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Which screen is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
  Dashboard,
  Payments,
}

/// Main application state
pub struct App {
  view: View,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Selected row in the payments list
  selected_payment: usize,

  title: String,

  user_id: String,

  stores: MarketStores,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  ticks_since_revalidate: u32,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, user_id: String, stores: MarketStores) -> Self {
    let (tx, _rx) = mpsc::unbounded_channel();

    Self {
      view: View::Dashboard,
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      selected_payment: 0,
      title: config.display_title(),
      user_id,
      stores,
      event_tx: tx,
      ticks_since_revalidate: 0,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Initial data load
    self.refresh(FetchOptions::default());

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  /// Fetch both stores in the background.
  fn refresh(&self, options: FetchOptions) {
    let stores = self.stores.clone();
    let user_id = self.user_id.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      stores.refresh(&user_id, options).await;
      let _ = tx.send(Event::Refreshed);
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        self.ticks_since_revalidate += 1;
        if self.ticks_since_revalidate >= REVALIDATE_TICKS {
          self.ticks_since_revalidate = 0;
          self.refresh(FetchOptions::default());
        }
      }
      Event::Refreshed => self.clamp_selection(),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      KeyCode::Char('r') => {
        info!("manual refresh requested");
        self.refresh(FetchOptions::forced());
      }
      KeyCode::Tab => {
        self.view = match self.view {
          View::Dashboard => View::Payments,
          View::Payments => View::Dashboard,
        };
      }
      KeyCode::Char('1') => self.view = View::Dashboard,
      KeyCode::Char('2') => self.view = View::Payments,

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),

      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    let suggestions = commands::get_suggestions(&self.command_input);
    let name = suggestions
      .get(self.selected_suggestion)
      .map(|cmd| cmd.name)
      .unwrap_or("");

    match name {
      "dashboard" => self.view = View::Dashboard,
      "payments" => self.view = View::Payments,
      "refresh" => self.refresh(FetchOptions::forced()),
      "quit" => self.should_quit = true,
      _ => {}
    }
    self.command_input.clear();
  }

  fn move_selection(&mut self, delta: i32) {
    if self.view != View::Payments {
      return;
    }
    let len = self.payment_count();
    if len > 0 {
      self.selected_payment = (self.selected_payment as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  fn clamp_selection(&mut self) {
    let len = self.payment_count();
    if self.selected_payment >= len {
      self.selected_payment = len.saturating_sub(1);
    }
  }

  fn payment_count(&self) -> usize {
    self
      .stores
      .payments
      .snapshot()
      .value
      .map(|history| history.transactions.len())
      .unwrap_or(0)
  }

  // Accessors for UI rendering
  pub fn view(&self) -> View {
    self.view
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  pub fn dashboard(&self) -> Snapshot<DashboardStats> {
    self.stores.dashboard.snapshot()
  }

  pub fn payments(&self) -> Snapshot<PaymentHistory> {
    self.stores.payments.snapshot()
  }

  pub fn selected_payment(&self) -> usize {
    self.selected_payment
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}
