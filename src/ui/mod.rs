mod command_overlay;
mod dashboard;
mod format;
mod payments;

use crate::app::{App, Mode, View};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);

  match app.view() {
    View::Dashboard => dashboard::draw_dashboard(frame, chunks[1], &app.dashboard()),
    View::Payments => {
      payments::draw_payments(frame, chunks[1], &app.payments(), app.selected_payment())
    }
  }

  draw_status_bar(frame, chunks[2], app);

  if *app.mode() == Mode::Command {
    command_overlay::draw_command_overlay(
      frame,
      chunks[1],
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    );
  }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let tab = |label: &'static str, active: bool| {
    if active {
      Span::styled(label, Style::default().fg(Color::Black).bg(Color::Cyan))
    } else {
      Span::styled(label, Style::default().fg(Color::DarkGray))
    }
  };

  let header = Line::from(vec![
    Span::styled(" taskboard ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", app.title()), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", app.user_id()),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
    tab(" 1 dashboard ", app.view() == View::Dashboard),
    Span::raw(" "),
    tab(" 2 payments ", app.view() == View::Payments),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (error, loading) = match app.view() {
    View::Dashboard => {
      let snapshot = app.dashboard();
      (snapshot.error, snapshot.is_loading)
    }
    View::Payments => {
      let snapshot = app.payments();
      (snapshot.error, snapshot.is_loading)
    }
  };

  let (content, style) = match (error, loading) {
    (_, true) => (" refreshing...".to_string(), Style::default().fg(Color::Cyan)),
    (Some(error), false) => (
      format!(" ! {}  (r to retry)", error),
      Style::default().fg(Color::Red),
    ),
    (None, false) => (
      " :command  r:refresh  tab:switch  j/k:nav  q:quit".to_string(),
      Style::default().fg(Color::DarkGray),
    ),
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
