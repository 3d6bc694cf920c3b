use crate::market::types::DashboardStats;
use crate::store::Snapshot;
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::format::{age, money};

pub fn draw_dashboard(frame: &mut Frame, area: Rect, snapshot: &Snapshot<DashboardStats>) {
  let title = match snapshot.last_fetched_at {
    Some(at) => format!(" Dashboard (updated {}) ", age(at, Utc::now())),
    None if snapshot.is_loading => " Dashboard (loading...) ".to_string(),
    None => " Dashboard ".to_string(),
  };

  let border = if snapshot.is_stale_with_error() {
    Color::Red
  } else {
    Color::Blue
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  // Last good value stays on screen after a failed refresh
  let Some(stats) = &snapshot.value else {
    let content = if snapshot.is_loading {
      "Loading dashboard..."
    } else {
      "No data yet. Press r to load."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let lines = vec![
    section("Tasks"),
    row("Total", stats.total_tasks.to_string()),
    row("Active", stats.active_tasks.to_string()),
    row("Completed", stats.completed_tasks.to_string()),
    row("Posted", stats.posted_tasks.to_string()),
    Line::raw(""),
    section("Money"),
    row("Earned", money(stats.total_earnings)),
    row("Spent", money(stats.total_spent)),
    row("Pending", money(stats.pending_payments)),
    Line::raw(""),
    section("Reputation"),
    row(
      "Rating",
      format!("{:.1} ({} reviews)", stats.average_rating, stats.review_count),
    ),
  ];

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn section(label: &'static str) -> Line<'static> {
  Line::styled(
    format!(" {}", label),
    Style::default().fg(Color::Cyan).bold(),
  )
}

fn row(label: &'static str, value: String) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("   {:<12}", label), Style::default().fg(Color::DarkGray)),
    Span::styled(value, Style::default().fg(Color::White)),
  ])
}
