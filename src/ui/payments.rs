use crate::market::types::PaymentHistory;
use crate::store::Snapshot;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::format::{kind_color, money, status_color, truncate};

pub fn draw_payments(
  frame: &mut Frame,
  area: Rect,
  snapshot: &Snapshot<PaymentHistory>,
  selected: usize,
) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(3), Constraint::Min(1)])
    .split(area);

  let border = if snapshot.is_stale_with_error() {
    Color::Red
  } else {
    Color::Blue
  };

  let Some(history) = &snapshot.value else {
    let content = if snapshot.is_loading {
      "Loading payments..."
    } else {
      "No payment history yet."
    };
    let paragraph = Paragraph::new(content)
      .block(
        Block::default()
          .title(" Payments ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(border)),
      )
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let summary = &history.summary;
  let totals = Line::from(vec![
    Span::styled(" Earned ", Style::default().fg(Color::DarkGray)),
    Span::styled(money(summary.total_earnings), Style::default().fg(Color::Green)),
    Span::styled("   Paid out ", Style::default().fg(Color::DarkGray)),
    Span::styled(money(summary.total_payouts), Style::default().fg(Color::Yellow)),
    Span::styled("   Balance ", Style::default().fg(Color::DarkGray)),
    Span::styled(
      money(summary.available_balance),
      Style::default().fg(Color::White).bold(),
    ),
  ]);
  frame.render_widget(
    Paragraph::new(totals).block(
      Block::default()
        .title(" Summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border)),
    ),
    chunks[0],
  );

  let block = Block::default()
    .title(format!(" Transactions ({}) ", history.transactions.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  if history.transactions.is_empty() {
    let paragraph = Paragraph::new("No transactions found.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, chunks[1]);
    return;
  }

  let items: Vec<ListItem> = history
    .transactions
    .iter()
    .map(|tx| {
      let status = if tx.status.is_empty() { "-" } else { tx.status.as_str() };
      let line = Line::from(vec![
        Span::styled(
          format!("{:<10}", truncate(&tx.created_at, 10)),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<8}", tx.kind.label()),
          Style::default().fg(kind_color(tx.kind)),
        ),
        Span::raw(" "),
        Span::styled(format!("{:>12}", money(tx.amount)), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
          format!("{:<10}", truncate(status, 10)),
          Style::default().fg(status_color(status)),
        ),
        Span::raw(" "),
        Span::raw(truncate(&tx.description, 50)),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));

  frame.render_stateful_widget(list, chunks[1], &mut state);
}
