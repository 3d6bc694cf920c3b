use crate::commands::Command;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 6;

/// Command palette anchored to the bottom of `area`, growing upwards.
pub fn draw_command_overlay(
  frame: &mut Frame,
  area: Rect,
  input: &str,
  suggestions: &[&Command],
  selected_suggestion: usize,
) {
  let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;
  // borders + input line + suggestions
  let height = (3 + shown).min(area.height);
  let width = area.width.saturating_sub(2).min(56);
  let palette = Rect::new(
    area.x + 1,
    area.y + area.height.saturating_sub(height),
    width,
    height,
  )
  .intersection(area);

  frame.render_widget(Clear, palette);

  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow))
    .title(" Command ")
    .title_bottom(Line::from(" Tab next  Enter run  Esc close ").right_aligned());
  let inner = block.inner(palette);
  frame.render_widget(block, palette);

  let [suggestion_area, input_area] =
    Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

  frame.render_widget(
    Paragraph::new(Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(input),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ])),
    input_area,
  );

  if shown == 0 || suggestion_area.height == 0 {
    return;
  }

  let items: Vec<ListItem> = suggestions
    .iter()
    .take(MAX_SUGGESTIONS)
    .map(|cmd| suggestion_line(cmd))
    .map(ListItem::new)
    .collect();

  let mut state = ListState::default().with_selected(Some(selected_suggestion.min(MAX_SUGGESTIONS - 1)));
  frame.render_stateful_widget(
    List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White)),
    suggestion_area,
    &mut state,
  );
}

fn suggestion_line(cmd: &Command) -> Line<'static> {
  let mut spans = vec![Span::styled(
    format!("{:<11}", cmd.name),
    Style::default().fg(Color::Cyan),
  )];
  if !cmd.aliases.is_empty() {
    spans.push(Span::styled(
      format!("({}) ", cmd.aliases.join(", ")),
      Style::default().fg(Color::Gray),
    ));
  }
  spans.push(Span::styled(cmd.description, Style::default().fg(Color::DarkGray)));
  Line::from(spans)
}
