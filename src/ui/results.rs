use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Paragraph, Widget},
};

use super::{ACCENT, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::results::ResultsView;

pub fn render(view: &ResultsView, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(2), // title
            Constraint::Length(1), // speed
            Constraint::Length(2), // unit
            Constraint::Length(2), // taps
            Constraint::Length(2), // message
            Constraint::Length(1), // best
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("Time's Up!", bold))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!("{:.1}", view.result.speed),
        bold.fg(ACCENT),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled("taps/sec", Style::default().fg(Color::Gray)))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(format!(
        "{} taps in {}s",
        view.result.tap_count, view.result.duration
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    let message_style = if view.is_new_high_score {
        bold.fg(Color::Yellow)
    } else {
        italic.fg(Color::Cyan)
    };
    Paragraph::new(Span::styled(view.motivational_message(), message_style))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    Paragraph::new(Span::styled(
        format!("🏆 Best: {:.1} taps/sec", view.high_score),
        bold.fg(Color::Yellow),
    ))
    .alignment(Alignment::Center)
    .render(chunks[6], buf);

    Paragraph::new(Span::styled("(r)etry / (h)ome / (esc)ape", italic)).render(chunks[8], buf);
}
