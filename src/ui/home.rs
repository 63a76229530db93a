use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::{ACCENT, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::{app::App, session::GameMode, store::KeyValueStore};

pub fn render<K: KeyValueStore>(app: &App<K>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1), // title
            Constraint::Length(2), // subtitle
            Constraint::Length(2), // modes
            Constraint::Length(2), // best
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("tapr", bold.fg(ACCENT)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "How fast can you tap?",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let modes = GameMode::ALL
        .iter()
        .flat_map(|&mode| {
            let label = format!(" {mode}s ");
            let span = if mode == app.mode {
                Span::styled(label, bold.fg(Color::White).bg(ACCENT))
            } else {
                Span::styled(label, Style::default().add_modifier(Modifier::DIM))
            };
            [span, Span::raw("  ")]
        })
        .collect::<Vec<_>>();
    Paragraph::new(Line::from(modes))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    let best = if app.high_score > 0.0 {
        format!("🏆 Best: {:.1} taps/sec", app.high_score)
    } else {
        "🏆 Best: No record yet".to_string()
    };
    Paragraph::new(Span::styled(best, bold.fg(Color::Yellow)))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    Paragraph::new(Span::styled(
        "(←/→) length / (enter) start / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[6], buf);
}
