use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};

use super::{centered_rect, ACCENT, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::{
    ads::{AdProvider, AdUnit},
    controller::{GameController, Phase},
    navigation::Navigator,
};

pub fn render<A: AdProvider, N: Navigator>(
    game: &GameController<A, N>,
    area: Rect,
    buf: &mut Buffer,
) {
    let session = game.session();
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // clock and taps
            Constraint::Length(2), // instructions
            Constraint::Min(3),    // tap pad
            Constraint::Length(1), // padding
            Constraint::Length(1), // progress
        ])
        .split(area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);
    Paragraph::new(Span::styled(
        format!("⏱ {}s", session.seconds_display()),
        bold.fg(ACCENT),
    ))
    .render(header[0], buf);
    Paragraph::new(Span::styled(
        format!("⚡ Taps: {}", session.tap_count),
        bold.fg(ACCENT),
    ))
    .alignment(Alignment::Right)
    .render(header[1], buf);

    Paragraph::new("Tap as fast as you can! (any key)")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let pad_style = if game.phase() == Phase::Running {
        bold.fg(ACCENT)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let pad = centered_rect(30, 7, chunks[2]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(pad_style);
    let inner = block.inner(pad);
    block.render(pad, buf);
    Paragraph::new(Span::styled("TAP!", pad_style))
        .alignment(Alignment::Center)
        .render(centered_rect(inner.width, 1, inner), buf);

    Gauge::default()
        .gauge_style(Style::default().fg(ACCENT).bg(Color::Rgb(224, 228, 255)))
        .ratio(session.progress())
        .label("")
        .render(chunks[4], buf);

    if let Some((unit, remaining)) = game.ads().showing() {
        render_ad_overlay(unit, remaining.as_secs_f64().ceil() as u64, area, buf);
        return;
    }

    match game.phase() {
        Phase::AwaitingRevive => render_revive_modal(area, buf),
        Phase::PresentingAd | Phase::Done => {
            let notice = centered_rect(30, 3, area);
            Clear.render(notice, buf);
            Paragraph::new("Loading results…")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL))
                .render(notice, buf);
        }
        Phase::Idle | Phase::Running => {}
    }
}

fn render_revive_modal(area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let modal = centered_rect(44, 9, area);
    Clear.render(modal, buf);

    let text = vec![
        Line::from(Span::styled("Time's Up!", bold)),
        Line::from(Span::styled(
            "Want 5 extra seconds?",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled("(w)atch ad (+5s)", bold.fg(ACCENT))),
        Line::from(Span::styled(
            "(n)o thanks, show results",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double),
        )
        .render(modal, buf);
}

fn render_ad_overlay(unit: AdUnit, secs_left: u64, area: Rect, buf: &mut Buffer) {
    Clear.render(area, buf);
    let body = match unit {
        AdUnit::Interstitial => "Your results are right after this ad.",
        AdUnit::Rewarded => "Watch to the end to earn +5s.",
    };
    let text = vec![
        Line::from(Span::styled(
            "Advertisement",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(body),
        Line::from(""),
        Line::from(format!("closes in {secs_left}s / (esc) skip")),
    ];
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {unit} ad ")),
        )
        .render(centered_rect(50, 9, area), buf);
}
