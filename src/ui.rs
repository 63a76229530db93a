pub mod game;
pub mod home;
pub mod results;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::{
    app::{App, AppState},
    celebration::Celebration,
    store::KeyValueStore,
};

pub(crate) const HORIZONTAL_MARGIN: u16 = 5;
pub(crate) const VERTICAL_MARGIN: u16 = 2;
pub(crate) const ACCENT: Color = Color::Rgb(79, 117, 255);

impl<K: KeyValueStore> Widget for &App<K> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Home => home::render(self, area, buf),
            AppState::Game => {
                if let Some(game) = self.game.as_ref() {
                    game::render(game, area, buf);
                }
            }
            AppState::Results => {
                if let Some(view) = self.results.as_ref() {
                    results::render(view, area, buf);
                }
                if self.celebration.is_active {
                    render_celebration_particles(&self.celebration, area, buf);
                }
            }
        }
    }
}

/// A rectangle of `width` x `height` cells centred in `area`, clipped to fit.
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(area.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}

/// Render celebration particles on top of the results screen
fn render_celebration_particles(celebration: &Celebration, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        ACCENT,
        Color::LightYellow,
    ];

    for particle in &celebration.particles {
        if particle.x < 0.0 || particle.y < 0.0 {
            continue;
        }
        let (x, y) = (particle.x as u16, particle.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }

        let color = colors[particle.color_index % colors.len()];
        let fade = 1.0 - (particle.age / particle.max_age);
        let style = match (particle.is_letter(), fade) {
            (true, f) if f > 0.4 => Style::default().fg(color).add_modifier(Modifier::BOLD),
            (true, _) => Style::default().fg(color),
            (false, f) if f > 0.7 => Style::default().fg(color).add_modifier(Modifier::BOLD),
            (false, f) if f > 0.3 => Style::default().fg(color),
            (false, _) => Style::default().fg(color).add_modifier(Modifier::DIM),
        };

        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&particle.symbol.to_string());
            cell.set_style(style);
        }
    }
}

#[cfg(test)]
pub(crate) fn rendered_text<K: KeyValueStore>(app: &App<K>, area: Rect) -> String {
    let mut buffer = Buffer::empty(area);
    app.render(area, &mut buffer);
    buffer
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect::<String>()
}
