//! Bottom status bar: mode badge, last message and key hints

use crate::ui::app::Mode;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const KEY_HINTS: [(&str, &str); 5] = [
    ("Enter", "run"),
    ("Tab", "mode"),
    ("Up/Down", "recall"),
    ("PgUp/PgDn", "scroll"),
    ("Esc", "quit"),
];

fn bar_style() -> Style {
    Style::default().bg(DEFAULT_THEME.current_line_bg)
}

fn hint_spans() -> Vec<Span<'static>> {
    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let action_style = bar_style().fg(DEFAULT_THEME.fg);

    let mut spans = Vec::with_capacity(KEY_HINTS.len() * 3);
    for (i, (key, action)) in KEY_HINTS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" ", bar_style()));
        }
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", action), action_style));
    }
    spans
}

/// Render the status bar. The badge turns red while `is_error` is set.
pub fn render_status_bar(frame: &mut Frame, area: Rect, message: &str, mode: Mode, is_error: bool) {
    let [message_area, hints_area] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);

    let badge_bg = match (is_error, mode) {
        (true, _) => DEFAULT_THEME.error,
        (false, Mode::Evaluate) => DEFAULT_THEME.primary,
        (false, Mode::Bind) => DEFAULT_THEME.secondary,
    };
    let message_fg = if is_error { DEFAULT_THEME.error } else { DEFAULT_THEME.fg };

    let status = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label().to_uppercase()),
            Style::default().bg(badge_bg).fg(Color::Black).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", message), bar_style().fg(message_fg)),
    ]);
    frame.render_widget(Paragraph::new(status).style(bar_style()), message_area);

    let hints = Paragraph::new(Line::from(hint_spans()))
        .style(bar_style())
        .alignment(Alignment::Right);
    frame.render_widget(hints, hints_area);
}
