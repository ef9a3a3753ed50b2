//! Input line rendering

use crate::ui::app::Mode;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::utils::pane_block;

/// Render the input line and place the terminal cursor at `cursor` (a char
/// index into `input`).
pub fn render_input_pane(frame: &mut Frame, area: Rect, input: &str, cursor: usize, mode: Mode) {
    let prompt = match mode {
        Mode::Evaluate => "> ",
        Mode::Bind => ": ",
    };

    let inner_width = area.width.saturating_sub(2) as usize;
    let prompt_width = prompt.chars().count();
    // Scroll the line horizontally so the cursor stays visible
    let skip = (prompt_width + cursor + 1).saturating_sub(inner_width);
    let shown: String = input.chars().skip(skip).collect();

    let line = Line::from(vec![
        Span::styled(
            prompt,
            Style::default()
                .fg(DEFAULT_THEME.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(shown, Style::default().fg(DEFAULT_THEME.fg)),
    ]);

    let title = format!(" Input [{}] ", mode.label());
    let paragraph = Paragraph::new(line).block(pane_block(&title, true));
    frame.render_widget(paragraph, area);

    let x = area.x + 1 + (prompt_width + cursor).saturating_sub(skip) as u16;
    frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(2)), area.y + 1));
}
