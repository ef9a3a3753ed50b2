//! Shared helpers for pane rendering
//!
//! All functions in this module are `pub(super)`, making them accessible only
//! within the panes module.

use crate::interpreter::value::Value;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders},
};

pub(super) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Rows available inside a bordered pane, at least one.
pub(super) fn visible_rows(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}

/// Clamp `scroll_offset` so the last page stays full; `usize::MAX` pins the
/// view to the bottom.
pub(super) fn clamp_scroll(scroll_offset: &mut usize, total_items: usize, visible_height: usize) {
    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }
}

/// Styled display form of a runtime value
pub(super) fn value_span(value: &Value) -> Span<'static> {
    let color = match value {
        Value::Str(_) | Value::Char(_) => DEFAULT_THEME.string,
        Value::Int(_) | Value::Float(_) | Value::Double(_) => DEFAULT_THEME.number,
        Value::Null => DEFAULT_THEME.comment,
        Value::Bool(_) => DEFAULT_THEME.primary,
        Value::Array(_) => DEFAULT_THEME.fg,
    };
    let text = match value {
        Value::Str(s) => format!("`{}`", s),
        Value::Char(c) => format!("'{}'", c),
        other => other.to_string(),
    };
    Span::styled(text, Style::default().fg(color))
}
