//! History pane rendering: past inputs, printed output and results

use crate::ui::app::{HistoryEntry, Mode, Outcome};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Padding, Paragraph},
    Frame,
};

use super::utils::{clamp_scroll, pane_block, visible_rows};

fn entry_items(entry: &HistoryEntry) -> Vec<ListItem<'_>> {
    let prompt = match entry.mode {
        Mode::Evaluate => "> ",
        Mode::Bind => ": ",
    };
    let mut items = vec![ListItem::new(Line::from(vec![
        Span::styled(prompt, Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(
            entry.input.as_str(),
            Style::default()
                .fg(DEFAULT_THEME.fg)
                .add_modifier(Modifier::BOLD),
        ),
    ]))];

    items.extend(
        entry
            .output
            .iter()
            .map(|line| ListItem::new(line.as_str()).style(Style::default().fg(DEFAULT_THEME.fg))),
    );

    let result = match &entry.outcome {
        Outcome::Value(text) => Line::from(vec![
            Span::styled("= ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(text.as_str(), Style::default().fg(DEFAULT_THEME.success)),
        ]),
        Outcome::Type(ty) => Line::from(vec![
            Span::styled(": ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(ty.as_str(), Style::default().fg(DEFAULT_THEME.type_name)),
        ]),
        Outcome::Error(message) => Line::from(Span::styled(
            message.as_str(),
            Style::default().fg(DEFAULT_THEME.error),
        )),
    };
    items.push(ListItem::new(result));
    items
}

/// Render the history pane. `scroll_offset` is clamped in place;
/// `usize::MAX` shows the newest entries.
pub fn render_history_pane(frame: &mut Frame, area: Rect, history: &[HistoryEntry], scroll_offset: &mut usize) {
    let block = pane_block(" History ", false);

    if history.is_empty() {
        let paragraph = Paragraph::new("(type a script and press Enter)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let all_items: Vec<ListItem> = history.iter().flat_map(entry_items).collect();

    let total_items = all_items.len();
    let visible_height = visible_rows(area);
    clamp_scroll(scroll_offset, total_items, visible_height);

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
