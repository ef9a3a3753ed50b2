//! Environment pane rendering: variables, constants and function parts of
//! the global frame

use crate::interpreter::environment::Environment;
use crate::interpreter::functions::PartBody;
use crate::interpreter::value::Value;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Padding},
    Frame,
};

use super::utils::{clamp_scroll, pane_block, value_span, visible_rows};

fn heading(title: &str) -> ListItem<'_> {
    ListItem::new(Line::from(Span::styled(
        title,
        Style::default()
            .fg(DEFAULT_THEME.secondary)
            .add_modifier(Modifier::BOLD),
    )))
}

fn binding_item(sigil: &str, name: &str, value: &Value) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled(format!("  {}{}", sigil, name), Style::default().fg(DEFAULT_THEME.fg)),
        Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
        value_span(value),
    ]))
}

pub fn render_environment_pane(frame: &mut Frame, area: Rect, env: &Environment, scroll_offset: &mut usize) {
    let global = env.global();
    let mut items: Vec<ListItem> = Vec::new();

    let variables = global.variables();
    if !variables.is_empty() {
        items.push(heading("Variables"));
        items.extend(variables.into_iter().map(|(name, value)| binding_item("", name, value)));
    }

    let constants = global.constants();
    if !constants.is_empty() {
        items.push(heading("Constants"));
        items.extend(constants.into_iter().map(|(name, value)| binding_item("_", name, value)));
    }

    let functions = global.functions();
    if !functions.is_empty() {
        items.push(heading("Functions"));
        for function in functions {
            for part in function.parts() {
                let origin = match part.body {
                    PartBody::Native(_) => "native",
                    PartBody::Script { .. } => "script",
                };
                items.push(ListItem::new(Line::from(vec![
                    Span::styled(format!("  {}", function.name), Style::default().fg(DEFAULT_THEME.function)),
                    Span::styled(
                        format!("/{} {} {}", part.arity, part.scope, origin),
                        Style::default().fg(DEFAULT_THEME.comment),
                    ),
                ])));
            }
        }
    }

    let block = pane_block(" Environment ", false).padding(Padding::new(1, 0, 0, 0));
    let visible_height = visible_rows(area);
    clamp_scroll(scroll_offset, items.len(), visible_height);
    let visible_items: Vec<ListItem> = items.into_iter().skip(*scroll_offset).take(visible_height).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
