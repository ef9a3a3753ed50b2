//! REPL application state and logic

use crate::binder::types::{Type, TypeRegistry};
use crate::interpreter::Environment;
use crate::parser::ast::Statement;
use crate::ui::panes::{self, TreeLine};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tracing::debug;

/// What Enter does with the input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Evaluate against the REPL environment
    Evaluate,
    /// Bind and emit; shows types, bindings and instructions
    Bind,
}

impl Mode {
    pub fn toggle(self) -> Self {
        match self {
            Mode::Evaluate => Mode::Bind,
            Mode::Bind => Mode::Evaluate,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Evaluate => "evaluate",
            Mode::Bind => "bind",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Display form of an evaluated value
    Value(String),
    /// Static type of a bound program
    Type(String),
    Error(String),
}

/// One submitted input and what came of it
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mode: Mode,
    pub input: String,
    /// Lines printed while evaluating
    pub output: Vec<String>,
    pub outcome: Outcome,
}

/// The main application state
pub struct App {
    pub env: Environment,
    pub registry: TypeRegistry,
    pub mode: Mode,

    /// Input line and cursor position in chars
    pub input: String,
    pub cursor: usize,

    pub history: Vec<HistoryEntry>,

    /// History index shown by Up/Down, `None` while editing fresh input
    recall: Option<usize>,

    /// Inputs accepted in bind mode. Bound trees are write-once, so each bind
    /// re-parses all of them together with the new input.
    bound_sources: Vec<String>,

    pub tree: Vec<TreeLine>,
    pub instructions: Vec<String>,

    /// Per-pane scroll offsets
    pub history_scroll: usize,
    pub environment_scroll: usize,
    pub tree_scroll: usize,

    pub should_quit: bool,
    pub status_message: String,
    pub status_is_error: bool,
}

impl App {
    pub fn new(env: Environment, registry: TypeRegistry) -> Self {
        App {
            env,
            registry,
            mode: Mode::Evaluate,
            input: String::new(),
            cursor: 0,
            history: Vec::new(),
            recall: None,
            bound_sources: Vec::new(),
            tree: Vec::new(),
            instructions: Vec::new(),
            history_scroll: 0,
            environment_scroll: 0,
            tree_scroll: 0,
            should_quit: false,
            status_message: String::from("Ready!"),
            status_is_error: false,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // History and side panes, input line, status bar
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(columns[1]);

        panes::render_history_pane(frame, columns[0], &self.history, &mut self.history_scroll);
        panes::render_environment_pane(frame, right_rows[0], &self.env, &mut self.environment_scroll);
        panes::render_tree_pane(
            frame,
            right_rows[1],
            &self.tree,
            &self.instructions,
            &mut self.tree_scroll,
        );
        panes::render_input_pane(frame, main_chunks[1], &self.input, self.cursor, self.mode);
        panes::render_status_bar(
            frame,
            main_chunks[2],
            &self.status_message,
            self.mode,
            self.status_is_error,
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.mode = self.mode.toggle();
                self.status_message = format!("Mode: {}", self.mode.label());
                self.status_is_error = false;
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Up => self.recall_previous(),
            KeyCode::Down => self.recall_next(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.input.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.chars().count(),
            KeyCode::PageUp => self.history_scroll = self.history_scroll.saturating_sub(5),
            KeyCode::PageDown => self.history_scroll = self.history_scroll.saturating_add(5),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset(self.cursor);
                    self.input.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.input.chars().count() {
                    let at = self.byte_offset(self.cursor);
                    self.input.remove(at);
                }
            }
            KeyCode::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.input.insert(at, c);
                self.cursor += 1;
            }
            _ => {}
        }
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn set_input(&mut self, text: String) {
        self.cursor = text.chars().count();
        self.input = text;
    }

    fn recall_previous(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.recall {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.recall = Some(index);
        self.set_input(self.history[index].input.clone());
    }

    fn recall_next(&mut self) {
        match self.recall {
            Some(i) if i + 1 < self.history.len() => {
                self.recall = Some(i + 1);
                self.set_input(self.history[i + 1].input.clone());
            }
            Some(_) => {
                self.recall = None;
                self.set_input(String::new());
            }
            None => {}
        }
    }

    /// Run the input line in the current mode and append the result to the
    /// history.
    pub fn submit(&mut self) {
        let input = std::mem::take(&mut self.input).trim().to_string();
        self.cursor = 0;
        self.recall = None;
        if input.is_empty() {
            return;
        }

        debug!(mode = self.mode.label(), %input, "submit");
        let entry = match self.mode {
            Mode::Evaluate => self.evaluate_input(input),
            Mode::Bind => self.bind_input(input),
        };

        self.status_is_error = matches!(entry.outcome, Outcome::Error(_));
        self.status_message = match &entry.outcome {
            Outcome::Error(_) => "Failed".to_string(),
            Outcome::Value(_) => "Evaluated".to_string(),
            Outcome::Type(_) => format!("Bound, {} instruction(s)", self.instructions.len()),
        };
        self.history.push(entry);
        self.history_scroll = usize::MAX;
    }

    fn evaluate_input(&mut self, input: String) -> HistoryEntry {
        let outcome = match crate::parse_program(&input) {
            Ok(program) => {
                self.tree = panes::collect_tree(&program);
                self.instructions.clear();
                match crate::evaluate(&program, &mut self.env) {
                    Ok(value) => Outcome::Value(value.to_string()),
                    Err(e) => Outcome::Error(format!("runtime error: {}", e)),
                }
            }
            Err(e) => Outcome::Error(format!("parse error: {}", e)),
        };

        HistoryEntry {
            mode: Mode::Evaluate,
            input,
            output: self.env.take_output(),
            outcome,
        }
    }

    fn bind_input(&mut self, input: String) -> HistoryEntry {
        let outcome = match self.bind_source(&input) {
            Ok(ty) => {
                self.bound_sources.push(input.clone());
                Outcome::Type(ty.to_string())
            }
            Err(e) => Outcome::Error(format!("{}: {}", e.stage(), e)),
        };

        HistoryEntry {
            mode: Mode::Bind,
            input,
            output: Vec::new(),
            outcome,
        }
    }

    /// Bind every accepted input plus `input` and emit the result. The tree
    /// pane shows only the statements `input` contributed.
    fn bind_source(&mut self, input: &str) -> Result<Type, crate::Error> {
        let fresh = crate::parse_program(input)?.len();
        let mut sources = self.bound_sources.clone();
        sources.push(input.to_string());
        let program: Vec<Statement> = crate::parse_program(&sources.join(";\n"))?;

        let (ty, instructions) = crate::compile_typed(&program, &self.registry, None)?;

        self.tree = panes::collect_tree(&program[program.len().saturating_sub(fresh)..]);
        self.instructions = instructions.iter().map(|i| i.to_string()).collect();
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Environment::with_builtins(), TypeRegistry::new())
    }

    fn type_line(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        app.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    }

    #[test]
    fn test_evaluate_keeps_environment() {
        let mut app = app();
        type_line(&mut app, "var x = 2");
        type_line(&mut app, "print(`x is`, x); x + 3 * 2");
        let last = &app.history[1];
        assert_eq!(last.outcome, Outcome::Value("8".to_string()));
        assert_eq!(last.output, vec!["x is 2".to_string()]);
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_errors_are_reported() {
        let mut app = app();
        type_line(&mut app, "1 +");
        type_line(&mut app, "missing");
        assert!(matches!(&app.history[0].outcome, Outcome::Error(m) if m.starts_with("parse error")));
        assert!(matches!(&app.history[1].outcome, Outcome::Error(m) if m.starts_with("runtime error")));
        assert!(app.status_is_error);
    }

    #[test]
    fn test_bind_mode_accumulates() {
        let mut app = app();
        app.handle_key_event(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.mode, Mode::Bind);

        type_line(&mut app, "var x = 2");
        type_line(&mut app, "x + 1.5");
        assert_eq!(app.history[1].outcome, Outcome::Type("double".to_string()));
        assert!(app.instructions.iter().any(|i| i == "conv int -> double"));
        assert_eq!(app.tree[0].label, "binary +");

        type_line(&mut app, "y * 2");
        assert!(matches!(&app.history[2].outcome, Outcome::Error(m) if m.starts_with("bind error")));
        type_line(&mut app, "x * 2");
        assert_eq!(app.history[3].outcome, Outcome::Type("int".to_string()));
    }

    #[test]
    fn test_history_recall() {
        let mut app = app();
        type_line(&mut app, "1");
        type_line(&mut app, "2");
        app.handle_key_event(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(app.input, "2");
        app.handle_key_event(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(app.input, "1");
        app.handle_key_event(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(app.input, "2");
        app.handle_key_event(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(app.input, "");
    }

    #[test]
    fn test_cursor_editing() {
        let mut app = app();
        for c in "ac".chars() {
            app.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        app.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        app.handle_key_event(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE));
        assert_eq!(app.input, "abc");
        app.handle_key_event(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.input, "ac");
        assert_eq!(app.cursor, 1);
    }
}
