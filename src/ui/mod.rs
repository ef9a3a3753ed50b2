//! Terminal REPL built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: REPL state, keyboard event loop, evaluate/bind mode
//! - **[`panes`]**: stateless render functions for each visible pane (input,
//!   history, environment, tree, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with an
//! [`Environment`] and a [`TypeRegistry`] and call [`App::run`] to start the
//! event loop.
//!
//! [`Environment`]: crate::interpreter::Environment
//! [`TypeRegistry`]: crate::binder::types::TypeRegistry
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
