//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`input`]: the input line with mode prompt and cursor
//! - [`history`]: past inputs with printed output, results and errors
//! - [`environment`]: global variables, constants and function parts
//! - [`tree`]: the last parsed tree, with types and bindings after a bind
//! - [`status`]: status bar with keybindings and the current mode
//! - `utils`: shared block styling, scrolling and value formatting
//!
//! Each pane module exports one `render_*` function that takes the state it
//! draws by reference; scroll offsets are clamped in place.

mod utils;

pub mod environment;
pub mod history;
pub mod input;
pub mod status;
pub mod tree;

pub use environment::render_environment_pane;
pub use history::render_history_pane;
pub use input::render_input_pane;
pub use status::render_status_bar;
pub use tree::{collect_tree, render_tree_pane, TreeLine};
