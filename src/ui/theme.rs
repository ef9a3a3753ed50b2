//! Color palette shared by all panes

use ratatui::style::Color;

const TEXT: Color = Color::Rgb(205, 214, 244);
const OVERLAY: Color = Color::Rgb(108, 112, 134);
const SURFACE: Color = Color::Rgb(50, 50, 70);
const BLUE: Color = Color::Rgb(137, 180, 250);
const PEACH: Color = Color::Rgb(250, 179, 135);
const GREEN: Color = Color::Rgb(166, 227, 161);
const RED: Color = Color::Rgb(243, 139, 168);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const TEAL: Color = Color::Rgb(148, 226, 213);
const PINK: Color = Color::Rgb(245, 194, 231);

/// Colors by role
pub struct Theme {
    pub fg: Color,
    /// Evaluate mode badge and prompt
    pub primary: Color,
    /// Bind mode badge and prompt
    pub secondary: Color,
    pub comment: Color,
    pub success: Color,
    pub error: Color,
    pub string: Color,
    pub number: Color,
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color,
    pub function: Color,
    pub type_name: Color,
    /// Emitted instruction listing
    pub instruction: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: TEXT,
    primary: BLUE,
    secondary: PEACH,
    comment: OVERLAY,
    success: GREEN,
    error: RED,
    string: GREEN,
    number: PEACH,
    border_focused: YELLOW,
    border_normal: OVERLAY,
    current_line_bg: SURFACE,
    function: YELLOW,
    type_name: TEAL,
    instruction: PINK,
};
