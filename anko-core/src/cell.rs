//! Terminal cell representation.
//!
//! A cell is a single character position in the grid. It holds one primary
//! codepoint, up to [`MAX_COMBINING`] combining codepoints, foreground and
//! background colors, an attribute set and a display width. Width 0 marks
//! the companion half of a double-width character; such cells are skipped
//! by text extraction and rendering.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Maximum number of combining codepoints stored per cell. Further
/// combiners on the same base are dropped.
pub const MAX_COMBINING: usize = 3;

/// Underline style as selected by SGR 4 / SGR 4:n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
}

/// Visual attributes applied to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub bold: bool,
    pub italic: bool,
    pub underline: UnderlineStyle,
    pub blink: bool,
    pub reverse: bool,
    pub strikethrough: bool,
    pub conceal: bool,
}

impl Attributes {
    pub const NONE: Attributes = Attributes {
        bold: false,
        italic: false,
        underline: UnderlineStyle::None,
        blink: false,
        reverse: false,
        strikethrough: false,
        conceal: false,
    };

    pub fn is_plain(&self) -> bool {
        *self == Self::NONE
    }

    pub fn reset(&mut self) {
        *self = Self::NONE;
    }
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Primary codepoint.
    pub ch: char,
    /// Combining codepoints attached to `ch`; only the first
    /// `combining_len` entries are meaningful.
    combining: [char; MAX_COMBINING],
    combining_len: u8,
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attributes,
    /// Display width: 1, 2 for a wide base, 0 for the wide companion.
    pub width: u8,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        ch: ' ',
        combining: ['\0'; MAX_COMBINING],
        combining_len: 0,
        fg: Color::Default,
        bg: Color::Default,
        attrs: Attributes::NONE,
        width: 1,
    };

    pub fn new(ch: char) -> Self {
        Cell {
            ch,
            ..Cell::EMPTY
        }
    }

    /// Create a styled cell the way the emulator writes them.
    pub fn with_pen(ch: char, fg: Color, bg: Color, attrs: Attributes, width: u8) -> Self {
        Cell {
            ch,
            combining: ['\0'; MAX_COMBINING],
            combining_len: 0,
            fg,
            bg,
            attrs,
            width,
        }
    }

    /// The width-0 companion written to the right of a wide base cell.
    pub fn wide_companion(fg: Color, bg: Color) -> Self {
        Cell {
            ch: ' ',
            fg,
            bg,
            width: 0,
            ..Cell::EMPTY
        }
    }

    /// Attach a combining codepoint; silently dropped once the cell
    /// already carries [`MAX_COMBINING`] of them.
    pub fn push_combining(&mut self, ch: char) {
        let len = self.combining_len as usize;
        if len < MAX_COMBINING {
            self.combining[len] = ch;
            self.combining_len += 1;
        }
    }

    pub fn combining(&self) -> &[char] {
        &self.combining[..self.combining_len as usize]
    }

    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    pub fn is_wide_companion(&self) -> bool {
        self.width == 0
    }

    /// A blank cell with no styling.
    pub fn is_empty(&self) -> bool {
        self.ch == ' '
            && self.combining_len == 0
            && self.fg == Color::Default
            && self.bg == Color::Default
            && self.attrs.is_plain()
    }

    pub fn clear(&mut self) {
        *self = Cell::EMPTY;
    }

    /// Reset to a blank cell that keeps the current background, the way
    /// erase operations behave under a colored pen.
    pub fn clear_with_bg(&mut self, bg: Color) {
        *self = Cell::EMPTY;
        self.bg = bg;
    }

    /// Append the cell's text (base plus combiners) to a string. Width-0
    /// cells contribute nothing.
    pub fn write_text(&self, out: &mut String) {
        if self.width == 0 {
            return;
        }
        out.push(self.ch);
        for &c in self.combining() {
            out.push(c);
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::EMPTY
    }
}
