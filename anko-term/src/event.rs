//! Events the emulator emits toward the session.
//!
//! The interpreter appends [`TermEvent`] values in emission order and the
//! session drains them on the UI thread; ordering is part of the
//! contract. A scrollback push for a row is always queued before the
//! damage that refers to the shifted rows.

use anko_core::{CursorStyle, Line};

/// Half-open damage rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Rect {
    pub fn rows(row_start: usize, row_end: usize, cols: usize) -> Self {
        Rect {
            row_start,
            row_end,
            col_start: 0,
            col_end: cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_start >= self.row_end || self.col_start >= self.col_end
    }
}

/// Flattened mouse reporting state for the renderer and clipboard layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseProtocol {
    #[default]
    None,
    X10,
    Normal,
    Sgr,
}

/// Snapshot of the terminal properties published whenever one changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TermProps {
    pub title: String,
    pub icon_name: String,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
    pub cursor_shape: CursorStyle,
    pub alt_screen: bool,
    pub mouse: MouseProtocol,
    pub bracketed_paste: bool,
}

impl Default for TermProps {
    fn default() -> Self {
        TermProps {
            title: String::new(),
            icon_name: String::new(),
            cursor_visible: true,
            cursor_blink: true,
            cursor_shape: CursorStyle::Block,
            alt_screen: false,
            mouse: MouseProtocol::None,
            bracketed_paste: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TermEvent {
    /// A screen rectangle changed.
    Damage(Rect),
    /// A region moved wholesale (scroll optimization). Consumers that do
    /// not implement the copy must treat both rectangles as damaged.
    MoveRect { dest: Rect, src: Rect },
    /// The cursor moved or changed visibility.
    MoveCursor {
        row: usize,
        col: usize,
        visible: bool,
    },
    /// A terminal property changed; carries the full snapshot.
    SetProps(TermProps),
    Bell,
    /// The interpreter acknowledged a resize.
    Resize { rows: usize, cols: usize },
    /// A line left the top of the primary screen and should be kept.
    ScrollbackPush(Line),
    /// Bytes to send back to the shell (query replies, encoded keys).
    Output(Vec<u8>),
}
