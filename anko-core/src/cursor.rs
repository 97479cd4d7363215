//! Cursor state: position, style, visibility and the DECSC saved form.

use serde::{Deserialize, Serialize};

use crate::cell::Attributes;
use crate::color::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pub style: CursorStyle,
    pub visible: bool,
    pub blinking: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor {
            row: 0,
            col: 0,
            style: CursorStyle::Block,
            visible: true,
            blinking: true,
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cursor state captured by DECSC / CSI s and restored by DECRC / CSI u.
/// The pen travels with the cursor so attribute state round-trips too.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SavedCursor {
    pub row: usize,
    pub col: usize,
    pub attrs: Attributes,
    pub fg: Color,
    pub bg: Color,
    pub origin_mode: bool,
    pub autowrap: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cursor_is_home_and_visible() {
        let cursor = Cursor::new();
        assert_eq!((cursor.row, cursor.col), (0, 0));
        assert!(cursor.visible);
        assert!(cursor.blinking);
        assert_eq!(cursor.style, CursorStyle::Block);
    }
}
