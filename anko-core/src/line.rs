//! One row of the terminal grid.
//!
//! Lines are owned by value and moved, never shared, when rows scroll
//! between the screen and the scrollback.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::color::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    cells: Vec<Cell>,
}

impl Line {
    pub fn new(cols: usize) -> Self {
        Line {
            cells: vec![Cell::EMPTY; cols],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn get_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    pub fn set(&mut self, col: usize, cell: Cell) {
        if col < self.cells.len() {
            self.cells[col] = cell;
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    pub fn clear_with_bg(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.clear_with_bg(bg);
        }
    }

    /// Clear `[start, end)`, clamped to the line.
    pub fn clear_range_with_bg(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.cells.len());
        for col in start..end {
            self.cells[col].clear_with_bg(bg);
        }
    }

    /// Grow with blank cells or truncate. Truncation never leaves a
    /// dangling wide base in the last column: if the companion would fall
    /// past the new edge the base becomes a blank cell.
    pub fn resize(&mut self, new_cols: usize) {
        if new_cols > self.cells.len() {
            self.cells.resize(new_cols, Cell::EMPTY);
        } else {
            self.cells.truncate(new_cols);
            if let Some(last) = self.cells.last_mut() {
                if last.is_wide() {
                    last.clear();
                }
            }
        }
    }

    /// Shift cells right from `col`, dropping off the end (ICH).
    pub fn insert_cells(&mut self, col: usize, count: usize) {
        if col >= self.cells.len() {
            return;
        }
        let count = count.min(self.cells.len() - col);
        for _ in 0..count {
            self.cells.pop();
            self.cells.insert(col, Cell::EMPTY);
        }
    }

    /// Shift cells left into `col`, blank-filling at the end (DCH).
    pub fn delete_cells(&mut self, col: usize, count: usize) {
        if col >= self.cells.len() {
            return;
        }
        let count = count.min(self.cells.len() - col);
        for _ in 0..count {
            self.cells.remove(col);
            self.cells.push(Cell::EMPTY);
        }
    }

    /// UTF-8 text of the row: width-0 cells skipped, combining characters
    /// appended after their base, trailing blanks trimmed.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            cell.write_text(&mut out);
        }
        out.truncate(out.trim_end_matches(' ').len());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_from(s: &str) -> Line {
        let mut line = Line::new(10);
        for (i, c) in s.chars().enumerate() {
            line.set(i, Cell::new(c));
        }
        line
    }

    #[test]
    fn new_line_is_blank() {
        let line = Line::new(80);
        assert_eq!(line.len(), 80);
        assert_eq!(line.text(), "");
    }

    #[test]
    fn insert_cells_shifts_right() {
        let mut line = line_from("ABCDEFGHIJ");
        line.insert_cells(3, 2);
        assert_eq!(line.text(), "ABC  DEFGH");
        assert_eq!(line.len(), 10);
    }

    #[test]
    fn delete_cells_shifts_left() {
        let mut line = line_from("ABCDEFGHIJ");
        line.delete_cells(3, 2);
        assert_eq!(line.text(), "ABCFGHIJ");
        assert_eq!(line.len(), 10);
    }

    #[test]
    fn resize_preserves_content() {
        let mut line = line_from("ABC");
        line.resize(20);
        assert_eq!(line.len(), 20);
        assert_eq!(line.text(), "ABC");
        line.resize(2);
        assert_eq!(line.text(), "AB");
    }

    #[test]
    fn truncation_does_not_split_wide_char() {
        let mut line = Line::new(4);
        line.set(2, Cell::with_pen('\u{3042}', Color::Default, Color::Default, Default::default(), 2));
        line.set(3, Cell::wide_companion(Color::Default, Color::Default));
        line.resize(3);
        assert!(!line.get(2).unwrap().is_wide());
        assert_eq!(line.get(2).unwrap().ch, ' ');
    }

    #[test]
    fn text_trims_trailing_blanks() {
        let mut line = Line::new(10);
        line.set(0, Cell::new('h'));
        line.set(1, Cell::new('i'));
        assert_eq!(line.text(), "hi");
    }
}
