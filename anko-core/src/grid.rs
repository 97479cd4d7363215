//! Render-facing terminal grid.
//!
//! `TermGrid` mirrors the emulator's visible screen for the renderer: it
//! owns the cell rows, the scrollback history and a one-bit-per-row dirty
//! bitmap. It is single-threaded by design; all mutation happens on the UI
//! thread during the output pump. Out-of-range reads return a shared
//! sentinel blank cell and out-of-range writes are silent no-ops, so the
//! emulation layer never has to re-clamp.

use std::collections::VecDeque;

use thiserror::Error;

use crate::cell::Cell;
use crate::line::Line;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("terminal dimensions must be positive: {rows}x{cols}")]
    InvalidGeometry { rows: usize, cols: usize },
}

static EMPTY_CELL: Cell = Cell::EMPTY;

#[derive(Debug, Clone)]
pub struct TermGrid {
    rows: usize,
    cols: usize,
    screen: Vec<Line>,
    /// History rows; front = most recently evicted line.
    scrollback: VecDeque<Line>,
    max_scrollback: usize,
    dirty: Vec<bool>,
}

impl TermGrid {
    pub fn new(rows: usize, cols: usize, max_scrollback: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::InvalidGeometry { rows, cols });
        }
        Ok(TermGrid {
            rows,
            cols,
            screen: (0..rows).map(|_| Line::new(cols)).collect(),
            scrollback: VecDeque::new(),
            max_scrollback,
            dirty: vec![true; rows],
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    // ------------------------------------------------------------------
    // Cell and row access
    // ------------------------------------------------------------------

    /// Always returns a cell; out-of-range positions yield a blank
    /// sentinel.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.screen
            .get(row)
            .and_then(|line| line.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Out-of-range writes are dropped.
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        if row < self.rows && col < self.cols {
            self.screen[row].set(col, cell);
            self.dirty[row] = true;
        }
    }

    pub fn row(&self, row: usize) -> Option<&Line> {
        self.screen.get(row)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut Line> {
        self.screen.get_mut(row)
    }

    /// Replace a whole row by value, marking it dirty.
    pub fn set_row(&mut self, row: usize, line: Line) {
        if row < self.rows {
            let mut line = line;
            line.resize(self.cols);
            self.screen[row] = line;
            self.dirty[row] = true;
        }
    }

    pub fn clear_range(&mut self, row: usize, col_start: usize, col_end: usize) {
        if let Some(line) = self.screen.get_mut(row) {
            let end = col_end.min(self.cols);
            for col in col_start..end {
                if let Some(cell) = line.get_mut(col) {
                    cell.clear();
                }
            }
            self.dirty[row] = true;
        }
    }

    pub fn clear_row(&mut self, row: usize) {
        if let Some(line) = self.screen.get_mut(row) {
            line.clear();
            self.dirty[row] = true;
        }
    }

    pub fn clear_screen(&mut self) {
        for line in &mut self.screen {
            line.clear();
        }
        self.mark_all_dirty();
    }

    // ------------------------------------------------------------------
    // Scrolling and scrollback
    // ------------------------------------------------------------------

    /// Scroll rows `[top, bottom)` by `lines` (positive = up). When the
    /// region starts at the screen top, lines scrolled off become
    /// scrollback; scrolling down at the top restores from scrollback
    /// when history exists.
    pub fn scroll(&mut self, lines: i32, top: usize, bottom: usize) {
        let bottom = bottom.min(self.rows);
        if top + 1 >= bottom || lines == 0 {
            return;
        }

        if lines > 0 {
            for _ in 0..lines.min((bottom - top) as i32) {
                let line = self.screen.remove(top);
                if top == 0 {
                    self.push_scrollback(line);
                }
                self.screen.insert(bottom - 1, Line::new(self.cols));
            }
        } else {
            for _ in 0..(-lines).min((bottom - top) as i32) {
                self.screen.remove(bottom - 1);
                let restored = if top == 0 {
                    self.scrollback.pop_front()
                } else {
                    None
                };
                self.screen
                    .insert(top, restored.unwrap_or_else(|| Line::new(self.cols)));
            }
        }
        self.mark_dirty_range(top, bottom);
    }

    /// Push an evicted line to the front of history, trimming the back.
    pub fn push_scrollback(&mut self, line: Line) {
        self.scrollback.push_front(line);
        while self.scrollback.len() > self.max_scrollback {
            self.scrollback.pop_back();
        }
    }

    /// Take the most recent history line back out (UI-driven scroll
    /// restore; nothing in the parser path calls this).
    pub fn pop_scrollback(&mut self) -> Option<Line> {
        self.scrollback.pop_front()
    }

    /// History line by index, 0 = most recent.
    pub fn scrollback_line(&self, index: usize) -> Option<&Line> {
        self.scrollback.get(index)
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    pub fn max_scrollback(&self) -> usize {
        self.max_scrollback
    }

    pub fn set_max_scrollback(&mut self, lines: usize) {
        self.max_scrollback = lines;
        while self.scrollback.len() > lines {
            self.scrollback.pop_back();
        }
    }

    pub fn clear_scrollback(&mut self) {
        self.scrollback.clear();
    }

    // ------------------------------------------------------------------
    // Resize
    // ------------------------------------------------------------------

    /// Resize preserving content. Rows shrunk away at the top move into
    /// scrollback; new rows appear blank at the bottom. Column changes
    /// pad with blanks or truncate without splitting wide characters.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.max(1);
        let cols = cols.max(1);

        if rows != self.rows {
            while self.screen.len() < rows {
                self.screen.push(Line::new(self.cols));
            }
            while self.screen.len() > rows {
                let line = self.screen.remove(0);
                self.push_scrollback(line);
            }
            self.rows = rows;
        }

        if cols != self.cols {
            for line in &mut self.screen {
                line.resize(cols);
            }
            self.cols = cols;
        }

        self.dirty = vec![true; rows];
    }

    // ------------------------------------------------------------------
    // Dirty tracking
    // ------------------------------------------------------------------

    pub fn mark_dirty(&mut self, row: usize) {
        if let Some(flag) = self.dirty.get_mut(row) {
            *flag = true;
        }
    }

    /// Mark `[start, end)` dirty, clamped.
    pub fn mark_dirty_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.rows);
        for row in start..end {
            self.dirty[row] = true;
        }
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.fill(true);
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.fill(false);
    }

    pub fn is_dirty(&self, row: usize) -> bool {
        self.dirty.get(row).copied().unwrap_or(false)
    }

    pub fn has_dirty(&self) -> bool {
        self.dirty.iter().any(|&d| d)
    }

    pub fn dirty_rows(&self) -> Vec<usize> {
        self.dirty
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| d.then_some(i))
            .collect()
    }

    // ------------------------------------------------------------------
    // Text extraction
    // ------------------------------------------------------------------

    pub fn row_text(&self, row: usize) -> String {
        self.screen.get(row).map(Line::text).unwrap_or_default()
    }

    /// Text of the rectangle-ish region from (start_row, start_col) to
    /// (end_row, end_col), rows joined with '\n'. The first and last rows
    /// honor the column bounds; width-0 cells are skipped and trailing
    /// blanks trimmed per row.
    pub fn region_text(
        &self,
        start_row: usize,
        start_col: usize,
        end_row: usize,
        end_col: usize,
    ) -> String {
        let start_row = start_row.min(self.rows.saturating_sub(1));
        let end_row = end_row.min(self.rows.saturating_sub(1));
        let mut out = String::new();

        for row in start_row..=end_row {
            let col_start = if row == start_row { start_col } else { 0 };
            let col_end = if row == end_row { end_col } else { self.cols };

            let mut text = String::new();
            if let Some(line) = self.screen.get(row) {
                let col_end = col_end.min(self.cols);
                for col in col_start..col_end {
                    if let Some(cell) = line.get(col) {
                        cell.write_text(&mut text);
                    }
                }
            }
            text.truncate(text.trim_end_matches(' ').len());
            out.push_str(&text);
            if row < end_row {
                out.push('\n');
            }
        }
        out
    }

    pub fn all_text(&self) -> String {
        self.region_text(0, 0, self.rows.saturating_sub(1), self.cols)
    }
}
