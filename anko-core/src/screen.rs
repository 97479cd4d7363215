//! Emulator-side screen model.
//!
//! A `Screen` is one of the two buffers (primary or alternate) the VT
//! interpreter mutates: a grid of lines plus the cursor, the current pen,
//! the scroll region, tab stops and the wrap state. It knows nothing about
//! scrollback; scroll-up at the top of the screen *returns* the evicted
//! lines and the caller decides whether they are history.

use unicode_width::UnicodeWidthChar;

use crate::cell::{Attributes, Cell};
use crate::color::Color;
use crate::cursor::{Cursor, SavedCursor};
use crate::line::Line;

/// Inclusive scroll region rows, DECSTBM-style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    pub fn full(rows: usize) -> Self {
        ScrollRegion {
            top: 0,
            bottom: rows.saturating_sub(1),
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.top && row <= self.bottom
    }
}

#[derive(Debug, Clone)]
struct TabStops {
    stops: Vec<bool>,
}

impl TabStops {
    fn new(cols: usize) -> Self {
        let mut stops = vec![false; cols];
        for i in (0..cols).step_by(8) {
            stops[i] = true;
        }
        TabStops { stops }
    }

    fn set(&mut self, col: usize) {
        if col < self.stops.len() {
            self.stops[col] = true;
        }
    }

    fn clear(&mut self, col: usize) {
        if col < self.stops.len() {
            self.stops[col] = false;
        }
    }

    fn clear_all(&mut self) {
        self.stops.fill(false);
    }

    fn next_stop(&self, col: usize) -> usize {
        for i in (col + 1)..self.stops.len() {
            if self.stops[i] {
                return i;
            }
        }
        self.stops.len().saturating_sub(1)
    }

    fn resize(&mut self, new_cols: usize) {
        let old = self.stops.len();
        self.stops.resize(new_cols, false);
        for i in old..new_cols {
            self.stops[i] = i % 8 == 0;
        }
    }
}

/// Result of writing one character: the damaged span and any lines a
/// wrap-triggered scroll evicted from the top of the screen.
#[derive(Debug, Default)]
pub struct PutResult {
    pub row: usize,
    pub col_start: usize,
    pub col_end: usize,
    /// `Some` when an autowrap linefeed scrolled the region; holds the
    /// evicted lines (empty unless the region starts at row 0).
    pub scrolled: Option<Vec<Line>>,
}

#[derive(Debug, Clone)]
pub struct Screen {
    cols: usize,
    rows: usize,
    grid: Vec<Line>,

    pub cursor: Cursor,
    saved_cursor: Option<SavedCursor>,
    scroll_region: ScrollRegion,

    // Current pen.
    pub attrs: Attributes,
    pub fg: Color,
    pub bg: Color,

    pub origin_mode: bool,
    pub autowrap: bool,
    pub insert_mode: bool,

    tabs: TabStops,
    pending_wrap: bool,
}

impl Screen {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Screen {
            cols,
            rows,
            grid: (0..rows).map(|_| Line::new(cols)).collect(),
            cursor: Cursor::new(),
            saved_cursor: None,
            scroll_region: ScrollRegion::full(rows),
            attrs: Attributes::NONE,
            fg: Color::Default,
            bg: Color::Default,
            origin_mode: false,
            autowrap: true,
            insert_mode: false,
            tabs: TabStops::new(cols),
            pending_wrap: false,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn scroll_region(&self) -> ScrollRegion {
        self.scroll_region
    }

    pub fn line(&self, row: usize) -> Option<&Line> {
        self.grid.get(row)
    }

    pub fn line_mut(&mut self, row: usize) -> Option<&mut Line> {
        self.grid.get_mut(row)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid.get(row).and_then(|line| line.get(col))
    }

    fn blank_line(&self) -> Line {
        let mut line = Line::new(self.cols);
        if self.bg != Color::Default {
            line.clear_with_bg(self.bg);
        }
        line
    }

    /// Write one decoded character at the cursor, handling autowrap,
    /// insert mode, wide characters and combining marks.
    pub fn put_char(&mut self, ch: char) -> PutResult {
        let mut width = ch.width().unwrap_or(1);

        if width == 0 {
            return self.attach_combining(ch);
        }
        // A one-column screen cannot host a wide pair at all.
        if width == 2 && self.cols < 2 {
            width = 1;
        }

        let mut result = PutResult::default();

        if self.pending_wrap && self.autowrap {
            self.pending_wrap = false;
            self.cursor.col = 0;
            result.scrolled = self.linefeed();
        }

        // A wide character must not start in the last column.
        if width == 2 && self.cursor.col + 1 >= self.cols {
            if self.autowrap && self.cols >= 2 {
                let row = self.cursor.row;
                let last = self.cols - 1;
                let bg = self.bg;
                if let Some(cell) = self.grid.get_mut(row).and_then(|line| line.get_mut(last)) {
                    cell.clear_with_bg(bg);
                }
                self.cursor.col = 0;
                let scrolled = self.linefeed();
                if scrolled.is_some() {
                    result.scrolled = scrolled;
                }
            } else {
                self.cursor.col = self.cols.saturating_sub(2);
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let (fg, bg, attrs) = (self.fg, self.bg, self.attrs);

        if self.insert_mode {
            if let Some(line) = self.grid.get_mut(row) {
                line.insert_cells(col, width);
            }
        }

        if let Some(line) = self.grid.get_mut(row) {
            line.set(col, Cell::with_pen(ch, fg, bg, attrs, width as u8));
            if width == 2 && col + 1 < self.cols {
                line.set(col + 1, Cell::wide_companion(fg, bg));
            }
        }

        result.row = row;
        result.col_start = col;
        result.col_end = (col + width).min(self.cols);

        let next = col + width;
        if next >= self.cols {
            self.cursor.col = self.cols - 1;
            self.pending_wrap = true;
        } else {
            self.cursor.col = next;
        }

        result
    }

    /// Attach a zero-width character to the cell it combines with.
    fn attach_combining(&mut self, ch: char) -> PutResult {
        let row = self.cursor.row;
        // After a printed character the cursor sits one past it, unless a
        // wrap is pending in which case it still covers the character.
        let mut col = if self.pending_wrap {
            self.cursor.col
        } else {
            match self.cursor.col.checked_sub(1) {
                Some(c) => c,
                None => return PutResult::default(),
            }
        };
        if self
            .grid
            .get(row)
            .and_then(|l| l.get(col))
            .is_some_and(|c| c.is_wide_companion())
        {
            col = match col.checked_sub(1) {
                Some(c) => c,
                None => return PutResult::default(),
            };
        }
        if let Some(cell) = self.grid.get_mut(row).and_then(|l| l.get_mut(col)) {
            cell.push_combining(ch);
        }
        PutResult {
            row,
            col_start: col,
            col_end: col + 1,
            scrolled: None,
        }
    }

    /// LF/IND: move down, scrolling the region when at its bottom.
    /// Returns `Some(evicted)` when a scroll happened.
    pub fn linefeed(&mut self) -> Option<Vec<Line>> {
        self.pending_wrap = false;
        if self.cursor.row == self.scroll_region.bottom {
            Some(self.scroll_up(1))
        } else {
            if self.cursor.row + 1 < self.rows {
                self.cursor.row += 1;
            }
            None
        }
    }

    /// RI: move up, scrolling the region down when at its top.
    /// Returns true when a scroll happened.
    pub fn reverse_index(&mut self) -> bool {
        self.pending_wrap = false;
        if self.cursor.row == self.scroll_region.top {
            self.scroll_down(1);
            true
        } else {
            self.cursor.row = self.cursor.row.saturating_sub(1);
            false
        }
    }

    pub fn carriage_return(&mut self) {
        self.pending_wrap = false;
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        self.pending_wrap = false;
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    pub fn tab(&mut self) {
        self.pending_wrap = false;
        self.cursor.col = self.tabs.next_stop(self.cursor.col).min(self.cols - 1);
    }

    pub fn set_tab_stop(&mut self) {
        self.tabs.set(self.cursor.col);
    }

    /// TBC: 0 clears the stop at the cursor, 3 clears them all.
    pub fn clear_tab_stops(&mut self, mode: u16) {
        match mode {
            0 => self.tabs.clear(self.cursor.col),
            3 => self.tabs.clear_all(),
            _ => {}
        }
    }

    /// Scroll the region up by `count`, returning lines evicted off the
    /// top of the screen (only when the region starts at row 0).
    pub fn scroll_up(&mut self, count: usize) -> Vec<Line> {
        let ScrollRegion { top, bottom } = self.scroll_region;
        if count == 0 || top > bottom {
            return Vec::new();
        }
        let count = count.min(bottom - top + 1);

        let mut evicted = Vec::new();
        for _ in 0..count {
            let line = self.grid.remove(top);
            if top == 0 {
                evicted.push(line);
            }
            self.grid.insert(bottom, self.blank_line());
        }
        evicted
    }

    /// Scroll the region down by `count`; blank lines enter at the top.
    pub fn scroll_down(&mut self, count: usize) {
        let ScrollRegion { top, bottom } = self.scroll_region;
        if count == 0 || top > bottom {
            return;
        }
        let count = count.min(bottom - top + 1);

        for _ in 0..count {
            self.grid.remove(bottom);
            self.grid.insert(top, self.blank_line());
        }
    }

    /// Absolute move, honoring origin mode; clamped, never wrapped.
    pub fn move_cursor_to(&mut self, row: usize, col: usize) {
        self.pending_wrap = false;
        let (min_row, max_row) = if self.origin_mode {
            (self.scroll_region.top, self.scroll_region.bottom)
        } else {
            (0, self.rows - 1)
        };
        let row = if self.origin_mode {
            self.scroll_region.top + row
        } else {
            row
        };
        self.cursor.row = row.clamp(min_row, max_row);
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn move_cursor_up(&mut self, n: usize) {
        self.pending_wrap = false;
        let min_row = if self.origin_mode {
            self.scroll_region.top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(n).max(min_row);
    }

    pub fn move_cursor_down(&mut self, n: usize) {
        self.pending_wrap = false;
        let max_row = if self.origin_mode {
            self.scroll_region.bottom
        } else {
            self.rows - 1
        };
        self.cursor.row = (self.cursor.row + n).min(max_row);
    }

    pub fn move_cursor_forward(&mut self, n: usize) {
        self.pending_wrap = false;
        self.cursor.col = (self.cursor.col + n).min(self.cols - 1);
    }

    pub fn move_cursor_backward(&mut self, n: usize) {
        self.pending_wrap = false;
        self.cursor.col = self.cursor.col.saturating_sub(n);
    }

    pub fn move_cursor_to_col(&mut self, col: usize) {
        self.pending_wrap = false;
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn move_cursor_to_row(&mut self, row: usize) {
        let col = self.cursor.col;
        self.move_cursor_to(row, col);
    }

    /// ED: 0 = cursor to end, 1 = start to cursor, 2 and 3 = everything.
    pub fn erase_in_display(&mut self, mode: u16) {
        let (row, col, cols, rows, bg) =
            (self.cursor.row, self.cursor.col, self.cols, self.rows, self.bg);
        match mode {
            0 => {
                if let Some(line) = self.grid.get_mut(row) {
                    line.clear_range_with_bg(col, cols, bg);
                }
                for r in (row + 1)..rows {
                    self.grid[r].clear_with_bg(bg);
                }
            }
            1 => {
                for r in 0..row {
                    self.grid[r].clear_with_bg(bg);
                }
                if let Some(line) = self.grid.get_mut(row) {
                    line.clear_range_with_bg(0, col + 1, bg);
                }
            }
            2 | 3 => {
                for line in &mut self.grid {
                    line.clear_with_bg(bg);
                }
            }
            _ => {}
        }
    }

    /// EL: 0 = cursor to end, 1 = start through cursor, 2 = whole line.
    pub fn erase_in_line(&mut self, mode: u16) {
        let (row, col, cols, bg) = (self.cursor.row, self.cursor.col, self.cols, self.bg);
        if let Some(line) = self.grid.get_mut(row) {
            match mode {
                0 => line.clear_range_with_bg(col, cols, bg),
                1 => line.clear_range_with_bg(0, col + 1, bg),
                2 => line.clear_with_bg(bg),
                _ => {}
            }
        }
    }

    /// ECH: blank `count` cells at the cursor without moving anything.
    pub fn erase_chars(&mut self, count: usize) {
        let (row, col, cols, bg) = (self.cursor.row, self.cursor.col, self.cols, self.bg);
        if let Some(line) = self.grid.get_mut(row) {
            line.clear_range_with_bg(col, (col + count).min(cols), bg);
        }
    }

    /// IL: blank lines enter at the cursor, pushing lines out of the
    /// region bottom. No-op outside the scroll region.
    pub fn insert_lines(&mut self, count: usize) {
        self.pending_wrap = false;
        let row = self.cursor.row;
        let bottom = self.scroll_region.bottom;
        if !self.scroll_region.contains(row) {
            return;
        }
        let count = count.min(bottom - row + 1);
        for _ in 0..count {
            self.grid.remove(bottom);
            self.grid.insert(row, self.blank_line());
        }
    }

    /// DL: lines at the cursor leave, blanks enter at the region bottom.
    pub fn delete_lines(&mut self, count: usize) {
        self.pending_wrap = false;
        let row = self.cursor.row;
        let bottom = self.scroll_region.bottom;
        if !self.scroll_region.contains(row) {
            return;
        }
        let count = count.min(bottom - row + 1);
        for _ in 0..count {
            self.grid.remove(row);
            self.grid.insert(bottom, self.blank_line());
        }
    }

    pub fn insert_chars(&mut self, count: usize) {
        self.pending_wrap = false;
        let (row, col) = (self.cursor.row, self.cursor.col);
        if let Some(line) = self.grid.get_mut(row) {
            line.insert_cells(col, count);
        }
    }

    pub fn delete_chars(&mut self, count: usize) {
        self.pending_wrap = false;
        let (row, col) = (self.cursor.row, self.cursor.col);
        if let Some(line) = self.grid.get_mut(row) {
            line.delete_cells(col, count);
        }
    }

    /// DECSTBM with zero-based, inclusive rows; cursor goes home.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let top = top.min(self.rows - 1);
        let bottom = bottom.min(self.rows - 1);
        if top < bottom {
            self.scroll_region = ScrollRegion { top, bottom };
            self.move_cursor_to(0, 0);
        }
    }

    pub fn reset_scroll_region(&mut self) {
        self.scroll_region = ScrollRegion::full(self.rows);
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            attrs: self.attrs,
            fg: self.fg,
            bg: self.bg,
            origin_mode: self.origin_mode,
            autowrap: self.autowrap,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor {
            self.cursor.row = saved.row.min(self.rows - 1);
            self.cursor.col = saved.col.min(self.cols - 1);
            self.attrs = saved.attrs;
            self.fg = saved.fg;
            self.bg = saved.bg;
            self.origin_mode = saved.origin_mode;
            self.autowrap = saved.autowrap;
        }
        self.pending_wrap = false;
    }

    /// Resize preserving content. Shrinking drops rows from the top so
    /// the bottom of the output stays visible; the grid mirror is what
    /// preserves dropped rows as history.
    pub fn resize(&mut self, new_rows: usize, new_cols: usize) {
        let new_rows = new_rows.max(1);
        let new_cols = new_cols.max(1);
        if new_rows == self.rows && new_cols == self.cols {
            return;
        }

        for line in &mut self.grid {
            line.resize(new_cols);
        }

        while self.grid.len() < new_rows {
            self.grid.push(Line::new(new_cols));
        }
        while self.grid.len() > new_rows {
            self.grid.remove(0);
            self.cursor.row = self.cursor.row.saturating_sub(1);
        }

        self.rows = new_rows;
        self.cols = new_cols;
        self.cursor.row = self.cursor.row.min(new_rows - 1);
        self.cursor.col = self.cursor.col.min(new_cols - 1);
        self.scroll_region = ScrollRegion::full(new_rows);
        self.tabs.resize(new_cols);
        self.pending_wrap = false;
    }

    /// RIS-level reset of everything but the dimensions.
    pub fn reset(&mut self) {
        self.cursor = Cursor::new();
        self.saved_cursor = None;
        self.scroll_region = ScrollRegion::full(self.rows);
        self.attrs = Attributes::NONE;
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.origin_mode = false;
        self.autowrap = true;
        self.insert_mode = false;
        self.tabs = TabStops::new(self.cols);
        self.pending_wrap = false;
        for line in &mut self.grid {
            line.clear();
        }
    }

    /// Clear every cell, keeping cursor and modes (alt-screen entry).
    pub fn clear_all(&mut self) {
        for line in &mut self.grid {
            line.clear();
        }
    }
}

impl Default for Screen {
    fn default() -> Self {
        Screen::new(crate::DEFAULT_ROWS, crate::DEFAULT_COLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_char_advances_cursor() {
        let mut screen = Screen::new(24, 80);
        let r = screen.put_char('A');
        assert_eq!((r.row, r.col_start, r.col_end), (0, 0, 1));
        assert_eq!(screen.cell(0, 0).unwrap().ch, 'A');
        assert_eq!(screen.cursor.col, 1);
    }

    #[test]
    fn autowrap_is_deferred() {
        let mut screen = Screen::new(5, 10);
        for _ in 0..10 {
            screen.put_char('x');
        }
        // Cursor parks on the last column until the next character.
        assert_eq!(screen.cursor.col, 9);
        assert_eq!(screen.cursor.row, 0);
        screen.put_char('y');
        assert_eq!(screen.cursor.row, 1);
        assert_eq!(screen.cell(1, 0).unwrap().ch, 'y');
    }

    #[test]
    fn wide_char_writes_companion() {
        let mut screen = Screen::new(24, 80);
        let r = screen.put_char('\u{3042}');
        assert_eq!((r.col_start, r.col_end), (0, 2));
        assert_eq!(screen.cell(0, 0).unwrap().width, 2);
        assert!(screen.cell(0, 1).unwrap().is_wide_companion());
        assert_eq!(screen.cursor.col, 2);
    }

    #[test]
    fn wide_char_never_starts_in_last_column() {
        let mut screen = Screen::new(5, 4);
        screen.move_cursor_to(0, 3);
        screen.put_char('\u{3042}');
        assert_eq!(screen.cursor.row, 1);
        assert_eq!(screen.cell(1, 0).unwrap().width, 2);
        assert!(!screen.cell(0, 3).unwrap().is_wide());
    }

    #[test]
    fn combining_attaches_to_previous_cell() {
        let mut screen = Screen::new(24, 80);
        screen.put_char('e');
        let r = screen.put_char('\u{0301}');
        assert_eq!((r.col_start, r.col_end), (0, 1));
        assert_eq!(screen.cell(0, 0).unwrap().combining(), &['\u{0301}']);
        assert_eq!(screen.cursor.col, 1);
    }

    #[test]
    fn linefeed_scrolls_at_region_bottom() {
        let mut screen = Screen::new(3, 10);
        screen.put_char('A');
        screen.move_cursor_to(2, 0);
        let evicted = screen.linefeed().expect("should scroll");
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].text(), "A");
        assert_eq!(screen.cursor.row, 2);
    }

    #[test]
    fn scroll_inside_region_evicts_nothing() {
        let mut screen = Screen::new(5, 10);
        screen.set_scroll_region(1, 3);
        screen.move_cursor_to(3, 0);
        // Region top is not row 0, so nothing becomes history.
        assert!(screen.scroll_up(1).is_empty());
    }

    #[test]
    fn erase_in_line_from_cursor() {
        let mut screen = Screen::new(3, 10);
        for c in "ABCDEFGH".chars() {
            screen.put_char(c);
        }
        screen.move_cursor_to(0, 4);
        screen.erase_in_line(0);
        assert_eq!(screen.line(0).unwrap().text(), "ABCD");
    }

    #[test]
    fn insert_delete_lines_respect_region() {
        let mut screen = Screen::new(5, 10);
        for (i, c) in "ABCDE".chars().enumerate() {
            screen.move_cursor_to(i, 0);
            screen.put_char(c);
        }
        screen.set_scroll_region(1, 3);
        screen.move_cursor_to(1, 0);
        screen.delete_lines(1);
        assert_eq!(screen.line(1).unwrap().text(), "C");
        assert_eq!(screen.line(3).unwrap().text(), "");
        // Row outside the region is untouched.
        assert_eq!(screen.line(4).unwrap().text(), "E");
    }

    #[test]
    fn origin_mode_clamps_to_region() {
        let mut screen = Screen::new(10, 20);
        screen.set_scroll_region(2, 7);
        screen.origin_mode = true;
        screen.move_cursor_to(0, 0);
        assert_eq!(screen.cursor.row, 2);
        screen.move_cursor_to(99, 0);
        assert_eq!(screen.cursor.row, 7);
    }

    #[test]
    fn save_restore_cursor_round_trips_pen() {
        let mut screen = Screen::new(10, 20);
        screen.move_cursor_to(4, 6);
        screen.attrs.bold = true;
        screen.fg = Color::Indexed(1);
        screen.save_cursor();

        screen.move_cursor_to(0, 0);
        screen.attrs.reset();
        screen.fg = Color::Default;

        screen.restore_cursor();
        assert_eq!((screen.cursor.row, screen.cursor.col), (4, 6));
        assert!(screen.attrs.bold);
        assert_eq!(screen.fg, Color::Indexed(1));
    }

    #[test]
    fn resize_keeps_bottom_rows() {
        let mut screen = Screen::new(4, 10);
        for (i, c) in "ABCD".chars().enumerate() {
            screen.move_cursor_to(i, 0);
            screen.put_char(c);
        }
        screen.resize(2, 10);
        assert_eq!(screen.line(0).unwrap().text(), "C");
        assert_eq!(screen.line(1).unwrap().text(), "D");
        assert_eq!(screen.rows(), 2);
    }

    #[test]
    fn tab_stops_every_eight() {
        let mut screen = Screen::new(5, 40);
        screen.tab();
        assert_eq!(screen.cursor.col, 8);
        screen.tab();
        assert_eq!(screen.cursor.col, 16);
        screen.clear_tab_stops(3);
        screen.move_cursor_to(0, 0);
        screen.tab();
        assert_eq!(screen.cursor.col, 39);
    }
}
