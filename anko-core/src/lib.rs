//! Terminal data model shared by the parser, the PTY pump and the renderer.
//!
//! This crate owns the passive state of a terminal session:
//! - [`cell::Cell`] and [`color::Color`]: a single screen position
//! - [`line::Line`]: one row of cells, moved by value when scrolling
//! - [`screen::Screen`]: the emulator-side mutable screen (cursor, pen,
//!   scroll region, tab stops)
//! - [`grid::TermGrid`]: the render-facing mirror with scrollback and
//!   dirty-row tracking
//! - [`ring::RingBuffer`]: the SPSC byte queue between the PTY reader
//!   thread and the UI thread

pub mod cell;
pub mod color;
pub mod cursor;
pub mod grid;
pub mod line;
pub mod ring;
pub mod screen;

pub use cell::{Attributes, Cell, UnderlineStyle};
pub use color::{Color, Rgb};
pub use cursor::{Cursor, CursorStyle, SavedCursor};
pub use grid::{GridError, TermGrid};
pub use line::Line;
pub use ring::RingBuffer;
pub use screen::{Screen, ScrollRegion};

pub const DEFAULT_ROWS: usize = 25;
pub const DEFAULT_COLS: usize = 80;
pub const DEFAULT_SCROLLBACK_LINES: usize = 10000;
