//! Streaming VT/xterm escape sequence parser.
//!
//! The parser is a byte-level state machine following ECMA-48 and the
//! xterm control-sequence conventions. It turns raw PTY output into
//! semantic [`Action`] values; interpretation (screens, cursor, modes)
//! lives a layer above. It tolerates arbitrary chunk boundaries, never
//! panics on malformed input, and replaces invalid UTF-8 with U+FFFD.

pub mod action;
pub mod params;
pub mod parser;

pub use action::{c0, c1, Action};
pub use params::Params;
pub use parser::Parser;
