//! Per-tab terminal session glue.
//!
//! This crate interprets the parser's actions into screen state
//! ([`emulator::Emulator`]), encodes user input into the bytes shells
//! expect ([`input`]), persists session configuration ([`config`]), and
//! wires PTY, ring buffer, emulator and grid into one per-tab object
//! ([`session::Session`]).

pub mod config;
pub mod emulator;
pub mod event;
pub mod input;
pub mod session;

pub use config::SessionConfig;
pub use emulator::Emulator;
pub use event::{MouseProtocol, Rect, TermEvent, TermProps};
pub use session::{Session, SessionError, SessionState};
