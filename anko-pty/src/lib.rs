//! Pseudo-terminal plumbing.
//!
//! This crate owns everything that touches the operating system on behalf
//! of a terminal session: the PTY master/slave pair, the shell child
//! process wired to the slave, and the reader thread that moves shell
//! output to the embedding layer through a callback.
//!
//! The host pseudo-console of the design maps onto the POSIX PTY: the
//! slave end becomes the child's controlling terminal with stdio dup'd
//! onto it, and resize requests become `TIOCSWINSZ` plus a `SIGWINCH`.

pub mod child;
pub mod error;
pub mod pty;
pub mod session;

pub use child::ShellChild;
pub use error::PtyError;
pub use pty::{Pty, WinSize};
pub use session::{PtyConfig, PtySession, PtyState};
