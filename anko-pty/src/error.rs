//! Error types for PTY operations.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("session is already running")]
    AlreadyRunning,

    #[error("session is not running")]
    NotRunning,

    #[error("failed to create pipe: {0}")]
    PipeCreationFailed(#[source] io::Error),

    #[error("failed to open pseudo-terminal: {0}")]
    PseudoConsoleCreationFailed(#[source] io::Error),

    #[error("failed to launch {shell:?}: {message}")]
    ProcessLaunchFailed { shell: String, message: String },

    #[error("write to shell failed: {0}")]
    Write(#[source] io::Error),

    #[error("resize failed: {0}")]
    Resize(#[source] io::Error),

    #[error("reader thread I/O failed: {0}")]
    ReaderIo(#[source] io::Error),
}
