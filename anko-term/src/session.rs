//! The per-tab session object.
//!
//! A session composes one PTY session, one byte ring, one emulator and
//! one grid, and mediates between them. Shell output flows reader thread
//! → ring → (UI thread) `process_output` → emulator → events → grid, so
//! the grid is only ever touched on the UI thread and needs no lock. The
//! reader thread communicates through the lock-free ring and a few
//! atomics.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use anko_core::{GridError, RingBuffer, TermGrid};
use anko_pty::{PtyError, PtySession};

use crate::config::SessionConfig;
use crate::emulator::Emulator;
use crate::event::{Rect, TermEvent, TermProps};
use crate::input::{Key, Modifiers, MouseEvent};

/// Ring between the reader thread and the UI pump.
const RING_CAPACITY: usize = 64 * 1024;

/// Stack buffer for one pump iteration.
const PUMP_CHUNK: usize = 4096;

/// Pause before retrying a full ring.
const BACKPRESSURE_PAUSE: Duration = Duration::from_micros(100);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Pty(#[from] PtyError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("session serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Running = 1,
    Exited = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SessionState::Running,
            2 => SessionState::Exited,
            _ => SessionState::Idle,
        }
    }
}

struct SharedState {
    state: AtomicU8,
    exit_code: AtomicU32,
    stop_requested: AtomicBool,
}

pub type ExitCallback = dyn Fn(u32) + Send + Sync;

pub struct Session {
    config: SessionConfig,
    shared: Arc<SharedState>,

    pty: Option<PtySession>,
    ring: Option<Arc<RingBuffer>>,
    emulator: Option<Emulator>,
    grid: Option<TermGrid>,

    title: String,
    props: TermProps,
    cursor: (usize, usize, bool),
    bell_pending: bool,

    exit_cb: Option<Arc<ExitCallback>>,
    title_cb: Option<Box<dyn FnMut(&str)>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let title = config.title.clone();
        Session {
            config,
            shared: Arc::new(SharedState {
                state: AtomicU8::new(SessionState::Idle as u8),
                exit_code: AtomicU32::new(0),
                stop_requested: AtomicBool::new(false),
            }),
            pty: None,
            ring: None,
            emulator: None,
            grid: None,
            title,
            props: TermProps::default(),
            cursor: (0, 0, true),
            bell_pending: false,
            exit_cb: None,
            title_cb: None,
        }
    }

    /// Fires on the reader thread when the shell exits.
    pub fn set_exit_callback<F>(&mut self, cb: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.exit_cb = Some(Arc::new(cb));
    }

    /// Fires on the UI thread when the shell retitles the window.
    pub fn set_title_callback<F>(&mut self, cb: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.title_cb = Some(Box::new(cb));
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Valid once the session has exited.
    pub fn exit_code(&self) -> u32 {
        self.shared.exit_code.load(Ordering::SeqCst)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn rows(&self) -> u16 {
        self.config.rows
    }

    pub fn cols(&self) -> u16 {
        self.config.cols
    }

    /// The render-facing grid; `None` before the first start.
    pub fn grid(&self) -> Option<&TermGrid> {
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut TermGrid> {
        self.grid.as_mut()
    }

    /// Cursor as (row, col, visible) for the renderer.
    pub fn cursor(&self) -> (usize, usize, bool) {
        self.cursor
    }

    pub fn props(&self) -> &TermProps {
        &self.props
    }

    /// One-shot bell flag, cleared on read.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell_pending)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Allocate grid, ring and emulator, wire the callbacks and start
    /// the shell. No side effects remain if any step fails.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::Pty(PtyError::AlreadyRunning));
        }

        let rows = self.config.rows as usize;
        let cols = self.config.cols as usize;
        let grid = TermGrid::new(rows, cols, self.config.scrollback_lines)?;
        let ring = Arc::new(RingBuffer::with_capacity(RING_CAPACITY));
        let emulator = Emulator::new(rows, cols);

        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared.exit_code.store(0, Ordering::SeqCst);

        let mut pty = PtySession::new();
        {
            // Reader thread side: land bytes in the ring, retrying with
            // a brief pause while the UI thread catches up.
            let ring = Arc::clone(&ring);
            let shared = Arc::clone(&self.shared);
            pty.set_output_callback(move |data| {
                let mut written = 0;
                while written < data.len() && !shared.stop_requested.load(Ordering::Relaxed) {
                    let n = ring.write(&data[written..]);
                    written += n;
                    if n == 0 {
                        thread::sleep(BACKPRESSURE_PAUSE);
                    }
                }
            });
        }
        {
            let shared = Arc::clone(&self.shared);
            let user_exit = self.exit_cb.clone();
            pty.set_exit_callback(move |code| {
                shared.exit_code.store(code, Ordering::SeqCst);
                shared
                    .state
                    .store(SessionState::Exited as u8, Ordering::SeqCst);
                if let Some(cb) = &user_exit {
                    cb(code);
                }
            });
        }
        pty.set_error_callback(|err| {
            log::error!("session reader fault: {err}");
        });

        if let Err(e) = pty.start(&self.config.pty_config()) {
            return Err(SessionError::Pty(e));
        }

        self.pty = Some(pty);
        self.ring = Some(ring);
        self.emulator = Some(emulator);
        self.grid = Some(grid);
        self.shared
            .state
            .store(SessionState::Running as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Tear the shell down. The final screen contents stay readable.
    pub fn stop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        if let Some(mut pty) = self.pty.take() {
            pty.stop();
        }
        self.shared
            .state
            .store(SessionState::Idle as u8, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // UI-thread pump
    // ------------------------------------------------------------------

    /// Drain the ring into the emulator and fan its events out to the
    /// grid, title, bell and PTY reply channel. Non-blocking; returns
    /// immediately when there is nothing to do.
    pub fn process_output(&mut self) {
        let Some(ring) = self.ring.clone() else {
            return;
        };
        let Some(emulator) = self.emulator.as_mut() else {
            return;
        };

        let mut buf = [0u8; PUMP_CHUNK];
        loop {
            let n = ring.read(&mut buf);
            if n == 0 {
                break;
            }
            emulator.input_write(&buf[..n]);
        }
        let events = emulator.drain_events();
        self.apply_events(events);
    }

    fn apply_events(&mut self, events: Vec<TermEvent>) {
        for event in events {
            match event {
                TermEvent::Damage(rect) => self.copy_rect(rect),
                // The session does not implement the move optimization,
                // so both rectangles count as damage.
                TermEvent::MoveRect { dest, src } => {
                    self.copy_rect(dest);
                    self.copy_rect(src);
                }
                TermEvent::MoveCursor { row, col, visible } => {
                    self.cursor = (row, col, visible);
                }
                TermEvent::SetProps(props) => {
                    if props.title != self.title && !props.title.is_empty() {
                        self.title = props.title.clone();
                        if let Some(cb) = &mut self.title_cb {
                            cb(&props.title);
                        }
                    }
                    self.props = props;
                }
                TermEvent::Bell => self.bell_pending = true,
                TermEvent::Resize { .. } => {
                    if let Some(grid) = &mut self.grid {
                        grid.mark_all_dirty();
                    }
                }
                TermEvent::ScrollbackPush(line) => {
                    if let Some(grid) = &mut self.grid {
                        grid.push_scrollback(line);
                    }
                }
                TermEvent::Output(bytes) => {
                    self.write_reply(&bytes);
                }
            }
        }
    }

    /// Copy the emulator's current view of a rectangle into the grid.
    fn copy_rect(&mut self, rect: Rect) {
        let (Some(emulator), Some(grid)) = (&self.emulator, &mut self.grid) else {
            return;
        };
        let row_end = rect.row_end.min(grid.rows());
        let col_end = rect.col_end.min(grid.cols());
        for row in rect.row_start..row_end {
            for col in rect.col_start..col_end {
                if let Some(cell) = emulator.cell(row, col) {
                    grid.set_cell(row, col, cell.clone());
                }
            }
            grid.mark_dirty(row);
        }
    }

    fn write_reply(&self, bytes: &[u8]) {
        let Some(pty) = &self.pty else {
            return;
        };
        let mut written = 0;
        while written < bytes.len() {
            match pty.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) => {
                    log::warn!("dropping {} reply bytes: {e}", bytes.len() - written);
                    break;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Raw write to the shell; only legal while running.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, SessionError> {
        if !self.is_running() {
            return Err(SessionError::Pty(PtyError::NotRunning));
        }
        let pty = self.pty.as_ref().ok_or(PtyError::NotRunning)?;
        Ok(pty.write(data)?)
    }

    /// Encode and send a named key, honoring the emulator's modes.
    pub fn send_key(&mut self, key: Key, mods: Modifiers) {
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.keyboard_key(key, mods);
            let events = emulator.drain_events();
            self.apply_events(events);
        }
    }

    /// Encode and send a typed character; the IME path lands here too.
    pub fn send_char(&mut self, ch: char, mods: Modifiers) {
        self.send_key(Key::Char(ch), mods);
    }

    /// Paste clipboard text, bracketed when the shell asked for it.
    pub fn paste(&mut self, text: &str) {
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.paste(text);
            let events = emulator.drain_events();
            self.apply_events(events);
        }
    }

    /// Forward a mouse event under the active reporting protocol.
    pub fn send_mouse(&mut self, event: MouseEvent, col: u16, row: u16) {
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.mouse_input(event, col, row);
            let events = emulator.drain_events();
            self.apply_events(events);
        }
    }

    // ------------------------------------------------------------------
    // Resize
    // ------------------------------------------------------------------

    /// PTY first so the shell learns the new size before it writes,
    /// then emulator, then grid.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), SessionError> {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if let Some(pty) = self.pty.as_mut() {
            pty.resize(cols, rows)?;
        }
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.resize(rows as usize, cols as usize);
        }
        if let Some(grid) = self.grid.as_mut() {
            grid.resize(rows as usize, cols as usize);
        }
        self.config.rows = rows;
        self.config.cols = cols;
        if let Some(emulator) = self.emulator.as_mut() {
            let events = emulator.drain_events();
            self.apply_events(events);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn serialize(&self) -> Result<String, SessionError> {
        Ok(self.config.to_json()?)
    }

    /// Never fails; malformed input becomes a default config.
    pub fn deserialize(json: &str) -> SessionConfig {
        SessionConfig::from_json(json)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
