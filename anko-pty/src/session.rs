//! PTY session: pseudo-terminal, shell child and reader thread under one
//! owner.
//!
//! Lifecycle: `Idle --start--> Running --child exit--> Exited`, or
//! `Running --stop--> Idle`. The reader thread performs blocking polls on
//! the master plus a wake pipe; `stop` writes the wake byte, joins with a
//! bounded wait, force-terminates the child and closes every descriptor.
//! Callbacks fire on the reader thread and must be installed before
//! `start`.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::child::{self, ShellChild};
use crate::error::PtyError;
use crate::pty::{Pty, WinSize};

/// Read chunk for the PTY output pipe.
const READ_CHUNK: usize = 4096;

/// Bound on how long `stop` waits for the reader to come back.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

pub type OutputCallback = dyn Fn(&[u8]) + Send + Sync;
pub type ExitCallback = dyn Fn(u32) + Send + Sync;
pub type ErrorCallback = dyn Fn(&PtyError) + Send + Sync;

/// Configuration for starting a shell session.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub shell: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub rows: u16,
    pub cols: u16,
}

impl Default for PtyConfig {
    fn default() -> Self {
        PtyConfig {
            shell: default_shell(),
            args: Vec::new(),
            working_dir: None,
            rows: 25,
            cols: 80,
        }
    }
}

/// The login shell from the environment, or a safe fallback.
pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PtyState {
    Idle = 0,
    Running = 1,
    Exited = 2,
}

impl PtyState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => PtyState::Running,
            2 => PtyState::Exited,
            _ => PtyState::Idle,
        }
    }
}

struct Shared {
    state: AtomicU8,
    stop_requested: AtomicBool,
}

struct ReaderCtx {
    pty: Arc<Pty>,
    wake_rx: OwnedFd,
    child: ShellChild,
    shared: Arc<Shared>,
    output_cb: Option<Arc<OutputCallback>>,
    exit_cb: Option<Arc<ExitCallback>>,
    error_cb: Option<Arc<ErrorCallback>>,
}

pub struct PtySession {
    output_cb: Option<Arc<OutputCallback>>,
    exit_cb: Option<Arc<ExitCallback>>,
    error_cb: Option<Arc<ErrorCallback>>,

    shared: Arc<Shared>,
    pty: Option<Arc<Pty>>,
    child: Option<ShellChild>,
    reader: Option<JoinHandle<()>>,
    wake_tx: Option<OwnedFd>,

    size: WinSize,
    last_error: Mutex<Option<String>>,
}

impl Default for PtySession {
    fn default() -> Self {
        Self::new()
    }
}

impl PtySession {
    pub fn new() -> Self {
        PtySession {
            output_cb: None,
            exit_cb: None,
            error_cb: None,
            shared: Arc::new(Shared {
                state: AtomicU8::new(PtyState::Idle as u8),
                stop_requested: AtomicBool::new(false),
            }),
            pty: None,
            child: None,
            reader: None,
            wake_tx: None,
            size: WinSize::default(),
            last_error: Mutex::new(None),
        }
    }

    /// Install the shell-output callback; fires on the reader thread.
    pub fn set_output_callback<F>(&mut self, cb: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.output_cb = Some(Arc::new(cb));
    }

    /// Install the exit callback; fires on the reader thread once the
    /// child is gone and reaped.
    pub fn set_exit_callback<F>(&mut self, cb: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.exit_cb = Some(Arc::new(cb));
    }

    /// Install the callback for reader I/O faults other than hangup.
    pub fn set_error_callback<F>(&mut self, cb: F)
    where
        F: Fn(&PtyError) + Send + Sync + 'static,
    {
        self.error_cb = Some(Arc::new(cb));
    }

    pub fn state(&self) -> PtyState {
        PtyState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == PtyState::Running
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(ShellChild::pid)
    }

    pub fn size(&self) -> WinSize {
        self.size
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|g| g.clone())
    }

    fn set_last_error(&self, message: String) {
        log::error!("{message}");
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(message);
        }
    }

    /// Open the PTY, spawn the shell and launch the reader thread.
    /// On any failure every partially created resource is released.
    pub fn start(&mut self, config: &PtyConfig) -> Result<(), PtyError> {
        if self.is_running() {
            return Err(PtyError::AlreadyRunning);
        }

        let size = WinSize::new(config.rows, config.cols);
        let pty = Arc::new(Pty::open_with_size(size)?);

        let child = child::spawn_shell(
            &pty,
            &config.shell,
            &config.args,
            config.working_dir.as_deref(),
        )?;

        let (wake_rx, wake_tx) = match wake_pipe() {
            Ok(pair) => pair,
            Err(e) => {
                child.kill();
                child.wait();
                return Err(PtyError::PipeCreationFailed(e));
            }
        };

        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared
            .state
            .store(PtyState::Running as u8, Ordering::SeqCst);

        let ctx = ReaderCtx {
            pty: Arc::clone(&pty),
            wake_rx,
            child: child.observer(),
            shared: Arc::clone(&self.shared),
            output_cb: self.output_cb.clone(),
            exit_cb: self.exit_cb.clone(),
            error_cb: self.error_cb.clone(),
        };
        let reader = thread::Builder::new()
            .name("pty-reader".into())
            .spawn(move || reader_loop(ctx))
            .map_err(|e| {
                child.kill();
                child.wait();
                self.shared
                    .state
                    .store(PtyState::Idle as u8, Ordering::SeqCst);
                PtyError::ProcessLaunchFailed {
                    shell: config.shell.clone(),
                    message: format!("failed to spawn reader thread: {e}"),
                }
            })?;

        log::debug!(
            "pty session started: shell={} pid={} size={}x{}",
            config.shell,
            child.pid(),
            config.cols,
            config.rows
        );

        self.pty = Some(pty);
        self.child = Some(child);
        self.reader = Some(reader);
        self.wake_tx = Some(wake_tx);
        self.size = size;
        Ok(())
    }

    /// Wake the reader, join it (bounded), terminate the child and close
    /// everything. Safe to call in any state.
    pub fn stop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        if let Some(wake) = &self.wake_tx {
            let byte = [0u8; 1];
            unsafe { libc::write(wake.as_raw_fd(), byte.as_ptr().cast(), 1) };
        }

        if let Some(handle) = self.reader.take() {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                // Leave the thread detached rather than blocking the UI.
                self.set_last_error("reader thread did not exit within join timeout".into());
            }
        }

        if let Some(child) = self.child.take() {
            child.kill();
            child.wait();
        }

        self.wake_tx = None;
        self.pty = None;
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared
            .state
            .store(PtyState::Idle as u8, Ordering::SeqCst);
    }

    /// Blocking write to the shell's input. Returns the bytes accepted;
    /// short writes are the caller's retry signal.
    pub fn write(&self, data: &[u8]) -> Result<usize, PtyError> {
        if !self.is_running() {
            return Err(PtyError::NotRunning);
        }
        let pty = self.pty.as_ref().ok_or(PtyError::NotRunning)?;
        loop {
            let n =
                unsafe { libc::write(pty.master_fd(), data.as_ptr().cast(), data.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            self.set_last_error(format!("pty write failed: {err}"));
            return Err(PtyError::Write(err));
        }
    }

    /// Resize the pseudo-terminal and notify the child.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        let pty = self.pty.as_ref().ok_or(PtyError::NotRunning)?;
        let size = WinSize::new(rows, cols);
        pty.set_size(size).map_err(|e| {
            self.set_last_error(format!("pty resize failed: {e}"));
            PtyError::Resize(e)
        })?;
        if let Some(child) = &self.child {
            child.signal(nix::sys::signal::Signal::SIGWINCH);
        }
        self.size = size;
        Ok(())
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// CLOEXEC pipe used to cancel the reader's blocking poll.
fn wake_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0i32; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    for fd in fds {
        if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fds[0]);
                libc::close(fds[1]);
            }
            return Err(err);
        }
    }
    unsafe { Ok((OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))) }
}

fn reader_loop(ctx: ReaderCtx) {
    let mut buf = [0u8; READ_CHUNK];
    let master_fd = ctx.pty.master_fd();
    let wake_fd = ctx.wake_rx.as_raw_fd();
    let mut synthetic_code: Option<u32> = None;

    loop {
        let mut fds = [
            libc::pollfd {
                fd: master_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: wake_fd,
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            synthetic_code = Some(err.raw_os_error().unwrap_or(1) as u32);
            if let Some(cb) = &ctx.error_cb {
                cb(&PtyError::ReaderIo(err));
            }
            break;
        }
        if fds[1].revents != 0 {
            // Stop requested.
            break;
        }
        if fds[0].revents == 0 {
            continue;
        }

        let n = unsafe { libc::read(master_fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n > 0 {
            if let Some(cb) = &ctx.output_cb {
                cb(&buf[..n as usize]);
            }
            continue;
        }
        if n == 0 {
            break;
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            // The master reads EIO once the slave side is gone; that is
            // the normal end of the stream, not a fault.
            Some(libc::EIO) => break,
            _ => {
                log::error!("pty read failed: {err}");
                synthetic_code = Some(err.raw_os_error().unwrap_or(1) as u32);
                if let Some(cb) = &ctx.error_cb {
                    cb(&PtyError::ReaderIo(err));
                }
                break;
            }
        }
    }

    if ctx.shared.stop_requested.load(Ordering::SeqCst) {
        // stop() owns the rest of the teardown.
        return;
    }

    let code = synthetic_code.unwrap_or_else(|| ctx.child.wait());
    ctx.shared
        .state
        .store(PtyState::Exited as u8, Ordering::SeqCst);
    log::debug!("shell exited with code {code}");
    if let Some(cb) = &ctx.exit_cb {
        cb(code);
    }
}
