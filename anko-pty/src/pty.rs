//! PTY master/slave pair.
//!
//! Opens the master with `posix_openpt`, keeps it as an owned `File`, and
//! exposes the slave path so the forked child can open and adopt it as
//! its controlling terminal. Window size travels over `TIOCGWINSZ` /
//! `TIOCSWINSZ` ioctls on the master.

use std::ffi::CStr;
use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use crate::error::PtyError;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinSize {
    pub rows: u16,
    pub cols: u16,
}

impl WinSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        WinSize { rows, cols }
    }

    fn to_winsize(self) -> libc::winsize {
        libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }
}

impl Default for WinSize {
    fn default() -> Self {
        WinSize::new(25, 80)
    }
}

#[derive(Debug)]
pub struct Pty {
    master: File,
    slave_path: String,
}

impl Pty {
    /// Open a new PTY master and unlock its slave.
    pub fn open() -> Result<Self, PtyError> {
        let master_fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        if master_fd < 0 {
            return Err(PtyError::PseudoConsoleCreationFailed(
                io::Error::last_os_error(),
            ));
        }

        let cleanup_err = |fd: RawFd| {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            PtyError::PseudoConsoleCreationFailed(err)
        };

        if unsafe { libc::grantpt(master_fd) } != 0 {
            return Err(cleanup_err(master_fd));
        }
        if unsafe { libc::unlockpt(master_fd) } != 0 {
            return Err(cleanup_err(master_fd));
        }

        let slave_path = unsafe {
            let ptr = libc::ptsname(master_fd);
            if ptr.is_null() {
                return Err(cleanup_err(master_fd));
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        };

        // Keep the master out of any child we spawn later.
        if unsafe { libc::fcntl(master_fd, libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
            return Err(cleanup_err(master_fd));
        }

        let master = unsafe { File::from_raw_fd(master_fd) };
        Ok(Pty { master, slave_path })
    }

    pub fn open_with_size(size: WinSize) -> Result<Self, PtyError> {
        let pty = Self::open()?;
        pty.set_size(size).map_err(PtyError::Resize)?;
        Ok(pty)
    }

    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    pub fn master(&self) -> &File {
        &self.master
    }

    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    /// Open the slave device without adopting it as controlling terminal;
    /// the forked child does that itself.
    pub fn open_slave(&self) -> io::Result<File> {
        use std::os::unix::fs::OpenOptionsExt;
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&self.slave_path)
    }

    pub fn set_size(&self, size: WinSize) -> io::Result<()> {
        let ws = size.to_winsize();
        if unsafe { libc::ioctl(self.master_fd(), libc::TIOCSWINSZ, &ws) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn get_size(&self) -> io::Result<WinSize> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(self.master_fd(), libc::TIOCGWINSZ, &mut ws) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(WinSize::new(ws.ws_row, ws.ws_col))
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let fd = self.master_fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_size_roundtrip() {
        let pty = Pty::open_with_size(WinSize::new(30, 100)).expect("open pty");
        assert!(pty.master_fd() >= 0);
        assert!(pty.slave_path().starts_with("/dev/"));

        let size = pty.get_size().expect("get size");
        assert_eq!(size, WinSize::new(30, 100));

        pty.set_size(WinSize::new(24, 80)).expect("set size");
        assert_eq!(pty.get_size().unwrap(), WinSize::new(24, 80));
    }

    #[test]
    fn slave_opens() {
        let pty = Pty::open().expect("open pty");
        let _slave = pty.open_slave().expect("open slave");
    }

    #[test]
    fn nonblocking_toggles() {
        let pty = Pty::open().expect("open pty");
        pty.set_nonblocking(true).expect("set nonblocking");
        pty.set_nonblocking(false).expect("clear nonblocking");
    }
}
