//! Shell child process attached to a PTY slave.
//!
//! The child side of the fork creates its own session, adopts the slave
//! as controlling terminal, wires stdio onto it and execs the shell with
//! `TERM=xterm-256color`. The parent side only keeps the pid.

use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::PtyError;
use crate::pty::Pty;

/// A running shell process. Dropping it does not kill the shell; the
/// owning session decides when to terminate.
#[derive(Debug)]
pub struct ShellChild {
    pid: Pid,
}

fn cstring(s: &OsStr) -> Result<CString, PtyError> {
    CString::new(s.as_bytes()).map_err(|_| PtyError::ProcessLaunchFailed {
        shell: s.to_string_lossy().into_owned(),
        message: "argument contains NUL byte".into(),
    })
}

/// Environment for the child: the parent's, with TERM pinned to the
/// terminal type this emulator implements.
fn child_env() -> Vec<CString> {
    let mut env = Vec::new();
    for (key, value) in std::env::vars_os() {
        if key == "TERM" {
            continue;
        }
        let mut var = key.as_bytes().to_vec();
        var.push(b'=');
        var.extend_from_slice(value.as_bytes());
        if let Ok(var) = CString::new(var) {
            env.push(var);
        }
    }
    if let Ok(term) = CString::new("TERM=xterm-256color") {
        env.push(term);
    }
    env
}

/// Fork and exec `shell` with `args` on the slave side of `pty`.
pub fn spawn_shell(
    pty: &Pty,
    shell: &str,
    args: &[String],
    working_dir: Option<&Path>,
) -> Result<ShellChild, PtyError> {
    let program = cstring(OsStr::new(shell))?;
    let mut argv = vec![program.clone()];
    for arg in args {
        argv.push(cstring(OsStr::new(arg))?);
    }
    let envp = child_env();
    let cwd = working_dir.map(|p| cstring(p.as_os_str())).transpose()?;

    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => Ok(ShellChild { pid: child }),
        Ok(ForkResult::Child) => setup_and_exec(pty, &program, &argv, &envp, cwd.as_deref()),
        Err(e) => Err(PtyError::ProcessLaunchFailed {
            shell: shell.to_string(),
            message: format!("fork failed: {e}"),
        }),
    }
}

/// Runs in the forked child; never returns.
fn setup_and_exec(
    pty: &Pty,
    program: &CString,
    argv: &[CString],
    envp: &[CString],
    cwd: Option<&std::ffi::CStr>,
) -> ! {
    if unistd::setsid().is_err() {
        std::process::exit(1);
    }

    let slave = match pty.open_slave() {
        Ok(s) => s,
        Err(_) => std::process::exit(1),
    };
    let slave_fd = slave.as_raw_fd();

    unsafe {
        if libc::ioctl(slave_fd, libc::TIOCSCTTY, 0) < 0 {
            std::process::exit(1);
        }
    }

    for std_fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unistd::dup2(slave_fd, std_fd).is_err() {
            std::process::exit(1);
        }
    }
    if slave_fd > 2 {
        drop(slave);
    }

    if let Some(dir) = cwd {
        // A missing directory should not stop the shell from starting.
        let _ = unistd::chdir(dir);
    }

    unsafe {
        for sig in [
            Signal::SIGCHLD,
            Signal::SIGHUP,
            Signal::SIGINT,
            Signal::SIGQUIT,
            Signal::SIGTERM,
        ] {
            let _ = signal::signal(sig, signal::SigHandler::SigDfl);
        }
    }

    let _ = unistd::execvpe(program, argv, envp);
    std::process::exit(127);
}

impl ShellChild {
    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// A second handle observing the same process, for the reader thread.
    /// Exactly one of the two may end up reaping it.
    pub(crate) fn observer(&self) -> ShellChild {
        ShellChild { pid: self.pid }
    }

    /// Non-blocking exit check; `Some(code)` once the child is gone.
    pub fn try_wait(&self) -> Option<u32> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => exit_code(status),
            // Already reaped elsewhere.
            Err(nix::errno::Errno::ECHILD) => Some(0),
            Err(_) => None,
        }
    }

    /// Blocking wait for the exit code.
    pub fn wait(&self) -> u32 {
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    if let Some(code) = exit_code(status) {
                        return code;
                    }
                }
                Err(nix::errno::Errno::EINTR) => continue,
                Err(_) => return 0,
            }
        }
    }

    pub fn signal(&self, sig: Signal) {
        let _ = signal::kill(self.pid, sig);
    }

    pub fn kill(&self) {
        self.signal(Signal::SIGKILL);
    }
}

/// Signal deaths surface as 128 + signo, the shell convention, keeping
/// the exit surface a plain unsigned value.
fn exit_code(status: WaitStatus) -> Option<u32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code as u32),
        WaitStatus::Signaled(_, sig, _) => Some(128 + sig as u32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::WinSize;
    use std::io::Read;
    use std::time::Duration;

    #[test]
    fn spawns_and_reaps_a_command() {
        let pty = Pty::open_with_size(WinSize::new(24, 80)).expect("open pty");
        let child =
            spawn_shell(&pty, "/bin/sh", &["-c".into(), "exit 7".into()], None).expect("spawn");
        assert!(child.pid() > 0);
        assert_eq!(child.wait(), 7);
    }

    #[test]
    fn child_output_arrives_on_master() {
        let pty = Pty::open_with_size(WinSize::new(24, 80)).expect("open pty");
        let child = spawn_shell(&pty, "/bin/echo", &["knock".into()], None).expect("spawn");

        std::thread::sleep(Duration::from_millis(200));
        pty.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 256];
        let mut master = pty.master();
        let n = master.read(&mut buf).unwrap_or(0);
        let out = String::from_utf8_lossy(&buf[..n]);
        assert!(out.contains("knock"), "unexpected output: {out:?}");
        child.wait();
    }

    #[test]
    fn signal_death_maps_to_128_plus_signo() {
        let pty = Pty::open().expect("open pty");
        let child =
            spawn_shell(&pty, "/bin/sh", &["-c".into(), "sleep 30".into()], None).expect("spawn");
        child.kill();
        assert_eq!(child.wait(), 128 + Signal::SIGKILL as u32);
    }
}
