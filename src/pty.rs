//! PTY Handle: open a master/slave pair, fork a shell child, size it, own
//! its lifetime. `spec.md` §4.A, implemented with the raw syscalls it
//! names directly (`posix_openpt`/`grantpt`/`unlockpt`/`fork`/`setsid`) via
//! `nix`, rather than a higher-level PTY-spawn crate.
//!
//! Grounded in `pink10000-rintty`'s own raw fork/exec PTY spawn
//! (`examples/pink10000-rintty/src/animation.rs`'s `Animation::new`, which
//! uses `nix::pty::openpty` + `Command::pre_exec` + `nix::unistd::setsid`),
//! adapted to the spec's exact sequence: open via posix_openpt/grantpt/
//! unlockpt so the slave path is retrieved and reopened in the child rather
//! than inherited as an already-open fd.

use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use anyhow::{Context, Result};
use nix::fcntl::OFlag;
use nix::pty::{grantpt, posix_openpt, unlockpt, PtyMaster};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::sys::winsize::Winsize;
use nix::unistd::{close, dup2, execvp, fork, setsid, ForkResult, Pid};

/// Default shell used when `SHELL` is unset, per `spec.md` §4.A/§6.
const DEFAULT_SHELL: &str = "/bin/sh";

/// An owned PTY pair with a forked-and-exec'd shell child.
///
/// Invariant (carried from `spec.md` §3): a `PtyHandle` always has a live
/// `child_pid` for as long as it exists; destruction sends `SIGTERM` and
/// reaps the child before the master fd is dropped.
pub struct PtyHandle {
    master: PtyMaster,
    child: Pid,
}

impl std::fmt::Debug for PtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandle").field("child", &self.child).finish_non_exhaustive()
    }
}

impl PtyHandle {
    /// Open a PTY, set its window size to `rows` x `cols`, fork, and exec
    /// the shell named by `SHELL` (default `/bin/sh`) in the child with the
    /// parent's full environment.
    ///
    /// `open`/`fork` failures are fatal to the caller (`spec.md` §7 —
    /// *init fatal*). The child's own exec failure cannot be surfaced except
    /// via its process exit status 1; the parent does not observe it
    /// directly.
    pub fn spawn(rows: u16, cols: u16) -> Result<Self> {
        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).context("posix_openpt failed")?;
        grantpt(&master).context("grantpt failed")?;
        unlockpt(&master).context("unlockpt failed")?;

        set_winsize(master.as_fd(), rows, cols);

        let slave_path = slave_name(&master)?;
        let shell = std::env::var("SHELL").unwrap_or_else(|_| DEFAULT_SHELL.to_string());

        // SAFETY: the child performs only async-signal-safe operations
        // (setsid, open, dup2, close, ioctl, execvp) between fork and exec.
        match unsafe { fork() }.context("fork failed")? {
            ForkResult::Child => {
                child_exec(&slave_path, &shell, rows, cols);
                // child_exec never returns on success; on failure it exits
                // the process directly, so this is unreachable in practice.
                std::process::exit(1);
            }
            ForkResult::Parent { child } => Ok(Self { master, child }),
        }
    }

    /// Raw fd for the master side, for use in `poll`.
    pub fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.master.as_raw_fd()
    }

    pub fn read(&self, buf: &mut [u8]) -> nix::Result<usize> {
        nix::unistd::read(self.master.as_fd(), buf)
    }

    pub fn write(&self, buf: &[u8]) -> nix::Result<usize> {
        nix::unistd::write(self.master.as_fd(), buf)
    }

    /// Resize the PTY. Not called after init in this core (`spec.md` §3:
    /// "Resized only at init in this core"), but kept as a method rather
    /// than inlined into `spawn` since the main shell's PTY size is derived
    /// from the host terminal only after init has already opened it.
    pub fn resize(&self, rows: u16, cols: u16) {
        set_winsize(self.master.as_fd(), rows, cols);
    }

    pub fn child_pid(&self) -> Pid {
        self.child
    }

    /// Send `SIGTERM` and reap the child. Idempotent: a second call is a
    /// harmless no-op (`waitpid` on an already-reaped pid errors and is
    /// ignored — there is no zombie-reaping beyond this single wait, per
    /// `spec.md` §5).
    pub fn kill_child(&self) {
        let _ = kill(self.child, Signal::SIGTERM);
        let _ = waitpid(self.child, None);
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        self.kill_child();
    }
}

fn set_winsize(fd: BorrowedFd<'_>, rows: u16, cols: u16) {
    let ws = Winsize { ws_row: rows, ws_col: cols, ws_xpixel: 0, ws_ypixel: 0 };
    // SAFETY: fd is a valid, open PTY master or slave descriptor for the
    // lifetime of this call; TIOCSWINSZ only writes to the kernel's pty
    // structure, not through `ws`.
    unsafe {
        libc::ioctl(fd.as_raw_fd(), libc::TIOCSWINSZ, std::ptr::from_ref(&ws));
    }
}

fn slave_name(master: &PtyMaster) -> Result<String> {
    // SAFETY: `master` is a valid, just-unlocked PTY master fd.
    unsafe { nix::pty::ptsname(master) }.context("ptsname failed")
}

/// Runs in the forked child: establish a new session, open the slave,
/// redirect stdio, reset the slave's window size, and exec the shell.
/// Never returns on success.
fn child_exec(slave_path: &str, shell: &str, rows: u16, cols: u16) -> ! {
    if setsid().is_err() {
        std::process::exit(1);
    }

    let slave_cstr = match CString::new(slave_path) {
        Ok(s) => s,
        Err(_) => std::process::exit(1),
    };
    let slave_fd = match nix::fcntl::open(slave_cstr.as_c_str(), OFlag::O_RDWR, nix::sys::stat::Mode::empty())
    {
        Ok(fd) => fd,
        Err(_) => std::process::exit(1),
    };

    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if dup2(slave_fd.as_raw_fd(), target).is_err() {
            std::process::exit(1);
        }
    }
    // Close the higher-numbered copy now that 0/1/2 are wired up.
    if slave_fd.as_raw_fd() > libc::STDERR_FILENO {
        let _ = close(slave_fd.as_raw_fd());
    }

    set_winsize(unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) }, rows, cols);

    let shell_cstr = match CString::new(shell) {
        Ok(s) => s,
        Err(_) => std::process::exit(1),
    };
    let _ = execvp(&shell_cstr, &[shell_cstr.clone()]);
    // Only reached if execvp failed.
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_read_echo() {
        // SHELL defaults to /bin/sh if unset in this test environment.
        let handle = match PtyHandle::spawn(24, 80) {
            Ok(h) => h,
            Err(_) => return, // sandboxed CI without PTY support
        };
        let _ = handle.write(b"echo hi\nexit\n");
        std::thread::sleep(std::time::Duration::from_millis(200));
        let mut buf = [0u8; 4096];
        let mut collected = String::new();
        for _ in 0..5 {
            if let Ok(n) = handle.read(&mut buf) {
                if n == 0 {
                    break;
                }
                collected.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            if collected.contains("hi") {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        assert!(collected.contains("hi"), "expected echoed output, got: {collected:?}");
    }

    #[test]
    fn kill_child_is_idempotent() {
        let handle = match PtyHandle::spawn(24, 80) {
            Ok(h) => h,
            Err(_) => return,
        };
        handle.kill_child();
        handle.kill_child();
    }
}
