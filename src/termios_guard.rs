//! Raw-mode guard for stdin: snapshot on construction, restore on drop.
//! `spec.md` §6 terminal state contract, testable property 1.
//!
//! RAII cleanup-on-drop (including panics) follows `tui/guard.rs`'s
//! `TerminalGuard`, adapted from `crossterm::terminal::disable_raw_mode`
//! (which this crate doesn't depend on) to a direct `tcsetattr` restore via
//! `nix::sys::termios`, since the raw termios flags are the actual contract
//! named in the spec rather than a library's raw-mode default.

use std::os::fd::BorrowedFd;

use anyhow::{Context, Result};
use nix::sys::termios::{self, InputFlags, LocalFlags, OutputFlags, SetArg, Termios};

/// Snapshots stdin's termios on construction and restores it on drop. Raw
/// mode is applied explicitly via [`RawModeGuard::enter`] rather than at
/// construction, so callers can handle the `tcgetattr`/`tcsetattr` failure
/// path as an init-fatal error (`spec.md` §7) before committing to raw mode.
pub struct RawModeGuard {
    fd: i32,
    original: Termios,
}

impl std::fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawModeGuard").field("fd", &self.fd).finish_non_exhaustive()
    }
}

impl RawModeGuard {
    /// Snapshot the current termios for `fd` without modifying it.
    pub fn snapshot(fd: i32) -> Result<Self> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let original = termios::tcgetattr(borrowed).context("tcgetattr failed")?;
        Ok(Self { fd, original })
    }

    /// Apply raw mode: clear ECHO, ICANON, ISIG, IEXTEN, IXON, ICRNL,
    /// BRKINT, INPCK, ISTRIP, OPOST; set CS8; VMIN=1, VTIME=0.
    pub fn enter(&self) -> Result<()> {
        let mut raw = self.original.clone();

        raw.local_flags.remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG | LocalFlags::IEXTEN);
        raw.input_flags.remove(
            InputFlags::IXON | InputFlags::ICRNL | InputFlags::BRKINT | InputFlags::INPCK | InputFlags::ISTRIP,
        );
        raw.output_flags.remove(OutputFlags::OPOST);
        raw.control_flags.insert(nix::sys::termios::ControlFlags::CS8);
        raw.control_chars[termios::SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[termios::SpecialCharacterIndices::VTIME as usize] = 0;

        let borrowed = unsafe { BorrowedFd::borrow_raw(self.fd) };
        termios::tcsetattr(borrowed, SetArg::TCSANOW, &raw).context("tcsetattr (enter raw mode) failed")
    }

    /// Restore the original termios captured at construction. Called
    /// automatically on drop; exposed directly so callers on a normal exit
    /// path can surface a restore failure rather than silently ignore it.
    pub fn restore(&self) -> Result<()> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(self.fd) };
        termios::tcsetattr(borrowed, SetArg::TCSANOW, &self.original).context("tcsetattr (restore) failed")
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsRawFd;

    #[test]
    fn snapshot_and_restore_round_trips_on_a_pty() {
        // A pipe fd is not a tty, so exercise this against a PTY instead.
        let master = match nix::pty::posix_openpt(nix::fcntl::OFlag::O_RDWR | nix::fcntl::OFlag::O_NOCTTY) {
            Ok(m) => m,
            Err(_) => return,
        };
        let _ = nix::pty::grantpt(&master);
        let _ = nix::pty::unlockpt(&master);
        let fd = master.as_raw_fd();

        let guard = match RawModeGuard::snapshot(fd) {
            Ok(g) => g,
            Err(_) => return,
        };
        let before = termios::tcgetattr(unsafe { BorrowedFd::borrow_raw(fd) }).unwrap();
        guard.enter().unwrap();
        let during = termios::tcgetattr(unsafe { BorrowedFd::borrow_raw(fd) }).unwrap();
        assert!(!during.local_flags.contains(LocalFlags::ECHO));

        guard.restore().unwrap();
        let after = termios::tcgetattr(unsafe { BorrowedFd::borrow_raw(fd) }).unwrap();
        assert_eq!(after.local_flags, before.local_flags);
    }
}
