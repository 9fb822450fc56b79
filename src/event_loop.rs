//! Event Loop: polls the three endpoint fds (stdin, main PTY, floating PTY)
//! and reports which woke up, plus hotkey detection. `spec.md` §4.H.
//!
//! Byte dispatch itself (who gets fed what) lives in `proxy.rs`, which owns
//! every component this module would otherwise need borrowed at once; this
//! module is deliberately just the `poll` wrapper plus the two small
//! predicates (hotkey, hangup) the loop needs on every wake. Raw `poll`
//! usage (rather than `mio`/`tokio`) follows `spec.md` §5's single-threaded,
//! no-async mandate; no direct teacher precedent uses raw `poll` this way
//! (the teacher's own input handling is `tui/raw_input.rs`'s blocking
//! `libc::read`+thread design), so the fd-set shape here is built from the
//! spec's own three-endpoint description.

use std::os::fd::{BorrowedFd, RawFd};

use anyhow::{Context, Result};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

/// Exact 7-byte Kitty keyboard-protocol sequence that toggles the overlay
/// (`spec.md` §4.H / §6).
const KITTY_HOTKEY: &[u8] = b"\x1b[93;5u";
/// Single-byte Ctrl+] hotkey.
const CTRL_HOTKEY: u8 = 0x1d;

/// Which of the three endpoints are readable or hung up after one poll wake.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub stdin_readable: bool,
    pub main_pty_readable: bool,
    pub floating_pty_readable: bool,
    pub main_pty_hangup: bool,
    pub floating_pty_hangup: bool,
}

/// Polls stdin, the main PTY master, and an optional floating PTY master (a
/// floating fd of `None` means polling on it has already been disabled by a
/// prior hangup, per `spec.md` §4.H "disable polling on that fd").
pub fn poll_once(stdin_fd: RawFd, main_pty_fd: RawFd, floating_pty_fd: Option<RawFd>, timeout: PollTimeout) -> Result<Wake> {
    let stdin_borrowed = unsafe { BorrowedFd::borrow_raw(stdin_fd) };
    let main_borrowed = unsafe { BorrowedFd::borrow_raw(main_pty_fd) };
    let floating_borrowed = floating_pty_fd.map(|fd| unsafe { BorrowedFd::borrow_raw(fd) });

    let interest = PollFlags::POLLIN;
    let mut fds = vec![PollFd::new(stdin_borrowed, interest), PollFd::new(main_borrowed, interest)];
    if let Some(fb) = floating_borrowed {
        fds.push(PollFd::new(fb, interest));
    }

    poll(&mut fds, timeout).context("poll failed")?;

    let revents = |pfd: &PollFd| pfd.revents().unwrap_or(PollFlags::empty());
    let stdin_revents = revents(&fds[0]);
    let main_revents = revents(&fds[1]);
    let floating_revents = if floating_pty_fd.is_some() { Some(revents(&fds[2])) } else { None };

    Ok(Wake {
        stdin_readable: stdin_revents.contains(PollFlags::POLLIN),
        main_pty_readable: main_revents.contains(PollFlags::POLLIN),
        floating_pty_readable: floating_revents.is_some_and(|r| r.contains(PollFlags::POLLIN)),
        main_pty_hangup: main_revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR),
        floating_pty_hangup: floating_revents.is_some_and(|r| r.intersects(PollFlags::POLLHUP | PollFlags::POLLERR)),
    })
}

/// Polls a single fd for readability, used by the overlay's bounded drain
/// loop (`spec.md` §4.G step 1) where only the main PTY matters.
pub fn poll_single(fd: RawFd, timeout: PollTimeout) -> Result<bool> {
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
    poll(&mut fds, timeout).context("poll failed")?;
    Ok(fds[0].revents().unwrap_or(PollFlags::empty()).contains(PollFlags::POLLIN))
}

/// True if `input` is one of the two recognized overlay-toggle hotkeys.
pub fn is_hotkey(input: &[u8]) -> bool {
    input == [CTRL_HOTKEY] || input == KITTY_HOTKEY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsRawFd;

    #[test]
    fn ctrl_close_bracket_is_hotkey() {
        assert!(is_hotkey(&[0x1d]));
    }

    #[test]
    fn kitty_sequence_is_hotkey() {
        assert!(is_hotkey(b"\x1b[93;5u"));
    }

    #[test]
    fn ordinary_keystroke_is_not_hotkey() {
        assert!(!is_hotkey(b"a"));
        assert!(!is_hotkey(b"\x1b[93;5"));
    }

    #[test]
    fn poll_reports_stdin_readable_via_pipe() {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        nix::unistd::write(&write_end, b"x").unwrap();
        let wake = poll_once(read_end.as_raw_fd(), read_end.as_raw_fd(), None, PollTimeout::ZERO).unwrap();
        assert!(wake.stdin_readable);
        assert!(!wake.floating_pty_readable);
    }

    #[test]
    fn poll_single_reports_readiness() {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        assert!(!poll_single(read_end.as_raw_fd(), PollTimeout::ZERO).unwrap());
        nix::unistd::write(&write_end, b"x").unwrap();
        assert!(poll_single(read_end.as_raw_fd(), PollTimeout::ZERO).unwrap());
    }

    #[test]
    fn poll_with_no_floating_fd_never_reports_it_readable() {
        let (read_end, _write_end) = nix::unistd::pipe().unwrap();
        let wake = poll_once(read_end.as_raw_fd(), read_end.as_raw_fd(), None, PollTimeout::ZERO).unwrap();
        assert!(!wake.floating_pty_readable);
        assert!(!wake.floating_pty_hangup);
    }
}
