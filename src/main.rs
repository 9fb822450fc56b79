//! Entry point: argument parsing, logging init, raw-mode guard, panic hook,
//! signal registration, then hand off to [`proxy::Proxy::run`]. `spec.md`
//! §6/§7.
//!
//! Signal-triggered shutdown (`SIGINT`/`SIGTERM`/`SIGHUP` into a shared
//! `AtomicBool`) and the panic hook restoring terminal state follow
//! `cli/src/main.rs`'s own `SHUTDOWN_FLAG` + `signal_hook::flag::register`
//! pattern and panic-hook terminal cleanup, adapted from crossterm's
//! raw-mode/alt-screen calls to this crate's own `RawModeGuard`/raw
//! `ESC[?1049l` write since `tzig` doesn't depend on crossterm.

mod cli;
mod event_loop;
mod overlay;
mod proxy;
mod pty;
mod query_forwarder;
mod screen;
mod style;
mod termios_guard;
mod window;
mod window_manager;

use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use clap::Parser;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::flag;

use cli::Cli;
use proxy::Proxy;
use termios_guard::RawModeGuard;

/// Populated once raw mode is entered, so the panic hook can restore it even
/// if the normal `Drop` path never runs (e.g. a panic during an aborting
/// operation upstream of the guard's scope).
static ORIGINAL_TERMIOS: OnceLock<nix::sys::termios::Termios> = OnceLock::new();

/// `Cli::parse()` would exit 2 on an unknown flag via clap's default
/// `Error::exit()`; `spec.md` §6 requires exit 1 for argument errors, so
/// `--help`/`--version` (which clap always exits 0 for) are let through
/// as-is and every other error kind is remapped to exit 1. Split out as a
/// pure function so the mapping itself — not just clap's own `ErrorKind`
/// classification — is unit-testable without spawning a process.
fn argument_error_exit_code(kind: clap::error::ErrorKind) -> i32 {
    use clap::error::ErrorKind;
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn main() {
    if let Err(e) = Cli::try_parse() {
        let _ = e.print();
        std::process::exit(argument_error_exit_code(e.kind()));
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = register_signals(&shutdown) {
        eprintln!("tzig: failed to register signal handlers: {e:#}");
        std::process::exit(1);
    }

    match run(&shutdown) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("tzig: {e:#}");
            std::process::exit(1);
        }
    }
}

fn register_signals(shutdown: &Arc<AtomicBool>) -> anyhow::Result<()> {
    flag::register(SIGINT, Arc::clone(shutdown))?;
    flag::register(SIGTERM, Arc::clone(shutdown))?;
    flag::register(SIGHUP, Arc::clone(shutdown))?;
    Ok(())
}

fn run(shutdown: &Arc<AtomicBool>) -> anyhow::Result<()> {
    let stdin_fd = std::io::stdin().as_raw_fd();
    let guard = RawModeGuard::snapshot(stdin_fd)?;
    let _ = ORIGINAL_TERMIOS.set(nix::sys::termios::tcgetattr(unsafe { std::os::fd::BorrowedFd::borrow_raw(stdin_fd) })?);
    install_panic_hook(stdin_fd);

    guard.enter()?;
    let (rows, cols) = terminal_size(stdin_fd);
    let mut proxy = Proxy::new(rows, cols)?;
    let result = proxy.run(shutdown);
    guard.restore()?;
    result
}

/// `TIOCGWINSZ` failure is tolerated (`spec.md` §7 init-fatal exceptions) —
/// fall back to 24x80.
fn terminal_size(fd: i32) -> (u16, u16) {
    let mut ws = libc::winsize { ws_row: 0, ws_col: 0, ws_xpixel: 0, ws_ypixel: 0 };
    // SAFETY: fd is a valid, open fd for the process lifetime; TIOCGWINSZ
    // only writes to `ws`.
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, std::ptr::from_mut(&mut ws)) };
    if rc != 0 || ws.ws_row == 0 || ws.ws_col == 0 {
        (24, 80)
    } else {
        (ws.ws_row, ws.ws_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn help_and_version_exit_zero() {
        assert_eq!(argument_error_exit_code(ErrorKind::DisplayHelp), 0);
        assert_eq!(argument_error_exit_code(ErrorKind::DisplayVersion), 0);
    }

    #[test]
    fn unknown_argument_exits_one_not_claps_default_two() {
        assert_eq!(argument_error_exit_code(ErrorKind::UnknownArgument), 1);
    }

    #[test]
    fn other_error_kinds_exit_one() {
        assert_eq!(argument_error_exit_code(ErrorKind::MissingRequiredArgument), 1);
        assert_eq!(argument_error_exit_code(ErrorKind::InvalidValue), 1);
    }
}

fn install_panic_hook(fd: i32) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("panic: {panic_info}");
        if let Some(original) = ORIGINAL_TERMIOS.get() {
            let borrowed = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) };
            let _ = nix::sys::termios::tcsetattr(borrowed, nix::sys::termios::SetArg::TCSANOW, original);
        }
        use std::io::Write;
        let _ = std::io::stdout().write_all(b"\x1b[?1049l\x1b[?25h");
        let _ = std::io::stdout().flush();
        default_hook(panic_info);
    }));
}
