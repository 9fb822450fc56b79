//! Top-level wiring: owns the main shell's PTY directly (it has no Window of
//! its own PTY, per `spec.md` §3 — only floating shells own a PTY through
//! their Window) plus the WindowManager, QueryForwarder, and
//! OverlayController, and runs the event loop. `spec.md` §4.H + §9 ownership
//! graph.

use std::io::Write;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use nix::poll::PollTimeout;
use nix::sys::signal::{kill, Signal};

use crate::event_loop;
use crate::overlay::{self, OverlayController};
use crate::pty::PtyHandle;
use crate::query_forwarder::QueryForwarder;
use crate::window::Window;
use crate::window_manager::WindowManager;

const READ_CHUNK: usize = 4096;
/// The single floating window's index in the WindowManager, created at
/// startup (`spec.md` §4.G: "the single floating window created at
/// startup").
const FLOATING_INDEX: usize = 0;

pub struct Proxy {
    main_pty: PtyHandle,
    windows: WindowManager,
    forwarder: QueryForwarder,
    overlay: OverlayController,
    floating_enabled: bool,
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy").field("overlay_visible", &self.overlay.visible()).finish_non_exhaustive()
    }
}

impl Proxy {
    /// Spawn the main shell and a floating shell sized and centered within
    /// the host terminal's reported dimensions.
    pub fn new(rows: u16, cols: u16) -> Result<Self> {
        let main_pty = PtyHandle::spawn(rows, cols)?;
        let main_window = Window::main(cols, rows);
        let mut windows = WindowManager::new(main_window);

        let (fw, fh) = floating_size(cols, rows);
        let (fx, fy) = floating_origin(cols, rows, fw, fh);
        let floating_pty = PtyHandle::spawn(fh.saturating_sub(2).max(1), fw.saturating_sub(2).max(1))?;
        let floating_window = Window::floating(fx, fy, fw, fh, "tzig", floating_pty);
        windows.create_floating_window(floating_window);

        Ok(Self { main_pty, windows, forwarder: QueryForwarder::new(), overlay: OverlayController::new(), floating_enabled: true })
    }

    /// Run until the main shell exits or a shutdown signal is observed.
    /// `spec.md` §4.H/§7: main PTY EOF or HUP is the sole normal-exit
    /// condition; a caught signal also exits cleanly via `shutdown`.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let stdin_fd = std::io::stdin().as_raw_fd();
        let mut stdout = std::io::stdout();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }

            let floating_fd =
                if self.floating_enabled { self.windows.floating(FLOATING_INDEX).map(|w| pty_fd(w)) } else { None }.flatten();

            let wake = match event_loop::poll_once(stdin_fd, self.main_pty.as_raw_fd(), floating_fd, PollTimeout::NONE) {
                Ok(w) => w,
                Err(_) if shutdown.load(Ordering::Relaxed) => return Ok(()),
                Err(e) => return Err(e),
            };

            if wake.main_pty_hangup {
                return Ok(());
            }
            if wake.main_pty_readable && !self.handle_main_pty(&mut stdout)? {
                return Ok(());
            }
            if wake.floating_pty_hangup {
                self.floating_enabled = false;
            }
            if wake.floating_pty_readable {
                self.handle_floating_pty(&mut stdout)?;
            }
            if wake.stdin_readable {
                self.handle_stdin(&mut stdout)?;
            }
        }
    }

    /// Returns `false` on EOF (shell exited), signaling the caller to stop.
    fn handle_main_pty(&mut self, stdout: &mut impl Write) -> Result<bool> {
        let mut buf = [0u8; READ_CHUNK];
        let n = match self.main_pty.read(&mut buf) {
            Ok(0) | Err(_) => return Ok(false),
            Ok(n) => n,
        };
        self.windows.main_mut().screen_mut().feed(&buf[..n]);
        if self.overlay.visible() {
            self.overlay.render_all(stdout, &self.windows);
        } else {
            let _ = stdout.write_all(&buf[..n]);
            let _ = stdout.flush();
        }
        Ok(true)
    }

    fn handle_floating_pty(&mut self, stdout: &mut impl Write) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        let Some(floating) = self.windows.floating(FLOATING_INDEX) else { return Ok(()) };
        let Some(pty) = floating.pty() else { return Ok(()) };
        let n = match pty.read(&mut buf) {
            Ok(n) => n,
            Err(_) => {
                self.floating_enabled = false;
                return Ok(());
            }
        };
        if n == 0 {
            self.floating_enabled = false;
            return Ok(());
        }
        let data = &buf[..n];

        let mut forwarded = Vec::new();
        self.forwarder.scan(data, FLOATING_INDEX, &mut forwarded);
        if !forwarded.is_empty() {
            let _ = stdout.write_all(&forwarded);
            let _ = stdout.flush();
        }

        if let Some(win) = self.windows.floating_mut(FLOATING_INDEX) {
            win.scan_osc_title(data);
            win.screen_mut().feed(data);
        }

        if self.overlay.visible() {
            self.overlay.render_all(stdout, &self.windows);
        }
        Ok(())
    }

    fn handle_stdin(&mut self, stdout: &mut impl Write) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        let n = match nix::unistd::read(unsafe { std::os::fd::BorrowedFd::borrow_raw(0) }, &mut buf) {
            Ok(0) | Err(_) => return Ok(()),
            Ok(n) => n,
        };
        let input = &buf[..n];

        if let Some(target) = self.forwarder.try_claim_response(input) {
            if let Some(win) = self.windows.floating(target) {
                if let Some(pty) = win.pty() {
                    let _ = pty.write(input);
                }
            }
            return Ok(());
        }

        if event_loop::is_hotkey(input) {
            self.toggle_overlay(stdout);
            return Ok(());
        }

        if self.overlay.visible() {
            if let Some(win) = self.windows.floating(FLOATING_INDEX) {
                if let Some(pty) = win.pty() {
                    let _ = pty.write(input);
                }
            }
        } else {
            let _ = self.main_pty.write(input);
        }
        Ok(())
    }

    fn toggle_overlay(&mut self, stdout: &mut impl Write) {
        if self.overlay.visible() {
            self.overlay.hide(stdout, &self.windows);
            let _ = kill(self.main_pty.child_pid(), Signal::SIGWINCH);
        } else {
            let main_fd = self.main_pty.as_raw_fd();
            let main_pty = &self.main_pty;
            let drained = overlay::drain_pending(|| {
                if event_loop::poll_single(main_fd, PollTimeout::ZERO).unwrap_or(false) {
                    let mut buf = [0u8; READ_CHUNK];
                    match main_pty.read(&mut buf) {
                        Ok(n) if n > 0 => Some(buf[..n].to_vec()),
                        _ => None,
                    }
                } else {
                    None
                }
            });
            if !drained.is_empty() {
                self.windows.main_mut().screen_mut().feed(&drained);
                let _ = stdout.write_all(&drained);
            }
            self.overlay.show(stdout, &self.windows);
        }
    }
}

fn pty_fd(win: &Window) -> Option<std::os::fd::RawFd> {
    win.pty().map(|p| p.as_raw_fd())
}

/// Floating window is sized to roughly 60% of the host terminal, clamped to
/// a sensible minimum so a tiny host terminal still yields a usable window.
fn floating_size(cols: u16, rows: u16) -> (u16, u16) {
    let w = ((cols as u32 * 3 / 5) as u16).max(10);
    let h = ((rows as u32 * 3 / 5) as u16).max(5);
    (w.min(cols), h.min(rows))
}

fn floating_origin(cols: u16, rows: u16, fw: u16, fh: u16) -> (u16, u16) {
    let x = cols.saturating_sub(fw) / 2;
    let y = rows.saturating_sub(fh) / 2;
    (x, y)
}
