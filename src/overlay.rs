//! Overlay Controller: alternate-screen enter/leave, model-driven redraw,
//! cursor placement. `spec.md` §4.G.
//!
//! The raw escape-sequence writes (`ESC[?1049h`, cursor hide/show) follow
//! `tui/terminal_modes.rs`'s `TerminalModes::sync` — direct buffered writes
//! rather than going through a TUI framework, since this crate (unlike the
//! teacher) never hands the terminal to `ratatui`.

use std::io::Write;

use crate::window_manager::WindowManager;

/// Bound on the pre-entry drain loop (`spec.md` §4.G step 1).
const DRAIN_MAX_ITERATIONS: u32 = 5;
const DRAIN_POLL_MS: u64 = 1;

/// Bounded, best-effort drain of the main PTY's already-buffered output,
/// run just before entering the alternate screen (`spec.md` §4.G step 1: "at
/// most 5 iterations with a 1 ms poll each"). `read_chunk` is called once per
/// iteration and should do a single non-blocking read, returning `None` when
/// nothing was available. Returns the concatenation of everything read.
///
/// This is a free function rather than an `OverlayController` method since
/// the caller (`proxy.rs`) must feed the result to the main window's
/// ScreenModel — which needs a mutable borrow of the `WindowManager` — before
/// `OverlayController::show` borrows it immutably to render; keeping drain
/// and render as separate steps here is what makes that sequencing possible.
pub fn drain_pending(mut read_chunk: impl FnMut() -> Option<Vec<u8>>) -> Vec<u8> {
    let mut collected = Vec::new();
    for _ in 0..DRAIN_MAX_ITERATIONS {
        match read_chunk() {
            Some(bytes) if !bytes.is_empty() => collected.extend_from_slice(&bytes),
            _ => std::thread::sleep(std::time::Duration::from_millis(DRAIN_POLL_MS)),
        }
    }
    collected
}

/// Tracks whether the floating overlay is currently shown. Holds no PTY or
/// screen state itself — those live on the [`WindowManager`]'s windows.
#[derive(Debug, Default)]
pub struct OverlayController {
    visible: bool,
}

impl OverlayController {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Toggle from hidden to visible: enter the alternate screen and paint
    /// the first overlay frame. The caller must have already drained the
    /// main PTY's pending output via [`drain_pending`] — feeding it to the
    /// main ScreenModel and passing it through to the user terminal — and
    /// fed those bytes to the main window's model *before* calling this, so
    /// `render_all` paints from up-to-date state (`spec.md` §4.G step 1).
    /// Draining needs a mutable borrow of the `WindowManager` (to feed the
    /// model) while this method only needs a shared one (to render), so the
    /// two steps can't be combined into a single call without the caller
    /// holding both borrows at once.
    pub fn show<W: Write>(&mut self, out: &mut W, manager: &WindowManager) {
        let _ = out.write_all(b"\x1b[?1049h");
        self.visible = true;
        self.render_all(out, manager);
    }

    /// Toggle from visible to hidden: one last main-window-only paint, leave
    /// the alternate screen. The caller is responsible for sending SIGWINCH
    /// to the main shell afterward (`spec.md` §4.G step 3) — this module
    /// owns no pid.
    pub fn hide<W: Write>(&mut self, out: &mut W, manager: &WindowManager) {
        self.render_main_only(out, manager);
        let _ = out.write_all(b"\x1b[?1049l");
        self.visible = false;
    }

    /// Full-frame redraw: hide cursor, home + clear, main then floating
    /// windows, reposition the cursor over the active floating window if
    /// any, show cursor, flush.
    pub fn render_all<W: Write>(&self, out: &mut W, manager: &WindowManager) {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"\x1b[?25l");
        buf.extend_from_slice(b"\x1b[H\x1b[2J");
        manager.render_all(&mut buf);
        if let Some(cursor) = active_floating_cursor(manager) {
            buf.extend_from_slice(cursor.as_bytes());
        }
        buf.extend_from_slice(b"\x1b[?25h");
        let _ = out.write_all(&buf);
        let _ = out.flush();
    }

    /// Same as `render_all` but omits floating windows and cursor
    /// repositioning (`spec.md` §4.G `renderMainWindowOnly`).
    pub fn render_main_only<W: Write>(&self, out: &mut W, manager: &WindowManager) {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"\x1b[?25l");
        buf.extend_from_slice(b"\x1b[H\x1b[2J");
        manager.render_main_only(&mut buf);
        buf.extend_from_slice(b"\x1b[?25h");
        let _ = out.write_all(&buf);
        let _ = out.flush();
    }
}

/// Absolute cursor position over the first visible floating window, per
/// `spec.md` §4.G: `abs_x = win.x + (border?1:0) + model.cursor.x + 1`, same
/// for y (the trailing `+1` converts 0-indexed to the 1-indexed CUP form).
fn active_floating_cursor(manager: &WindowManager) -> Option<String> {
    let win = manager.floating_windows().iter().find(|w| w.visible())?;
    let border_offset = if win.has_border() { 1 } else { 0 };
    let (cx, cy) = win.screen().cursor();
    let abs_x = win.x() + border_offset + cx + 1;
    let abs_y = win.y() + border_offset + cy + 1;
    Some(format!("\x1b[{abs_y};{abs_x}H"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::PtyHandle;
    use crate::window::Window;

    fn spawnable_pty() -> Option<PtyHandle> {
        PtyHandle::spawn(5, 20).ok()
    }

    #[test]
    fn hidden_initially() {
        let overlay = OverlayController::new();
        assert!(!overlay.visible());
    }

    #[test]
    fn show_enters_alt_screen_and_sets_visible() {
        let mut overlay = OverlayController::new();
        let manager = WindowManager::new(Window::main(80, 24));
        let mut out = Vec::new();
        overlay.show(&mut out, &manager);
        assert!(overlay.visible());
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("\x1b[?1049h"));
    }

    #[test]
    fn drain_pending_collects_reads_across_iterations() {
        let mut calls = 0;
        let drained = drain_pending(move || {
            calls += 1;
            if calls == 1 {
                Some(b"drained".to_vec())
            } else {
                None
            }
        });
        assert_eq!(drained, b"drained");
    }

    #[test]
    fn drain_pending_returns_empty_when_nothing_readable() {
        let drained = drain_pending(|| None);
        assert!(drained.is_empty());
    }

    #[test]
    fn hide_leaves_alt_screen_and_clears_visible() {
        let mut overlay = OverlayController::new();
        let manager = WindowManager::new(Window::main(80, 24));
        let mut out = Vec::new();
        overlay.show(&mut out, &manager);
        out.clear();
        overlay.hide(&mut out, &manager);
        assert!(!overlay.visible());
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("\x1b[?1049l"));
    }

    #[test]
    fn cursor_repositioned_over_visible_floating_window() {
        let Some(pty) = spawnable_pty() else { return };
        let mut manager = WindowManager::new(Window::main(80, 24));
        let mut floating = Window::floating(2, 3, 20, 5, "t", pty);
        floating.set_visible(true);
        manager.create_floating_window(floating);

        let overlay = OverlayController::new();
        let mut out = Vec::new();
        overlay.render_all(&mut out, &manager);
        let text = String::from_utf8_lossy(&out);
        // border offset 1, cursor at (0,0) within content -> abs (2+1+0+1, 3+1+0+1) = (4,5)
        assert!(text.contains("\x1b[5;4H"));
    }

    #[test]
    fn render_main_only_has_no_cursor_reposition() {
        let Some(pty) = spawnable_pty() else { return };
        let mut manager = WindowManager::new(Window::main(80, 24));
        let mut floating = Window::floating(2, 3, 20, 5, "t", pty);
        floating.set_visible(true);
        manager.create_floating_window(floating);

        let overlay = OverlayController::new();
        let mut out = Vec::new();
        overlay.render_main_only(&mut out, &manager);
        let text = String::from_utf8_lossy(&out);
        assert!(!text.contains("\x1b[5;4H"));
    }
}
