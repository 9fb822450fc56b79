//! Window: geometry, optional border/title, a bound [`ScreenModel`], an
//! optional owned [`PtyHandle`], visibility, and an OSC-title scanner.
//! `spec.md` §3 (Window) and §4.D (rendering + title parsing).

use crate::pty::PtyHandle;
use crate::screen::ScreenModel;
use crate::style::{Color, Style};

/// Dynamic title buffer capacity in bytes (`spec.md` §3).
const TITLE_CAPACITY: usize = 256;

/// A single bordered or borderless rectangle backed by a screen model and,
/// optionally, its own PTY-driven shell.
pub struct Window {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    has_border: bool,
    default_title: String,
    dynamic_title: String,
    screen: ScreenModel,
    pty: Option<PtyHandle>,
    visible: bool,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_border", &self.has_border)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Content-area dimensions for a window of the given extent and border
    /// setting: `max(1, w-2) x max(1, h-2)` when bordered, else the full
    /// rect (`spec.md` §3).
    fn content_dims(width: u16, height: u16, has_border: bool) -> (u16, u16) {
        if has_border {
            (width.saturating_sub(2).max(1), height.saturating_sub(2).max(1))
        } else {
            (width, height)
        }
    }

    /// Construct a bordered floating window with its own PTY-driven shell.
    pub fn floating(x: u16, y: u16, width: u16, height: u16, title: impl Into<String>, pty: PtyHandle) -> Self {
        let (cols, rows) = Self::content_dims(width, height, true);
        Self {
            x,
            y,
            width,
            height,
            has_border: true,
            default_title: title.into(),
            dynamic_title: String::new(),
            screen: ScreenModel::new(cols, rows),
            pty: Some(pty),
            visible: false,
        }
    }

    /// Construct the main window: no border, no PTY of its own, sized to
    /// the host terminal at init (`spec.md` §3).
    pub fn main(width: u16, height: u16) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            has_border: false,
            default_title: String::new(),
            dynamic_title: String::new(),
            screen: ScreenModel::new(width, height),
            pty: None,
            visible: true,
        }
    }

    pub fn screen(&self) -> &ScreenModel {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut ScreenModel {
        &mut self.screen
    }

    pub fn pty(&self) -> Option<&PtyHandle> {
        self.pty.as_ref()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn has_border(&self) -> bool {
        self.has_border
    }

    /// Title for display: the dynamic title if one has been set via OSC,
    /// else the default.
    pub fn title(&self) -> &str {
        if self.dynamic_title.is_empty() {
            &self.default_title
        } else {
            &self.dynamic_title
        }
    }

    /// Scan `data` for OSC 0/2 title sequences (`ESC ] 0;... ` or
    /// `ESC ] 2;...`, terminated by BEL or `ESC \`) and update the dynamic
    /// title. Malformed or unterminated sequences are ignored. Mirrors the
    /// OSC-scanning loop in `agent/notification.rs`, adapted from
    /// notification bodies (OSC 9/777) to title bodies (OSC 0/2).
    pub fn scan_osc_title(&mut self, data: &[u8]) {
        let mut i = 0;
        while i < data.len() {
            if i + 1 < data.len() && data[i] == 0x1b && data[i + 1] == b']' {
                let body_start = i + 2;
                let mut body_end = None;
                for j in body_start..data.len() {
                    if data[j] == 0x07 {
                        body_end = Some(j);
                        break;
                    } else if j + 1 < data.len() && data[j] == 0x1b && data[j + 1] == b'\\' {
                        body_end = Some(j);
                        break;
                    }
                }
                if let Some(end) = body_end {
                    let body = &data[body_start..end];
                    if (body.starts_with(b"0;") || body.starts_with(b"2;")) && body.len() > 2 {
                        let title = String::from_utf8_lossy(&body[2..]);
                        self.dynamic_title = title.chars().take(TITLE_CAPACITY).collect();
                    }
                    i = end + 1;
                    continue;
                }
                // Unterminated — stop scanning, nothing more to find.
                break;
            }
            i += 1;
        }
    }

    /// Render the window. No-op if hidden. Draws the border (if any) then
    /// content, per `spec.md` §4.D.
    pub fn render(&self, out: &mut Vec<u8>) {
        if !self.visible {
            return;
        }
        if self.has_border {
            self.render_border(out);
        }
        self.render_content(out);
    }

    fn render_border(&self, out: &mut Vec<u8>) {
        let w = self.width;
        let title = self.title();
        let inner_width = w.saturating_sub(2);
        let visible_len = title.chars().count().min(inner_width.saturating_sub(2) as usize);
        let trimmed: String = title.chars().take(visible_len).collect();

        // Top row.
        place_cursor(out, self.x, self.y);
        out.extend_from_slice("╭".as_bytes());
        if trimmed.is_empty() {
            for _ in 0..inner_width {
                out.extend_from_slice("─".as_bytes());
            }
        } else {
            let flanked_len = trimmed.chars().count() + 2; // one space each side
            let remainder = inner_width as usize - flanked_len;
            let pad_before = remainder / 2;
            let pad_after = remainder - pad_before;
            for _ in 0..pad_before {
                out.extend_from_slice("─".as_bytes());
            }
            out.push(b' ');
            out.extend_from_slice(trimmed.as_bytes());
            out.push(b' ');
            for _ in 0..pad_after {
                out.extend_from_slice("─".as_bytes());
            }
        }
        out.extend_from_slice("╮".as_bytes());

        // Intermediate rows: left/right edges only.
        for row in 1..self.height.saturating_sub(1) {
            place_cursor(out, self.x, self.y + row);
            out.extend_from_slice("│".as_bytes());
            place_cursor(out, self.x + self.width - 1, self.y + row);
            out.extend_from_slice("│".as_bytes());
        }

        // Bottom row.
        place_cursor(out, self.x, self.y + self.height - 1);
        out.extend_from_slice("╰".as_bytes());
        for _ in 0..inner_width {
            out.extend_from_slice("─".as_bytes());
        }
        out.extend_from_slice("╯".as_bytes());
    }

    fn render_content(&self, out: &mut Vec<u8>) {
        let (content_x, content_y) = if self.has_border { (self.x + 1, self.y + 1) } else { (self.x, self.y) };
        let (content_w, content_h) = Self::content_dims(self.width, self.height, self.has_border);

        let model_rows = self.screen.rows();
        for row in 0..content_h {
            place_cursor(out, content_x, content_y + row);
            if row < model_rows {
                let cells = self.screen.row(row);
                let take = content_w as usize;
                let used = cells.len().min(take);
                let styled: Vec<(char, Style)> = cells[..used].iter().map(|c| (c.codepoint, c.style)).collect();
                crate::style::write_row(out, styled.iter().map(|(c, s)| (*c, s)));
                for _ in used..take {
                    out.push(b' ');
                }
            } else {
                for _ in 0..content_w {
                    out.push(b' ');
                }
            }
        }
    }
}

fn place_cursor(out: &mut Vec<u8>, x: u16, y: u16) {
    out.extend_from_slice(format!("\x1b[{};{}H", y + 1, x + 1).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_content_dims(w: u16, h: u16, border: bool) -> (u16, u16) {
        Window::content_dims(w, h, border)
    }

    #[test]
    fn content_dims_bordered_subtracts_two() {
        assert_eq!(dummy_content_dims(20, 10, true), (18, 8));
    }

    #[test]
    fn content_dims_borderless_is_full_rect() {
        assert_eq!(dummy_content_dims(20, 10, false), (20, 10));
    }

    #[test]
    fn content_dims_never_below_one() {
        assert_eq!(dummy_content_dims(2, 2, true), (1, 1));
    }

    #[test]
    fn title_falls_back_to_default_when_dynamic_empty() {
        let main = Window::main(80, 24);
        assert_eq!(main.title(), "");
    }

    #[test]
    fn scan_osc_title_sets_dynamic_title() {
        let mut main = Window::main(80, 24);
        main.scan_osc_title(b"\x1b]0;hi\x07");
        assert_eq!(main.title(), "hi");
    }

    #[test]
    fn scan_osc_title_handles_st_terminator() {
        let mut main = Window::main(80, 24);
        main.scan_osc_title(b"\x1b]2;title via ST\x1b\\");
        assert_eq!(main.title(), "title via ST");
    }

    #[test]
    fn scan_osc_title_truncates_to_capacity() {
        let mut main = Window::main(80, 24);
        let long = "x".repeat(TITLE_CAPACITY + 50);
        let mut seq = b"\x1b]0;".to_vec();
        seq.extend_from_slice(long.as_bytes());
        seq.push(0x07);
        main.scan_osc_title(&seq);
        assert_eq!(main.title().len(), TITLE_CAPACITY);
    }

    #[test]
    fn scan_osc_title_ignores_unterminated_sequence() {
        let mut main = Window::main(80, 24);
        main.scan_osc_title(b"\x1b]0;never terminated");
        assert_eq!(main.title(), "");
    }

    #[test]
    fn border_geometry_matches_scenario_5() {
        // spec.md scenario 5: width 20, height 5, title "ABC". Testable
        // property 5 gives the authoritative split: pad_before =
        // floor((w-2-title_total)/2) = floor((18-5)/2) = 6, pad_after = 7 —
        // six dashes before the flanked title, seven after, for a top row
        // of exactly w=20 cells (the scenario table's "seven/seven" prose
        // would total 21 cells and contradicts its own invariant).
        let mut main = Window::main(80, 24);
        main.dynamic_title = "ABC".to_string();
        main.has_border = true;
        main.width = 20;
        main.height = 5;
        let mut out = Vec::new();
        main.render_border(&mut out);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("╭──────\u{0020}ABC\u{0020}───────╮"));
    }

    #[test]
    fn render_is_noop_when_hidden() {
        let main_hidden = Window { visible: false, ..Window::main(80, 24) };
        let mut out = Vec::new();
        main_hidden.render(&mut out);
        assert!(out.is_empty());
    }
}
