//! Screen Model: wraps the VT parser/grid library behind the interface
//! `spec.md` §4.B names (`new`, `feed`, cursor, viewport iteration).
//!
//! `alacritty_terminal` is the concrete library — the teacher's own
//! documented successor to `vt100::Parser` (`cli/src/terminal.rs`), chosen
//! for direct cell-array access and because it swallows none of the
//! sequences a full floating shell session can emit. This module is adapted
//! from `AlacrittyParser` there: same `Term` + `Processor` pairing, same
//! `NoopListener`, but cell reads are converted into this crate's own
//! [`crate::style::Style`] rather than alacritty's `Flags`/`Color`, so the
//! styler (4.C) and window renderer (4.D) never depend on the VT library
//! directly.

use alacritty_terminal::event::EventListener;
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line, Point};
use alacritty_terminal::term::cell::{Cell as TermCell, Flags};
use alacritty_terminal::term::{Config, Term};
use alacritty_terminal::vte::ansi::{Color as AlacColor, NamedColor, Processor};

use crate::style::{Color, Style, Underline};

/// Scrollback kept per shell. Matches the teacher's own
/// `DEFAULT_SCROLLBACK_LINES` constant in `cli/src/terminal.rs`.
pub const SCROLLBACK_LINES: usize = 5_000;

const MIN_ROWS: u16 = 1;
const MIN_COLS: u16 = 1;

#[derive(Debug, Clone, Copy)]
struct TermSize {
    columns: usize,
    screen_lines: usize,
}

impl Dimensions for TermSize {
    fn columns(&self) -> usize {
        self.columns
    }
    fn screen_lines(&self) -> usize {
        self.screen_lines
    }
    fn total_lines(&self) -> usize {
        self.screen_lines
    }
}

/// Events are not routed anywhere from the screen model itself; OSC title
/// and DA/DSR observability happen via pre-parse byte scanning in
/// [`crate::window`] and [`crate::query_forwarder`] respectively, over the
/// same bytes this model is fed.
#[derive(Debug, Clone, Copy)]
struct NoopListener;

impl EventListener for NoopListener {
    fn send_event(&self, _event: alacritty_terminal::event::Event) {}
}

/// A single resolved cell: codepoint (0 = blank) plus its visual style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCell {
    pub codepoint: char,
    pub style: Style,
}

/// Per-shell VT state: grid, cursor, scrollback, parser automaton. Resized
/// only at construction in this core — `spec.md` §3 invariant.
pub struct ScreenModel {
    term: Term<NoopListener>,
    processor: Processor,
}

impl std::fmt::Debug for ScreenModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenModel")
            .field("cols", &self.term.grid().columns())
            .field("rows", &self.term.grid().screen_lines())
            .finish_non_exhaustive()
    }
}

impl ScreenModel {
    /// Create a model sized to `cols` x `rows`. Dimensions below 1 are
    /// clamped, matching alacritty's own construction-time behavior.
    pub fn new(cols: u16, rows: u16) -> Self {
        let rows = rows.max(MIN_ROWS) as usize;
        let cols = cols.max(MIN_COLS) as usize;
        let size = TermSize { columns: cols, screen_lines: rows };
        let config = Config { scrolling_history: SCROLLBACK_LINES, ..Config::default() };
        let term = Term::new(config, &size, NoopListener);
        Self { term, processor: Processor::new() }
    }

    /// Feed raw shell output bytes into the VT automaton.
    ///
    /// Model-byte conservation (testable property 3): feeding `S` in one
    /// call produces the same resulting state as feeding any split of `S`
    /// across two calls, since the `Processor` is itself a byte-at-a-time
    /// state machine with no lookahead across calls.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.processor.advance(&mut self.term, bytes);
    }

    pub fn cols(&self) -> u16 {
        self.term.grid().columns() as u16
    }

    pub fn rows(&self) -> u16 {
        self.term.grid().screen_lines() as u16
    }

    /// Cursor position within the viewport, 0-indexed (x, y).
    pub fn cursor(&self) -> (u16, u16) {
        let point = self.term.grid().cursor.point;
        (point.column.0 as u16, point.line.0.max(0) as u16)
    }

    pub fn cursor_hidden(&self) -> bool {
        use alacritty_terminal::term::TermMode;
        !self.term.mode().contains(TermMode::SHOW_CURSOR)
    }

    pub fn application_cursor(&self) -> bool {
        use alacritty_terminal::term::TermMode;
        self.term.mode().contains(TermMode::APP_CURSOR)
    }

    pub fn bracketed_paste(&self) -> bool {
        use alacritty_terminal::term::TermMode;
        self.term.mode().contains(TermMode::BRACKETED_PASTE)
    }

    /// Iterate one viewport row, yielding resolved `(codepoint, style)` pairs
    /// for `cols` cells starting at column 0. Wide-char spacer cells are
    /// skipped — their content was already emitted by the preceding cell.
    pub fn row(&self, row: u16) -> Vec<ResolvedCell> {
        let grid = self.term.grid();
        let cols = grid.columns();
        let mut out = Vec::with_capacity(cols);
        for col in 0..cols {
            let cell = &grid[Point::new(Line(row as i32), Column(col))];
            if cell.flags.contains(Flags::WIDE_CHAR_SPACER) {
                continue;
            }
            out.push(ResolvedCell { codepoint: cell.c, style: resolve_style(cell) });
        }
        out
    }
}

/// Extract this crate's own [`Style`] from an alacritty grid cell.
fn resolve_style(cell: &TermCell) -> Style {
    Style {
        bold: cell.flags.contains(Flags::BOLD),
        faint: cell.flags.contains(Flags::DIM),
        italic: cell.flags.contains(Flags::ITALIC),
        underline: resolve_underline(cell.flags),
        blink: false,
        inverse: cell.flags.contains(Flags::INVERSE),
        invisible: cell.flags.contains(Flags::HIDDEN),
        strikethrough: cell.flags.contains(Flags::STRIKEOUT),
        fg: resolve_color(cell.fg),
        bg: resolve_color(cell.bg),
    }
}

fn resolve_underline(flags: Flags) -> Underline {
    if flags.contains(Flags::DOUBLE_UNDERLINE) {
        Underline::Double
    } else if flags.contains(Flags::UNDERCURL) {
        Underline::Curly
    } else if flags.contains(Flags::DOTTED_UNDERLINE) {
        Underline::Dotted
    } else if flags.contains(Flags::DASHED_UNDERLINE) {
        Underline::Dashed
    } else if flags.contains(Flags::UNDERLINE) {
        Underline::Single
    } else {
        Underline::None
    }
}

fn resolve_color(color: AlacColor) -> Color {
    match color {
        AlacColor::Named(NamedColor::Foreground | NamedColor::Background) => Color::None,
        AlacColor::Named(name) => Color::Indexed(named_index(name)),
        AlacColor::Indexed(idx) => Color::Indexed(idx),
        AlacColor::Spec(rgb) => Color::Rgb(rgb.r, rgb.g, rgb.b),
    }
}

fn named_index(name: NamedColor) -> u8 {
    match name {
        NamedColor::Black | NamedColor::DimBlack => 0,
        NamedColor::Red | NamedColor::DimRed => 1,
        NamedColor::Green | NamedColor::DimGreen => 2,
        NamedColor::Yellow | NamedColor::DimYellow => 3,
        NamedColor::Blue | NamedColor::DimBlue => 4,
        NamedColor::Magenta | NamedColor::DimMagenta => 5,
        NamedColor::Cyan | NamedColor::DimCyan => 6,
        NamedColor::White | NamedColor::DimWhite => 7,
        NamedColor::BrightBlack => 8,
        NamedColor::BrightRed => 9,
        NamedColor::BrightGreen => 10,
        NamedColor::BrightYellow => 11,
        NamedColor::BrightBlue => 12,
        NamedColor::BrightMagenta => 13,
        NamedColor::BrightCyan => 14,
        NamedColor::BrightWhite => 15,
        _ => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_model_with_given_dims() {
        let model = ScreenModel::new(80, 24);
        assert_eq!(model.cols(), 80);
        assert_eq!(model.rows(), 24);
    }

    #[test]
    fn min_dims_clamped() {
        let model = ScreenModel::new(0, 0);
        assert_eq!(model.cols(), MIN_COLS);
        assert_eq!(model.rows(), MIN_ROWS);
    }

    #[test]
    fn feed_hello_sets_row_zero() {
        let mut model = ScreenModel::new(80, 24);
        model.feed(b"hello\r\n");
        let row = model.row(0);
        let text: String = row.iter().take(5).map(|c| c.codepoint).collect();
        assert_eq!(text, "hello");
        assert_eq!(model.cursor(), (0, 1));
    }

    #[test]
    fn model_byte_conservation_across_split() {
        // Testable property 3: feed(S) == feed(S[0:k]) + feed(S[k:]) for any k.
        let data = b"\x1b[1;31mhi\x1b[0m there\r\n";
        let mut whole = ScreenModel::new(80, 24);
        whole.feed(data);

        for k in 0..=data.len() {
            let mut split = ScreenModel::new(80, 24);
            split.feed(&data[..k]);
            split.feed(&data[k..]);
            assert_eq!(split.cursor(), whole.cursor(), "split at {k} diverged cursor");
            assert_eq!(
                split.row(0).iter().map(|c| c.codepoint).collect::<String>(),
                whole.row(0).iter().map(|c| c.codepoint).collect::<String>(),
                "split at {k} diverged row contents"
            );
        }
    }

    #[test]
    fn cursor_hidden_tracks_decrtcem() {
        let mut model = ScreenModel::new(80, 24);
        assert!(!model.cursor_hidden());
        model.feed(b"\x1b[?25l");
        assert!(model.cursor_hidden());
        model.feed(b"\x1b[?25h");
        assert!(!model.cursor_hidden());
    }

    #[test]
    fn resolves_bold_red_style() {
        let mut model = ScreenModel::new(80, 24);
        model.feed(b"\x1b[1;31mx\x1b[0m");
        let cell = &model.row(0)[0];
        assert_eq!(cell.codepoint, 'x');
        assert!(cell.style.bold);
        assert_eq!(cell.style.fg, Color::Indexed(1));
    }
}
