//! Cell styling: SGR serialization for a single styled cell.
//!
//! Grounded in `cli/src/terminal.rs`'s `SgrState`/`emit_diff` — same
//! diff-emit-only-on-change approach, adapted to this crate's own [`Style`]
//! and [`Color`] rather than alacritty's, and extended with the underline
//! sub-parameter forms the spec requires.

/// Underline variants a cell can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

/// A cell's foreground or background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    None,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

/// Full visual style of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: Underline,
    pub blink: bool,
    pub inverse: bool,
    pub invisible: bool,
    pub strikethrough: bool,
    pub fg: Color,
    pub bg: Color,
}

impl Style {
    /// The style in effect immediately after `ESC[0m`.
    pub fn reset() -> Self {
        Self::default()
    }
}

/// Write the SGR prologue that activates every attribute and color set in
/// `style`. Always precedes with `ESC[0m` so callers never need to track
/// what the previous style was to avoid additive palette bleed.
///
/// Ordering of individual SGR parameters within the sequence is not
/// semantically significant; the reset must come first.
pub fn write_sgr(out: &mut Vec<u8>, style: &Style) {
    out.extend_from_slice(b"\x1b[0");

    if style.bold {
        out.extend_from_slice(b";1");
    }
    if style.faint {
        out.extend_from_slice(b";2");
    }
    if style.italic {
        out.extend_from_slice(b";3");
    }
    match style.underline {
        Underline::None => {}
        Underline::Single => out.extend_from_slice(b";4"),
        Underline::Double => out.extend_from_slice(b";4:2"),
        Underline::Curly => out.extend_from_slice(b";4:3"),
        Underline::Dotted => out.extend_from_slice(b";4:4"),
        Underline::Dashed => out.extend_from_slice(b";4:5"),
    }
    if style.blink {
        out.extend_from_slice(b";5");
    }
    if style.inverse {
        out.extend_from_slice(b";7");
    }
    if style.invisible {
        out.extend_from_slice(b";8");
    }
    if style.strikethrough {
        out.extend_from_slice(b";9");
    }

    write_color(out, style.fg, true);
    write_color(out, style.bg, false);

    out.push(b'm');
}

fn write_color(out: &mut Vec<u8>, color: Color, foreground: bool) {
    match color {
        Color::None => {}
        Color::Indexed(idx) => {
            let base = palette_base(idx, foreground);
            match base {
                Some(code) => {
                    out.push(b';');
                    out.extend_from_slice(code.to_string().as_bytes());
                }
                None => {
                    let prefix = if foreground { "38;5;" } else { "48;5;" };
                    out.push(b';');
                    out.extend_from_slice(prefix.as_bytes());
                    out.extend_from_slice(idx.to_string().as_bytes());
                }
            }
        }
        Color::Rgb(r, g, b) => {
            let prefix = if foreground { "38;2;" } else { "48;2;" };
            out.push(b';');
            out.extend_from_slice(prefix.as_bytes());
            out.extend_from_slice(format!("{r};{g};{b}").as_bytes());
        }
    }
}

/// Palette colors 0-7 use 3x/4x; 8-15 use 9x/10x. Returns `None` for indices
/// >= 16, which must be emitted via the extended `38;5;n`/`48;5;n` form.
fn palette_base(idx: u8, foreground: bool) -> Option<u16> {
    match idx {
        0..=7 => Some(u16::from(idx) + if foreground { 30 } else { 40 }),
        8..=15 => Some(u16::from(idx) - 8 + if foreground { 90 } else { 100 }),
        _ => None,
    }
}

/// Emit a row of cells, compressing style transitions: a new SGR sequence is
/// written only when the style differs from the cell before it, and the row
/// ends with `ESC[0m` before any trailing padding is written by the caller.
pub fn write_row<'a>(out: &mut Vec<u8>, cells: impl Iterator<Item = (char, &'a Style)>) {
    let mut current: Option<Style> = None;
    for (ch, style) in cells {
        if current.as_ref() != Some(style) {
            write_sgr(out, style);
            current = Some(*style);
        }
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }
    out.extend_from_slice(b"\x1b[0m");
}
